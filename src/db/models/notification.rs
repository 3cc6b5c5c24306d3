//! In-app notification and chat message models.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Sqlite, SqlitePool};

/// Notification addressed to a single user
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub message: String,
    pub created_at: String,
}

/// Insert a notification using any executor, so it can join a caller's transaction
pub async fn create_notification<'e, E>(
    executor: E,
    user_id: i64,
    title: &str,
    message: &str,
) -> Result<i64, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "INSERT INTO notifications (user_id, title, message, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(title)
    .bind(message)
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn list_user_notifications(
    pool: &SqlitePool,
    user_id: i64,
) -> Result<Vec<Notification>, sqlx::Error> {
    sqlx::query_as::<_, Notification>(
        "SELECT * FROM notifications WHERE user_id = ? ORDER BY created_at DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Chat message posted by a staff member
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChatMessage {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub body: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct PostChatMessageRequest {
    pub body: String,
}
