//! Staff chat endpoints.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::db::{ChatMessage, PostChatMessageRequest, User};
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{validate_required, validate_text_len};

/// Number of messages returned by the chat page
const CHAT_HISTORY: i64 = 100;

const SELECT_MESSAGES: &str = r#"
    SELECT m.id, m.user_id, u.username, m.body, m.created_at
    FROM chat_messages m
    INNER JOIN users u ON u.id = m.user_id
"#;

/// Latest chat messages, oldest first
///
/// GET /chat/
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    let sql = format!("{} ORDER BY m.id DESC LIMIT ?", SELECT_MESSAGES);
    let mut messages = sqlx::query_as::<_, ChatMessage>(&sql)
        .bind(CHAT_HISTORY)
        .fetch_all(&state.db)
        .await?;
    messages.reverse();
    Ok(Json(messages))
}

/// POST /chat/
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(req): Json<PostChatMessageRequest>,
) -> Result<(StatusCode, Json<ChatMessage>), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    errors
        .check("body", validate_required(&req.body, "Message"))
        .check("body", validate_text_len(&req.body, "Message"));
    errors.finish()?;

    let id = sqlx::query("INSERT INTO chat_messages (user_id, body, created_at) VALUES (?, ?, ?)")
        .bind(user.id)
        .bind(req.body.trim())
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&state.db)
        .await?
        .last_insert_rowid();

    let sql = format!("{} WHERE m.id = ?", SELECT_MESSAGES);
    let message = sqlx::query_as::<_, ChatMessage>(&sql)
        .bind(id)
        .fetch_one(&state.db)
        .await?;

    Ok((StatusCode::CREATED, Json(message)))
}
