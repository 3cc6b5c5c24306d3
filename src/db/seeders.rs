//! Database seeders for bootstrap and demo users.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use tracing::info;

use super::models::{Role, User};
use crate::crypto::hash_password;

/// Password given to the per-role demo users
pub const SEED_PASSWORD: &str = "test123";

async fn find_user(pool: &SqlitePool, username: &str) -> Result<Option<User>> {
    Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await?)
}

/// Insert a user with a freshly hashed password, returning the stored row
pub async fn insert_user(
    pool: &SqlitePool,
    username: &str,
    password: &str,
    full_name: &str,
    role: Role,
) -> Result<User> {
    let password_hash = hash_password(password)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;
    let now = chrono::Utc::now().to_rfc3339();

    let id = sqlx::query(
        "INSERT INTO users (username, password_hash, full_name, role, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(username)
    .bind(&password_hash)
    .bind(full_name)
    .bind(role.as_str())
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await
    .with_context(|| format!("Failed to create user {}", username))?
    .last_insert_rowid();

    Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_one(pool)
        .await?)
}

/// Create the bootstrap administrator from config if it does not exist yet
pub async fn ensure_admin_user(pool: &SqlitePool, username: &str, password: &str) -> Result<()> {
    if find_user(pool, username).await?.is_some() {
        return Ok(());
    }

    insert_user(pool, username, password, "Administrator", Role::Admin).await?;
    info!(username = %username, "Created bootstrap admin user");
    Ok(())
}

/// Create one `<role>_test` user per role, reusing existing ones.
///
/// Returns the users in `Role::ALL` order.
pub async fn seed_role_users(pool: &SqlitePool) -> Result<Vec<User>> {
    let mut users = Vec::with_capacity(Role::ALL.len());

    for role in Role::ALL {
        let username = format!("{}_test", role);
        let user = match find_user(pool, &username).await? {
            Some(user) => user,
            None => insert_user(pool, &username, SEED_PASSWORD, &username, role).await?,
        };
        users.push(user);
    }

    info!(count = users.len(), "Seeded per-role users");
    Ok(users)
}
