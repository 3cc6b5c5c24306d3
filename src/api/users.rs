//! Home page and staff user management.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::db::{insert_user, CreateUserRequest, HomeResponse, Role, User, UserResponse};
use crate::AppState;

use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{validate_password, validate_username};

/// Landing page: the current user, the pages they may open and their notification count
///
/// GET /
pub async fn home(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<HomeResponse>, ApiError> {
    let notification_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = ?")
            .bind(user.id)
            .fetch_one(&state.db)
            .await?;

    Ok(Json(HomeResponse {
        capabilities: user.role_enum().capabilities().to_vec(),
        notification_count,
        user: UserResponse::from(user),
    }))
}

/// GET /users/
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY username")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// Users that can be picked in the assignment form
///
/// GET /executors/
pub async fn list_executors(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = sqlx::query_as::<_, User>("SELECT * FROM users WHERE role = ? ORDER BY username")
        .bind(Role::Executor.as_str())
        .fetch_all(&state.db)
        .await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// Map an `insert_user` failure, keeping database errors such as a
/// concurrent duplicate username on their usual status codes
fn insert_error(err: anyhow::Error) -> ApiError {
    match err.downcast::<sqlx::Error>() {
        Ok(db_err) => ApiError::from(db_err),
        Err(other) => {
            tracing::error!(error = %other, "Failed to create user");
            ApiError::internal("Failed to create user")
        }
    }
}

/// POST /users/
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    admin: User,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    errors
        .check("username", validate_username(&req.username))
        .check("password", validate_password(&req.password));
    let role = match req.role.parse::<Role>() {
        Ok(role) => Some(role),
        Err(e) => {
            errors.add("role", e);
            None
        }
    };
    errors.finish()?;
    let role = role.ok_or_else(|| ApiError::validation_field("role", "Role is required"))?;

    let taken: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE username = ?")
        .bind(&req.username)
        .fetch_optional(&state.db)
        .await?;
    if taken.is_some() {
        return Err(ApiError::conflict(format!(
            "User {} already exists",
            req.username
        )));
    }

    let user = insert_user(&state.db, &req.username, &req.password, &req.full_name, role)
        .await
        .map_err(insert_error)?;

    tracing::info!(
        username = %user.username,
        role = %user.role,
        created_by = %admin.username,
        "User created"
    );

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}
