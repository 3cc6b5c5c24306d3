//! Client base endpoints.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::db::{Client, CreateClientRequest, RoleGuard, User};
use crate::AppState;

use super::access::check_role;
use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{validate_email, validate_phone, validate_required};

/// GET /client_base/
pub async fn list_clients(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Client>>, ApiError> {
    let clients = sqlx::query_as::<_, Client>("SELECT * FROM clients ORDER BY name COLLATE NOCASE, id")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(clients))
}

/// POST /client_base/
pub async fn create_client(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(req): Json<CreateClientRequest>,
) -> Result<(StatusCode, Json<Client>), ApiError> {
    check_role(&user, RoleGuard::Manager)?;

    let mut errors = ValidationErrorBuilder::new();
    errors
        .check("name", validate_required(&req.name, "Name"))
        .check("phone", validate_phone(&req.phone))
        .check("email", validate_email(&req.email));
    errors.finish()?;

    let id = sqlx::query("INSERT INTO clients (name, phone, email, created_at) VALUES (?, ?, ?, ?)")
        .bind(req.name.trim())
        .bind(&req.phone)
        .bind(&req.email)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&state.db)
        .await?
        .last_insert_rowid();

    let client = sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = ?")
        .bind(id)
        .fetch_one(&state.db)
        .await?;

    tracing::info!(client_id = id, created_by = %user.username, "Client added");

    Ok((StatusCode::CREATED, Json(client)))
}
