use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::crypto::{generate_token, hash_token, verify_password};
use crate::db::{LoginRequest, LoginResponse, User, UserResponse};
use crate::AppState;

use super::error::ApiError;

/// Session token cookie name
pub const SESSION_COOKIE: &str = "crm_session";

/// Alternative header for clients that cannot set `Authorization`
const SESSION_HEADER: &str = "X-Session-Token";

/// Extract the session token from headers or the session cookie
fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get("Authorization").and_then(|h| h.to_str().ok()) {
        if let Some(token) = auth_header.strip_prefix("Bearer ") {
            return Some(token.trim().to_string());
        }
    }

    if let Some(token) = headers.get(SESSION_HEADER).and_then(|h| h.to_str().ok()) {
        return Some(token.trim().to_string());
    }

    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
}

/// Resolve a session token to its user, ignoring expired sessions
pub async fn user_for_token(pool: &SqlitePool, token: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT u.* FROM users u
        INNER JOIN sessions s ON s.user_id = u.id
        WHERE s.token_hash = ? AND s.expires_at > ?
        "#,
    )
    .bind(hash_token(token))
    .bind(chrono::Utc::now().to_rfc3339())
    .fetch_optional(pool)
    .await
}

/// Open a session for `user` and return the plaintext token
pub async fn create_session(
    pool: &SqlitePool,
    user: &User,
    ttl_hours: i64,
) -> Result<String, ApiError> {
    let token = generate_token();
    let expires_at = chrono::TimeDelta::try_hours(ttl_hours)
        .and_then(|ttl| chrono::Utc::now().checked_add_signed(ttl))
        .ok_or_else(|| ApiError::internal("Session lifetime is out of range"))?
        .to_rfc3339();

    sqlx::query(
        "INSERT INTO sessions (id, user_id, token_hash, expires_at, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(user.id)
    .bind(hash_token(&token))
    .bind(&expires_at)
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(token)
}

/// Login endpoint
///
/// POST /login
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
        .bind(&request.username)
        .fetch_optional(&state.db)
        .await?;

    let user = match user {
        Some(user) if verify_password(&request.password, &user.password_hash) => user,
        _ => {
            tracing::warn!(username = %request.username, "Failed login attempt");
            return Err(ApiError::unauthorized("Invalid credentials"));
        }
    };

    let token = create_session(&state.db, &user, state.config.auth.session_ttl_hours).await?;

    tracing::info!(username = %user.username, role = %user.role, "User logged in");

    let jar = jar.add(
        Cookie::build((SESSION_COOKIE, token.clone()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .build(),
    );

    Ok((
        jar,
        Json(LoginResponse {
            token,
            user: UserResponse::from(user),
        }),
    ))
}

/// Logout endpoint, drops the current session
///
/// POST /logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(token) = extract_token(&headers) {
        sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(hash_token(&token))
            .execute(&state.db)
            .await?;
    }

    let jar = jar.remove(Cookie::from(SESSION_COOKIE));
    Ok((jar, StatusCode::NO_CONTENT))
}

/// Auth middleware that validates the session and attaches the user to the request
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    let user = user_for_token(&state.db, &token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Session is invalid or expired"))?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Extractor for the user attached by `auth_middleware`
#[async_trait]
impl<S> FromRequestParts<S> for User
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<User>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}
