//! Role-based route guards.
//!
//! Guards run after `auth_middleware` and only look at the user's role. A
//! denied request gets a 403 and never reaches the handler; an allowed one is
//! passed through untouched.

use axum::{
    extract::Request,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use std::sync::Arc;

use crate::db::{Capability, RoleGuard, User};
use crate::AppState;

use super::error::ApiError;

fn current_user(request: &Request) -> Result<&User, ApiError> {
    request
        .extensions()
        .get::<User>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))
}

/// Check whether `user` may open the page behind `capability`
pub fn check_capability(user: &User, capability: Capability) -> Result<(), ApiError> {
    if user.can_access(capability) {
        Ok(())
    } else {
        tracing::warn!(
            username = %user.username,
            role = %user.role,
            capability = %capability,
            "Access denied"
        );
        Err(ApiError::forbidden(format!(
            "Role {} has no access to {}",
            user.role, capability
        )))
    }
}

/// Check whether `user` passes a role guard
pub fn check_role(user: &User, guard: RoleGuard) -> Result<(), ApiError> {
    if guard.admits(user.role_enum()) {
        Ok(())
    } else {
        tracing::warn!(
            username = %user.username,
            role = %user.role,
            guard = guard.name(),
            "Role check failed"
        );
        Err(ApiError::forbidden(format!(
            "This action requires the {} role",
            guard.name()
        )))
    }
}

pub async fn require_capability(capability: Capability, request: Request, next: Next) -> Response {
    match current_user(&request).and_then(|user| check_capability(user, capability)) {
        Ok(()) => next.run(request).await,
        Err(err) => err.into_response(),
    }
}

pub async fn require_role(guard: RoleGuard, request: Request, next: Next) -> Response {
    match current_user(&request).and_then(|user| check_role(user, guard)) {
        Ok(()) => next.run(request).await,
        Err(err) => err.into_response(),
    }
}

/// Gate every route of `router` behind a page capability
pub fn with_capability(
    router: Router<Arc<AppState>>,
    capability: Capability,
) -> Router<Arc<AppState>> {
    router.route_layer(middleware::from_fn(move |request: Request, next: Next| {
        require_capability(capability, request, next)
    }))
}

/// Gate every route of `router` behind a role guard
pub fn with_role(router: Router<Arc<AppState>>, guard: RoleGuard) -> Router<Arc<AppState>> {
    router.route_layer(middleware::from_fn(move |request: Request, next: Next| {
        require_role(guard, request, next)
    }))
}
