pub mod access;
pub mod auth;
mod chat;
mod clients;
pub mod error;
mod notifications;
mod requests;
mod users;
pub mod validation;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::db::{Capability, RoleGuard};
use crate::AppState;

use access::{with_capability, with_role};

pub fn create_router(state: Arc<AppState>) -> Router {
    // Auth routes (public)
    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout));

    // Pages gated by the role's capability table
    let pages = Router::new()
        .merge(with_capability(
            Router::new().route(
                "/client_requests/",
                get(requests::list_client_requests).post(requests::create_client_request),
            ),
            Capability::ClientRequests,
        ))
        .merge(with_capability(
            Router::new().route(
                "/repair_requests/",
                get(requests::list_repair_requests).post(requests::create_repair_request),
            ),
            Capability::RepairRequests,
        ))
        .merge(with_capability(
            Router::new().route(
                "/client_base/",
                get(clients::list_clients).post(clients::create_client),
            ),
            Capability::ClientBase,
        ))
        .merge(with_capability(
            Router::new().route("/kanban/", get(requests::kanban)),
            Capability::Kanban,
        ))
        .merge(with_capability(
            Router::new().route("/chat/", get(chat::list_messages).post(chat::post_message)),
            Capability::Chat,
        ));

    // Actions gated by coarse role checks
    let manager_routes = with_role(
        Router::new()
            .route("/assign_executor/:kind/:id/", post(notifications::assign_executor))
            .route("/executors/", get(users::list_executors)),
        RoleGuard::Manager,
    );

    let executor_routes = with_role(
        Router::new()
            .route("/my_requests/", get(requests::list_my_requests))
            .route("/my_requests/:id/complete/", post(requests::complete_my_request)),
        RoleGuard::Executor,
    );

    let admin_routes = with_role(
        Router::new().route("/users/", get(users::list_users).post(users::create_user)),
        RoleGuard::Admin,
    );

    // Protected routes, any logged-in user
    let protected = Router::new()
        .route("/", get(users::home))
        .route("/notifications/", get(notifications::list_notifications))
        .merge(pages)
        .merge(manager_routes)
        .merge(executor_routes)
        .merge(admin_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .merge(auth_routes)
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
