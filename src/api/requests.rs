//! Client request, repair request and kanban endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::db::{
    create_client_request as insert_client_request,
    create_repair_request as insert_repair_request, list_repair_requests as fetch_repair_requests,
    ClientRequest, CreateClientRequestRequest, CreateRepairRequestRequest, KanbanBoard,
    RepairRequest, RequestScope, RequestStatus, RoleGuard, StatusFilter, StatusQuery, User,
};
use crate::AppState;

use super::access::check_role;
use super::error::{ApiError, ValidationErrorBuilder};
use super::validation::{
    validate_email, validate_phone, validate_required, validate_text_len,
};

#[derive(Debug, Serialize)]
pub struct ClientRequestList {
    pub requests: Vec<ClientRequest>,
    pub total: usize,
    /// Status filter that was applied (`all` when none)
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct RepairRequestList {
    pub requests: Vec<RepairRequest>,
    pub total: usize,
    pub status: String,
}

fn parse_filter(query: &StatusQuery) -> Result<StatusFilter, ApiError> {
    StatusFilter::parse(query.status.as_deref())
        .map_err(|e| ApiError::validation_field("status", e))
}

fn filter_label(filter: StatusFilter) -> String {
    filter
        .status()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "all".to_string())
}

/// List the client requests visible to the current user
///
/// GET /client_requests/?status=<all|new|in_progress|completed|cancelled>
pub async fn list_client_requests(
    State(state): State<Arc<AppState>>,
    user: User,
    Query(query): Query<StatusQuery>,
) -> Result<Json<ClientRequestList>, ApiError> {
    let filter = parse_filter(&query)?;
    let scope = RequestScope::for_user(user.id, user.role_enum(), filter);
    let requests = scope.fetch(&state.db).await?;

    Ok(Json(ClientRequestList {
        total: requests.len(),
        requests,
        status: filter_label(filter),
    }))
}

/// The executor's own work list, same scope as the request list
///
/// GET /my_requests/?status=
pub async fn list_my_requests(
    state: State<Arc<AppState>>,
    user: User,
    query: Query<StatusQuery>,
) -> Result<Json<ClientRequestList>, ApiError> {
    list_client_requests(state, user, query).await
}

/// Open a new client request
///
/// POST /client_requests/
pub async fn create_client_request(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(req): Json<CreateClientRequestRequest>,
) -> Result<(StatusCode, Json<ClientRequest>), ApiError> {
    check_role(&user, RoleGuard::Manager)?;

    let mut errors = ValidationErrorBuilder::new();
    if req.client_id.is_none() {
        errors.check("client_name", validate_required(&req.client_name, "Client name"));
    }
    errors
        .check("phone", validate_phone(&req.phone))
        .check("client_email", validate_email(&req.client_email))
        .check("description", validate_text_len(&req.description, "Description"));
    errors.finish()?;

    if let Some(client_id) = req.client_id {
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM clients WHERE id = ?")
            .bind(client_id)
            .fetch_optional(&state.db)
            .await?;
        if exists.is_none() {
            return Err(ApiError::validation_field("client_id", "Client not found"));
        }
    }

    let request = insert_client_request(&state.db, &req).await?;

    info!(
        request_number = %request.number(),
        created_by = %user.username,
        "Client request created"
    );

    Ok((StatusCode::CREATED, Json(request)))
}

/// List repair requests
///
/// GET /repair_requests/?status=
pub async fn list_repair_requests(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<RepairRequestList>, ApiError> {
    let filter = parse_filter(&query)?;
    let requests = fetch_repair_requests(&state.db, filter).await?;

    Ok(Json(RepairRequestList {
        total: requests.len(),
        requests,
        status: filter_label(filter),
    }))
}

/// Open a repair work order
///
/// POST /repair_requests/
pub async fn create_repair_request(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(req): Json<CreateRepairRequestRequest>,
) -> Result<(StatusCode, Json<RepairRequest>), ApiError> {
    check_role(&user, RoleGuard::Manager)?;

    let mut errors = ValidationErrorBuilder::new();
    errors
        .check("equipment_name", validate_required(&req.equipment_name, "Equipment name"))
        .check("issue_description", validate_required(&req.issue_description, "Issue description"))
        .check("issue_description", validate_text_len(&req.issue_description, "Issue description"))
        .check("phone", validate_phone(&req.phone))
        .check("email", validate_email(&req.email));
    errors.finish()?;

    let request = insert_repair_request(&state.db, &req).await?;

    info!(id = request.id, created_by = %user.username, "Repair request created");

    Ok((StatusCode::CREATED, Json(request)))
}

/// Kanban board of the client requests visible to the current user
///
/// GET /kanban/
pub async fn kanban(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<KanbanBoard>, ApiError> {
    let scope = RequestScope::for_user(user.id, user.role_enum(), StatusFilter::All);
    let requests = scope.fetch(&state.db).await?;
    Ok(Json(KanbanBoard::from_requests(requests)))
}

/// Executor marks one of their in-progress requests as completed
///
/// POST /my_requests/:id/complete/
pub async fn complete_my_request(
    State(state): State<Arc<AppState>>,
    user: User,
    Path(id): Path<i64>,
) -> Result<Json<ClientRequest>, ApiError> {
    // The ownership and status checks are part of the UPDATE
    let updated = sqlx::query(
        "UPDATE client_requests SET status = ?, updated_at = ? WHERE id = ? AND assigned_to = ? AND status = ?",
    )
    .bind(RequestStatus::Completed.as_str())
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(id)
    .bind(user.id)
    .bind(RequestStatus::InProgress.as_str())
    .execute(&state.db)
    .await?
    .rows_affected();

    let request = sqlx::query_as::<_, ClientRequest>(
        "SELECT * FROM client_requests WHERE id = ? AND assigned_to = ?",
    )
    .bind(id)
    .bind(user.id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Request not found"))?;

    if updated == 0 {
        return Err(ApiError::conflict(format!(
            "Only in_progress requests can be completed, this one is {}",
            request.status
        )));
    }

    info!(request_number = %request.number(), executor = %user.username, "Request completed");

    Ok(Json(request))
}

#[cfg(test)]
mod tests {
    use crate::db::{Role, RequestStatus};
    use crate::verify::{Harness, Payload};
    use axum::http::{Method, StatusCode};
    use serde_json::{json, Value};

    async fn seed_request(h: &Harness, status: RequestStatus, assigned_to: Option<i64>) -> i64 {
        let (code, body) = h
            .request(
                Some(Role::Admin),
                Method::POST,
                "/client_requests/",
                Payload::Json(json!({
                    "client_name": "Client",
                    "phone": "123456789",
                    "client_email": "client@example.com",
                    "description": "Test request",
                    "status": status,
                })),
            )
            .await
            .unwrap();
        assert_eq!(code, StatusCode::CREATED, "{body}");
        let id = serde_json::from_str::<Value>(&body).unwrap()["id"].as_i64().unwrap();
        sqlx::query("UPDATE client_requests SET assigned_to = ? WHERE id = ?")
            .bind(assigned_to)
            .bind(id)
            .execute(&h.state().db)
            .await
            .unwrap();
        id
    }

    async fn visible_ids(h: &Harness, role: Role, uri: &str) -> Vec<i64> {
        let (code, body) = h
            .request(Some(role), Method::GET, uri, Payload::Empty)
            .await
            .unwrap();
        assert_eq!(code, StatusCode::OK, "{body}");
        let value: Value = serde_json::from_str(&body).unwrap();
        let mut ids: Vec<i64> = value["requests"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["id"].as_i64().unwrap())
            .collect();
        ids.sort();
        ids
    }

    #[tokio::test]
    async fn test_executor_and_admin_filtering() {
        let h = Harness::new().await.unwrap();
        let executor = h.user(Role::Executor).id;
        let admin = h.user(Role::Admin).id;

        let r1 = seed_request(&h, RequestStatus::InProgress, Some(executor)).await;
        let r2 = seed_request(&h, RequestStatus::Completed, Some(executor)).await;
        let r3 = seed_request(&h, RequestStatus::New, Some(executor)).await;
        let r4 = seed_request(&h, RequestStatus::InProgress, Some(admin)).await;

        assert_eq!(visible_ids(&h, Role::Executor, "/my_requests/?status=all").await, vec![r1, r2]);
        assert_eq!(visible_ids(&h, Role::Executor, "/my_requests/").await, vec![r1, r2]);
        assert_eq!(visible_ids(&h, Role::Executor, "/my_requests/?status=in_progress").await, vec![r1]);
        assert!(visible_ids(&h, Role::Executor, "/my_requests/?status=new").await.is_empty());

        let (_, body) = h
            .request(Some(Role::Executor), Method::GET, "/kanban/", Payload::Empty)
            .await
            .unwrap();
        assert_eq!(serde_json::from_str::<Value>(&body).unwrap()["total"], 2);

        assert_eq!(visible_ids(&h, Role::Admin, "/client_requests/?status=all").await, vec![r1, r2, r3, r4]);
        assert_eq!(visible_ids(&h, Role::Manager, "/client_requests/?status=in_progress").await, vec![r1, r4]);
        assert_eq!(visible_ids(&h, Role::DesignChief, "/client_requests/?status=new").await, vec![r3]);
    }

    #[tokio::test]
    async fn test_unknown_status_is_rejected() {
        let h = Harness::new().await.unwrap();
        let (code, body) = h
            .request(Some(Role::Admin), Method::GET, "/client_requests/?status=done", Payload::Empty)
            .await
            .unwrap();
        assert_eq!(code, StatusCode::BAD_REQUEST);
        assert!(body.contains("validation_error"));
    }

    #[tokio::test]
    async fn test_create_requires_client_name() {
        let h = Harness::new().await.unwrap();
        let (code, body) = h
            .request(
                Some(Role::Manager),
                Method::POST,
                "/client_requests/",
                Payload::Json(json!({ "description": "no client", "client_email": "bad" })),
            )
            .await
            .unwrap();
        assert_eq!(code, StatusCode::BAD_REQUEST);
        let value: Value = serde_json::from_str(&body).unwrap();
        assert!(value["error"]["details"]["client_name"].is_array());
        assert!(value["error"]["details"]["client_email"].is_array());
    }

    #[tokio::test]
    async fn test_repair_requests_list_and_create() {
        let h = Harness::new().await.unwrap();
        let (code, body) = h
            .request(
                Some(Role::ProductionChief),
                Method::POST,
                "/repair_requests/",
                Payload::Json(json!({
                    "organization_name": "Test Org",
                    "equipment_name": "Test Equipment",
                    "issue_description": "Test issue",
                })),
            )
            .await
            .unwrap();
        assert_eq!(code, StatusCode::CREATED, "{body}");

        let (code, body) = h
            .request(Some(Role::Chief), Method::GET, "/repair_requests/?status=new", Payload::Empty)
            .await
            .unwrap();
        assert_eq!(code, StatusCode::OK);
        let value: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["total"], 1);
        assert_eq!(value["status"], "new");
    }

    #[tokio::test]
    async fn test_executor_completes_own_request_only() {
        let h = Harness::new().await.unwrap();
        let executor = h.user(Role::Executor).id;
        let admin = h.user(Role::Admin).id;
        let mine = seed_request(&h, RequestStatus::InProgress, Some(executor)).await;
        let fresh = seed_request(&h, RequestStatus::New, Some(executor)).await;
        let theirs = seed_request(&h, RequestStatus::InProgress, Some(admin)).await;

        let complete = |id: i64| format!("/my_requests/{id}/complete/");

        let (code, body) = h
            .request(Some(Role::Executor), Method::POST, &complete(mine), Payload::Empty)
            .await
            .unwrap();
        assert_eq!(code, StatusCode::OK, "{body}");
        assert_eq!(serde_json::from_str::<Value>(&body).unwrap()["status"], "completed");

        let (code, _) = h
            .request(Some(Role::Executor), Method::POST, &complete(fresh), Payload::Empty)
            .await
            .unwrap();
        assert_eq!(code, StatusCode::CONFLICT);

        let (code, _) = h
            .request(Some(Role::Executor), Method::POST, &complete(theirs), Payload::Empty)
            .await
            .unwrap();
        assert_eq!(code, StatusCode::NOT_FOUND);

        let (code, _) = h
            .request(Some(Role::Manager), Method::POST, &complete(theirs), Payload::Empty)
            .await
            .unwrap();
        assert_eq!(code, StatusCode::FORBIDDEN);

        let (code, _) = h
            .request(Some(Role::Executor), Method::POST, &complete(mine), Payload::Empty)
            .await
            .unwrap();
        assert_eq!(code, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_reassigned_request_stays_untouched() {
        let h = Harness::new().await.unwrap();
        let executor = h.user(Role::Executor).id;
        let admin = h.user(Role::Admin).id;
        let id = seed_request(&h, RequestStatus::InProgress, Some(executor)).await;

        sqlx::query("UPDATE client_requests SET assigned_to = ? WHERE id = ?")
            .bind(admin)
            .bind(id)
            .execute(&h.state().db)
            .await
            .unwrap();

        let (code, _) = h
            .request(Some(Role::Executor), Method::POST, &format!("/my_requests/{id}/complete/"), Payload::Empty)
            .await
            .unwrap();
        assert_eq!(code, StatusCode::NOT_FOUND);

        let status: String = sqlx::query_scalar("SELECT status FROM client_requests WHERE id = ?")
            .bind(id)
            .fetch_one(&h.state().db)
            .await
            .unwrap();
        assert_eq!(status, "in_progress");
    }
}
