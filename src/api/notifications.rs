//! Notification listing and executor assignment endpoints.

use axum::{
    extract::{Path, State},
    Form, Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::db::{list_user_notifications, Notification, User};
use crate::notifications::{self, Assignment, RequestKind};
use crate::AppState;

use super::access::check_capability;
use super::error::ApiError;

/// Assignment form, the executor id arrives as a form field
#[derive(Debug, Deserialize)]
pub struct AssignExecutorForm {
    #[serde(default)]
    pub executor: Option<String>,
}

fn parse_executor_id(form: &AssignExecutorForm) -> Result<i64, ApiError> {
    let raw = form
        .executor
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::validation_field("executor", "Executor is required"))?;

    raw.parse::<i64>()
        .map_err(|_| ApiError::validation_field("executor", "Executor must be a user id"))
}

/// Notifications of the current user, newest first
///
/// GET /notifications/
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    user: User,
) -> Result<Json<Vec<Notification>>, ApiError> {
    let items = list_user_notifications(&state.db, user.id).await?;
    Ok(Json(items))
}

/// Assign an executor to a client or repair request
///
/// POST /assign_executor/:kind/:id/
pub async fn assign_executor(
    State(state): State<Arc<AppState>>,
    user: User,
    Path((kind, request_id)): Path<(String, i64)>,
    Form(form): Form<AssignExecutorForm>,
) -> Result<Json<Assignment>, ApiError> {
    let kind: RequestKind = kind.parse().map_err(ApiError::not_found)?;
    check_capability(&user, kind.capability())?;

    let executor_id = parse_executor_id(&form)?;
    let assignment = notifications::assign_executor(&state.db, kind, request_id, executor_id).await?;

    tracing::debug!(assigned_by = %user.username, kind = %kind, request_id, "Assignment handled");

    Ok(Json(assignment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{
        create_client_request, create_repair_request, CreateClientRequestRequest,
        CreateRepairRequestRequest, Role,
    };
    use crate::notifications::ASSIGNMENT_TITLE;
    use crate::verify::{Harness, Payload};
    use axum::http::{Method, StatusCode};
    use serde_json::Value;

    async fn seed_client_request(h: &Harness) -> (i64, String) {
        let request = create_client_request(
            &h.state().db,
            &CreateClientRequestRequest {
                client_id: None,
                client_name: "Client".to_string(),
                phone: "123456789".to_string(),
                client_email: String::new(),
                description: "Test request".to_string(),
                status: None,
            },
        )
        .await
        .unwrap();
        (request.id, request.number())
    }

    async fn seed_repair_request(h: &Harness) -> i64 {
        let req: CreateRepairRequestRequest = serde_json::from_value(serde_json::json!({
            "organization_name": "Test Org",
            "equipment_name": "Test Equipment",
            "issue_description": "Test issue",
        }))
        .unwrap();
        create_repair_request(&h.state().db, &req).await.unwrap().id
    }

    async fn notifications_of(h: &Harness, role: Role) -> Vec<Value> {
        let (code, body) = h
            .request(Some(role), Method::GET, "/notifications/", Payload::Empty)
            .await
            .unwrap();
        assert_eq!(code, StatusCode::OK, "{body}");
        serde_json::from_str::<Value>(&body).unwrap().as_array().unwrap().clone()
    }

    #[test]
    fn test_parse_executor_id() {
        let form = |v: Option<&str>| AssignExecutorForm {
            executor: v.map(str::to_string),
        };
        assert_eq!(parse_executor_id(&form(Some(" 7 "))).unwrap(), 7);
        assert_eq!(parse_executor_id(&form(None)).unwrap_err().status(), StatusCode::BAD_REQUEST);
        assert_eq!(parse_executor_id(&form(Some(""))).unwrap_err().status(), StatusCode::BAD_REQUEST);
        assert_eq!(parse_executor_id(&form(Some("abc"))).unwrap_err().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_assigning_client_request_notifies_executor() {
        let h = Harness::new().await.unwrap();
        let (id, number) = seed_client_request(&h).await;
        let executor = h.user(Role::Executor).id;

        let (code, body) = h
            .request(
                Some(Role::Admin),
                Method::POST,
                &format!("/assign_executor/client/{id}/"),
                Payload::Form(format!("executor={executor}")),
            )
            .await
            .unwrap();
        assert_eq!(code, StatusCode::OK, "{body}");
        let value: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["assigned_to"], executor);

        let items = notifications_of(&h, Role::Executor).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["title"], ASSIGNMENT_TITLE);
        assert!(items[0]["message"].as_str().unwrap().contains(&number));

        assert!(notifications_of(&h, Role::Admin).await.is_empty());
    }

    #[tokio::test]
    async fn test_assigning_repair_request_notifies_executor() {
        let h = Harness::new().await.unwrap();
        let id = seed_repair_request(&h).await;
        let executor = h.user(Role::Executor).id;

        let (code, body) = h
            .request(
                Some(Role::ProductionChief),
                Method::POST,
                &format!("/assign_executor/repair/{id}/"),
                Payload::Form(format!("executor={executor}")),
            )
            .await
            .unwrap();
        assert_eq!(code, StatusCode::OK, "{body}");

        let items = notifications_of(&h, Role::Executor).await;
        assert_eq!(items.len(), 1);
        assert!(items[0]["message"].as_str().unwrap().contains(&format!("#{id}")));
    }

    #[tokio::test]
    async fn test_assignment_rejections() {
        let h = Harness::new().await.unwrap();
        let (id, _) = seed_client_request(&h).await;
        let repair_id = seed_repair_request(&h).await;
        let executor = h.user(Role::Executor).id;
        let manager = h.user(Role::Manager).id;
        let form = |user: i64| Payload::Form(format!("executor={user}"));

        let cases = [
            (Role::Admin, format!("/assign_executor/client/{}/", id + 100), form(executor), StatusCode::NOT_FOUND),
            (Role::Admin, format!("/assign_executor/order/{id}/"), form(executor), StatusCode::NOT_FOUND),
            (Role::Admin, format!("/assign_executor/client/{id}/"), form(99_999), StatusCode::NOT_FOUND),
            (Role::Admin, format!("/assign_executor/client/{id}/"), form(manager), StatusCode::BAD_REQUEST),
            (Role::Admin, format!("/assign_executor/client/{id}/"), Payload::Form(String::new()), StatusCode::BAD_REQUEST),
            (Role::Executor, format!("/assign_executor/client/{id}/"), form(executor), StatusCode::FORBIDDEN),
            (Role::DesignChief, format!("/assign_executor/repair/{repair_id}/"), form(executor), StatusCode::FORBIDDEN),
        ];

        for (role, uri, payload, expected) in cases {
            let (code, body) = h.request(Some(role), Method::POST, &uri, payload).await.unwrap();
            assert_eq!(code, expected, "{role} {uri}: {body}");
        }

        assert!(notifications_of(&h, Role::Executor).await.is_empty());
    }
}
