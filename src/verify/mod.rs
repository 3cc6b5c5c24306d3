//! In-process driver for the HTTP API.
//!
//! `Harness` spins up the full router over a private in-memory database with
//! one logged-in user per role. The unit tests drive endpoints through it, and
//! `crm-eridan verify` uses it to run the access and notification checks
//! against a throwaway instance without binding a port.

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;

use crate::api::{auth::create_session, create_router};
use crate::config::Config;
use crate::db::{
    create_client_request, create_repair_request, init_memory, seed_role_users, Capability,
    CreateClientRequestRequest, CreateRepairRequestRequest, RequestStatus, Role, RoleGuard, User,
};
use crate::AppState;

/// Largest response body the harness will buffer
const MAX_BODY: usize = 4 * 1024 * 1024;

/// Request body sent by the harness
#[derive(Debug, Clone)]
pub enum Payload {
    Empty,
    Json(Value),
    /// Already urlencoded form body
    Form(String),
}

pub struct Harness {
    state: Arc<AppState>,
    router: Router,
    users: HashMap<Role, User>,
    tokens: HashMap<Role, String>,
}

impl Harness {
    pub async fn new() -> Result<Self> {
        let config = Config::default();
        let ttl = config.auth.session_ttl_hours;
        let db = init_memory().await?;

        let mut users = HashMap::new();
        let mut tokens = HashMap::new();
        for user in seed_role_users(&db).await? {
            let token = create_session(&db, &user, ttl)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to open session: {}", e))?;
            tokens.insert(user.role_enum(), token);
            users.insert(user.role_enum(), user);
        }

        let state = Arc::new(AppState::new(config, db));
        let router = create_router(state.clone());

        Ok(Self {
            state,
            router,
            users,
            tokens,
        })
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// The seeded `<role>_test` user
    pub fn user(&self, role: Role) -> &User {
        &self.users[&role]
    }

    pub fn token(&self, role: Role) -> &str {
        &self.tokens[&role]
    }

    /// Send one request, authenticated as `role` when given
    pub async fn request(
        &self,
        role: Option<Role>,
        method: Method,
        uri: &str,
        payload: Payload,
    ) -> Result<(StatusCode, String)> {
        send(&self.router, role.map(|r| self.token(r)), method, uri, payload).await
    }
}

/// Send one request through `router` and buffer the response body
pub async fn send(
    router: &Router,
    token: Option<&str>,
    method: Method,
    uri: &str,
    payload: Payload,
) -> Result<(StatusCode, String)> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let request = match payload {
        Payload::Empty => builder.body(Body::empty()),
        Payload::Json(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string())),
        Payload::Form(form) => builder
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form)),
    }
    .context("Failed to build request")?;

    let response = router
        .clone()
        .oneshot(request)
        .await
        .context("Router failed")?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), MAX_BODY)
        .await
        .context("Failed to read response body")?;

    Ok((status, String::from_utf8_lossy(&bytes).into_owned()))
}

/// Result of one verification check
#[derive(Debug, Clone)]
pub struct Check {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

impl Check {
    fn expect(name: impl Into<String>, expected: StatusCode, actual: StatusCode) -> Self {
        Self {
            name: name.into(),
            passed: expected == actual,
            detail: format!("expected {}, got {}", expected.as_u16(), actual.as_u16()),
        }
    }

    fn equal<T: PartialEq + std::fmt::Debug>(name: impl Into<String>, expected: T, actual: T) -> Self {
        Self {
            name: name.into(),
            passed: expected == actual,
            detail: format!("expected {:?}, got {:?}", expected, actual),
        }
    }
}

/// Report of a full verification run
#[derive(Debug, Default)]
pub struct Report {
    pub checks: Vec<Check>,
}

impl Report {
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn failures(&self) -> usize {
        self.checks.iter().filter(|c| !c.passed).count()
    }
}

/// Run every check against a fresh in-memory instance
pub async fn run() -> Result<Report> {
    let mut report = Report::default();

    let h = Harness::new().await?;
    access_matrix(&h, &mut report).await?;
    role_guards(&h, &mut report).await?;

    let h = Harness::new().await?;
    executor_filtering(&h, &mut report).await?;

    let h = Harness::new().await?;
    assignment_notifications(&h, &mut report).await?;

    Ok(report)
}

/// Every role against every page: 200 when allowed, 403 otherwise
async fn access_matrix(h: &Harness, report: &mut Report) -> Result<()> {
    for role in Role::ALL {
        for capability in Capability::ALL {
            let (status, _) = h
                .request(Some(role), Method::GET, capability.path(), Payload::Empty)
                .await?;
            let expected = if role.can_access(capability) {
                StatusCode::OK
            } else {
                StatusCode::FORBIDDEN
            };
            report
                .checks
                .push(Check::expect(format!("{} opens {}", role, capability), expected, status));
        }
    }

    let (status, _) = h
        .request(None, Method::GET, Capability::Chat.path(), Payload::Empty)
        .await?;
    report
        .checks
        .push(Check::expect("anonymous opens chat", StatusCode::UNAUTHORIZED, status));
    Ok(())
}

/// One endpoint behind each role guard
async fn role_guards(h: &Harness, report: &mut Report) -> Result<()> {
    let guarded = [
        (RoleGuard::Admin, "/users/"),
        (RoleGuard::Manager, "/executors/"),
        (RoleGuard::Executor, "/my_requests/"),
    ];

    for (guard, path) in guarded {
        for role in Role::ALL {
            let (status, _) = h.request(Some(role), Method::GET, path, Payload::Empty).await?;
            let expected = if guard.admits(role) {
                StatusCode::OK
            } else {
                StatusCode::FORBIDDEN
            };
            report.checks.push(Check::expect(
                format!("{} passes {} guard", role, guard.name()),
                expected,
                status,
            ));
        }
    }
    Ok(())
}

async fn seed_client_request(
    h: &Harness,
    status: RequestStatus,
    assigned_to: Option<i64>,
) -> Result<i64> {
    let request = create_client_request(
        &h.state().db,
        &CreateClientRequestRequest {
            client_id: None,
            client_name: "Verification client".to_string(),
            phone: String::new(),
            client_email: String::new(),
            description: format!("{} request", status),
            status: Some(status),
        },
    )
    .await?;

    sqlx::query("UPDATE client_requests SET assigned_to = ? WHERE id = ?")
        .bind(assigned_to)
        .bind(request.id)
        .execute(&h.state().db)
        .await?;
    Ok(request.id)
}

fn request_ids(body: &str) -> Result<Vec<i64>> {
    let value: Value = serde_json::from_str(body)?;
    let mut ids: Vec<i64> = value["requests"]
        .as_array()
        .map(|items| items.iter().filter_map(|r| r["id"].as_i64()).collect())
        .unwrap_or_default();
    ids.sort_unstable();
    Ok(ids)
}

/// Executors see only their own in-progress and completed requests
async fn executor_filtering(h: &Harness, report: &mut Report) -> Result<()> {
    let executor = h.user(Role::Executor).id;
    let admin = h.user(Role::Admin).id;

    let in_progress = seed_client_request(h, RequestStatus::InProgress, Some(executor)).await?;
    let completed = seed_client_request(h, RequestStatus::Completed, Some(executor)).await?;
    let fresh = seed_client_request(h, RequestStatus::New, Some(executor)).await?;
    let foreign = seed_client_request(h, RequestStatus::InProgress, Some(admin)).await?;

    let cases = [
        (Role::Executor, "/my_requests/?status=all", vec![in_progress, completed]),
        (Role::Executor, "/my_requests/?status=in_progress", vec![in_progress]),
        (Role::Executor, "/my_requests/?status=new", vec![]),
        (Role::Admin, "/client_requests/?status=all", vec![in_progress, completed, fresh, foreign]),
        (Role::Manager, "/client_requests/?status=in_progress", vec![in_progress, foreign]),
    ];

    for (role, uri, expected) in cases {
        let (_, body) = h.request(Some(role), Method::GET, uri, Payload::Empty).await?;
        report
            .checks
            .push(Check::equal(format!("{} lists {}", role, uri), expected, request_ids(&body)?));
    }
    Ok(())
}

/// Assigning an executor leaves exactly one notification per assignment
async fn assignment_notifications(h: &Harness, report: &mut Report) -> Result<()> {
    let executor = h.user(Role::Executor).id;
    let client_id = seed_client_request(h, RequestStatus::New, None).await?;
    let repair: CreateRepairRequestRequest = serde_json::from_value(serde_json::json!({
        "organization_name": "Verification org",
        "equipment_name": "Verification equipment",
        "issue_description": "Does not start",
    }))?;
    let repair_id = create_repair_request(&h.state().db, &repair).await?.id;

    let form = Payload::Form(format!("executor={}", executor));
    for (kind, id) in [("client", client_id), ("repair", repair_id)] {
        let (status, _) = h
            .request(
                Some(Role::Admin),
                Method::POST,
                &format!("/assign_executor/{}/{}/", kind, id),
                form.clone(),
            )
            .await?;
        report
            .checks
            .push(Check::expect(format!("assign {} request", kind), StatusCode::OK, status));
    }

    let (status, _) = h
        .request(
            Some(Role::Admin),
            Method::POST,
            &format!("/assign_executor/client/{}/", client_id + 1000),
            form,
        )
        .await?;
    report
        .checks
        .push(Check::expect("assign missing request", StatusCode::NOT_FOUND, status));

    let (_, body) = h
        .request(Some(Role::Executor), Method::GET, "/notifications/", Payload::Empty)
        .await?;
    let count = serde_json::from_str::<Value>(&body)?
        .as_array()
        .map_or(0, |items| items.len());
    report
        .checks
        .push(Check::equal("executor notifications", 2, count));
    Ok(())
}
