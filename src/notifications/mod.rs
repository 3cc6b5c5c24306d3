//! Executor assignment and the notifications it produces.
//!
//! Assigning an executor to a client or repair request updates the request
//! and inserts a notification for the executor in the same transaction, so
//! either both rows are written or neither is.

use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;

use crate::db::{create_notification, format_request_number, Capability, Role, User};

/// Title of every assignment notification
pub const ASSIGNMENT_TITLE: &str = "Вам назначена заявка";

/// Kind of request an executor can be assigned to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Client,
    Repair,
}

impl RequestKind {
    /// Page a user must be able to open to assign this kind
    pub fn capability(&self) -> Capability {
        match self {
            RequestKind::Client => Capability::ClientRequests,
            RequestKind::Repair => Capability::RepairRequests,
        }
    }

    fn table(&self) -> &'static str {
        match self {
            RequestKind::Client => "client_requests",
            RequestKind::Repair => "repair_requests",
        }
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestKind::Client => write!(f, "client"),
            RequestKind::Repair => write!(f, "repair"),
        }
    }
}

impl std::str::FromStr for RequestKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(RequestKind::Client),
            "repair" => Ok(RequestKind::Repair),
            _ => Err(format!("Unknown request kind: {}", s)),
        }
    }
}

/// What an assignment notification talks about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentTarget {
    Client { request_number: String },
    Repair { id: i64 },
}

/// Body of the notification sent to an executor on assignment
pub fn assignment_message(target: &AssignmentTarget) -> String {
    match target {
        AssignmentTarget::Client { request_number } => {
            format!("Вам назначена заявка {} для выполнения.", request_number)
        }
        AssignmentTarget::Repair { id } => {
            format!("Вам назначена заявка на ремонт #{} для выполнения.", id)
        }
    }
}

#[derive(Debug, Error)]
pub enum AssignmentError {
    #[error("{0} request {1} not found")]
    RequestNotFound(RequestKind, i64),

    #[error("User {0} not found")]
    ExecutorNotFound(i64),

    #[error("User {0} is not an executor")]
    NotAnExecutor(i64),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Outcome of a successful assignment
#[derive(Debug, Clone, Serialize)]
pub struct Assignment {
    pub success: bool,
    pub kind: RequestKind,
    pub request_id: i64,
    pub assigned_to: i64,
    pub notification_id: i64,
}

/// Assign `executor_id` to a request and notify them.
pub async fn assign_executor(
    pool: &SqlitePool,
    kind: RequestKind,
    request_id: i64,
    executor_id: i64,
) -> Result<Assignment, AssignmentError> {
    let executor = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(executor_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AssignmentError::ExecutorNotFound(executor_id))?;

    if executor.role_enum() != Role::Executor {
        return Err(AssignmentError::NotAnExecutor(executor_id));
    }

    let mut tx = pool.begin().await?;

    let sql = format!(
        "UPDATE {} SET assigned_to = ?, updated_at = ? WHERE id = ?",
        kind.table()
    );
    let updated = sqlx::query(&sql)
        .bind(executor.id)
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(request_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if updated == 0 {
        // Dropping the transaction rolls it back
        return Err(AssignmentError::RequestNotFound(kind, request_id));
    }

    let target = match kind {
        RequestKind::Client => {
            let number: Option<String> =
                sqlx::query_scalar("SELECT request_number FROM client_requests WHERE id = ?")
                    .bind(request_id)
                    .fetch_one(&mut *tx)
                    .await?;
            AssignmentTarget::Client {
                request_number: number.unwrap_or_else(|| format_request_number(request_id)),
            }
        }
        RequestKind::Repair => AssignmentTarget::Repair { id: request_id },
    };

    let notification_id = create_notification(
        &mut *tx,
        executor.id,
        ASSIGNMENT_TITLE,
        &assignment_message(&target),
    )
    .await?;

    tx.commit().await?;

    info!(
        kind = %kind,
        request_id = request_id,
        executor = %executor.username,
        notification_id = notification_id,
        "Executor assigned"
    );

    Ok(Assignment {
        success: true,
        kind,
        request_id,
        assigned_to: executor.id,
        notification_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{
        create_client_request, create_repair_request, init_memory, list_user_notifications,
        seed_role_users, CreateClientRequestRequest, CreateRepairRequestRequest,
    };

    #[test]
    fn test_client_message() {
        let message = assignment_message(&AssignmentTarget::Client {
            request_number: "CR-000012".to_string(),
        });
        assert_eq!(message, "Вам назначена заявка CR-000012 для выполнения.");
    }

    #[test]
    fn test_repair_message() {
        let message = assignment_message(&AssignmentTarget::Repair { id: 7 });
        assert_eq!(message, "Вам назначена заявка на ремонт #7 для выполнения.");
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!("client".parse::<RequestKind>().unwrap(), RequestKind::Client);
        assert_eq!("repair".parse::<RequestKind>().unwrap(), RequestKind::Repair);
        assert!("order".parse::<RequestKind>().is_err());
        assert_eq!(RequestKind::Repair.capability(), Capability::RepairRequests);
    }

    async fn fixtures() -> (SqlitePool, Vec<User>, i64, i64) {
        let pool = init_memory().await.unwrap();
        let users = seed_role_users(&pool).await.unwrap();
        let client = create_client_request(
            &pool,
            &CreateClientRequestRequest {
                client_id: None,
                client_name: "Test Client".to_string(),
                phone: "123456789".to_string(),
                client_email: "test@example.com".to_string(),
                description: "Test request for notification".to_string(),
                status: None,
            },
        )
        .await
        .unwrap();
        let repair = create_repair_request(
            &pool,
            &CreateRepairRequestRequest {
                organization_name: "Test Org".to_string(),
                client_last_name: "Test".to_string(),
                client_first_name: "Client".to_string(),
                phone: "123456789".to_string(),
                email: "test@example.com".to_string(),
                equipment_name: "Test Equipment".to_string(),
                issue_description: "Test issue".to_string(),
                status: None,
            },
        )
        .await
        .unwrap();
        (pool, users, client.id, repair.id)
    }

    fn executor(users: &[User]) -> &User {
        users.iter().find(|u| u.role_enum() == Role::Executor).unwrap()
    }

    #[tokio::test]
    async fn test_assign_client_request_notifies_executor() {
        let (pool, users, client_id, _) = fixtures().await;
        let executor = executor(&users);

        let assignment = assign_executor(&pool, RequestKind::Client, client_id, executor.id)
            .await
            .unwrap();
        assert_eq!(assignment.assigned_to, executor.id);

        let assigned_to: Option<i64> =
            sqlx::query_scalar("SELECT assigned_to FROM client_requests WHERE id = ?")
                .bind(client_id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(assigned_to, Some(executor.id));

        let notifications = list_user_notifications(&pool, executor.id).await.unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].title, ASSIGNMENT_TITLE);
        assert_eq!(
            notifications[0].message,
            format!("Вам назначена заявка {} для выполнения.", format_request_number(client_id))
        );
    }

    #[tokio::test]
    async fn test_assign_repair_request_notifies_executor() {
        let (pool, users, _, repair_id) = fixtures().await;
        let executor = executor(&users);

        assign_executor(&pool, RequestKind::Repair, repair_id, executor.id)
            .await
            .unwrap();

        let notifications = list_user_notifications(&pool, executor.id).await.unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(
            notifications[0].message,
            format!("Вам назначена заявка на ремонт #{} для выполнения.", repair_id)
        );
    }

    #[tokio::test]
    async fn test_missing_request_leaves_no_notification() {
        let (pool, users, _, _) = fixtures().await;
        let executor = executor(&users);

        let err = assign_executor(&pool, RequestKind::Repair, 9999, executor.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AssignmentError::RequestNotFound(RequestKind::Repair, 9999)));

        let notifications = list_user_notifications(&pool, executor.id).await.unwrap();
        assert!(notifications.is_empty());
    }

    #[tokio::test]
    async fn test_only_executors_can_be_assigned() {
        let (pool, users, client_id, _) = fixtures().await;
        let manager = users.iter().find(|u| u.role_enum() == Role::Manager).unwrap();

        let err = assign_executor(&pool, RequestKind::Client, client_id, manager.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AssignmentError::NotAnExecutor(_)));

        let err = assign_executor(&pool, RequestKind::Client, client_id, 4242)
            .await
            .unwrap_err();
        assert!(matches!(err, AssignmentError::ExecutorNotFound(4242)));
    }
}
