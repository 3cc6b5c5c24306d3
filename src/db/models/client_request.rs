//! Client request models and the per-role visibility scope of the request list.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};

use super::common::{RequestStatus, StatusFilter};
use super::role::Role;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClientRequest {
    pub id: i64,
    pub request_number: Option<String>,
    pub client_id: Option<i64>,
    pub client_name: String,
    pub phone: String,
    pub client_email: String,
    pub description: String,
    pub status: String,
    pub assigned_to: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

impl ClientRequest {
    pub fn status_enum(&self) -> RequestStatus {
        RequestStatus::from(self.status.clone())
    }

    /// Human-readable number, derived from the id if the row predates numbering
    pub fn number(&self) -> String {
        self.request_number
            .clone()
            .unwrap_or_else(|| format_request_number(self.id))
    }
}

/// Format the human-readable number of a client request (e.g. `CR-000042`)
pub fn format_request_number(id: i64) -> String {
    format!("CR-{:06}", id)
}

/// Request to open a new client request
#[derive(Debug, Deserialize)]
pub struct CreateClientRequestRequest {
    /// Link to an existing client from the client base
    pub client_id: Option<i64>,
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub client_email: String,
    #[serde(default)]
    pub description: String,
    pub status: Option<RequestStatus>,
}

/// One kanban column
#[derive(Debug, Clone, Serialize)]
pub struct KanbanColumn {
    pub status: RequestStatus,
    pub requests: Vec<ClientRequest>,
}

/// Kanban board of client requests, one column per status
#[derive(Debug, Clone, Serialize)]
pub struct KanbanBoard {
    pub columns: Vec<KanbanColumn>,
    pub total: usize,
}

impl KanbanBoard {
    pub fn from_requests(requests: Vec<ClientRequest>) -> Self {
        let total = requests.len();
        let mut columns: Vec<KanbanColumn> = RequestStatus::ALL
            .iter()
            .map(|status| KanbanColumn {
                status: *status,
                requests: Vec::new(),
            })
            .collect();

        for request in requests {
            let status = request.status_enum();
            if let Some(column) = columns.iter_mut().find(|c| c.status == status) {
                column.requests.push(request);
            }
        }

        Self { columns, total }
    }
}

/// The subset of client requests a user may see.
///
/// `statuses: None` means any status; `Some(vec![])` means nothing at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestScope {
    pub assigned_to: Option<i64>,
    pub statuses: Option<Vec<RequestStatus>>,
}

impl RequestScope {
    pub fn for_user(user_id: i64, role: Role, filter: StatusFilter) -> Self {
        if role.is_executor() {
            let statuses = RequestStatus::EXECUTOR_VISIBLE
                .iter()
                .copied()
                .filter(|s| filter.status().map_or(true, |wanted| wanted == *s))
                .collect();
            Self {
                assigned_to: Some(user_id),
                statuses: Some(statuses),
            }
        } else {
            Self {
                assigned_to: None,
                statuses: filter.status().map(|s| vec![s]),
            }
        }
    }

    pub fn matches(&self, request: &ClientRequest) -> bool {
        if let Some(user_id) = self.assigned_to {
            if request.assigned_to != Some(user_id) {
                return false;
            }
        }
        match &self.statuses {
            None => true,
            Some(statuses) => statuses.contains(&request.status_enum()),
        }
    }

    fn query(&self) -> QueryBuilder<'static, Sqlite> {
        let mut qb = QueryBuilder::new("SELECT * FROM client_requests WHERE 1 = 1");

        if let Some(user_id) = self.assigned_to {
            qb.push(" AND assigned_to = ").push_bind(user_id);
        }

        match &self.statuses {
            None => {}
            Some(statuses) if statuses.is_empty() => {
                qb.push(" AND 0");
            }
            Some(statuses) => {
                qb.push(" AND status IN (");
                let mut separated = qb.separated(", ");
                for status in statuses {
                    separated.push_bind(status.as_str());
                }
                separated.push_unseparated(")");
            }
        }

        qb.push(" ORDER BY created_at DESC, id DESC");
        qb
    }

    pub async fn fetch(&self, pool: &SqlitePool) -> Result<Vec<ClientRequest>, sqlx::Error> {
        self.query()
            .build_query_as::<ClientRequest>()
            .fetch_all(pool)
            .await
    }
}

/// Insert a client request and give it its human-readable number.
///
/// Empty contact fields are copied from the linked client, if any.
pub async fn create_client_request(
    pool: &SqlitePool,
    req: &CreateClientRequestRequest,
) -> Result<ClientRequest, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let mut client_name = req.client_name.clone();
    let mut phone = req.phone.clone();
    let mut client_email = req.client_email.clone();

    if let Some(client_id) = req.client_id {
        let client = sqlx::query_as::<_, super::client::Client>("SELECT * FROM clients WHERE id = ?")
            .bind(client_id)
            .fetch_one(&mut *tx)
            .await?;
        if client_name.is_empty() {
            client_name = client.name;
        }
        if phone.is_empty() {
            phone = client.phone;
        }
        if client_email.is_empty() {
            client_email = client.email;
        }
    }

    let now = chrono::Utc::now().to_rfc3339();
    let status = req.status.unwrap_or_default();

    let id = sqlx::query(
        r#"
        INSERT INTO client_requests (client_id, client_name, phone, client_email, description, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(req.client_id)
    .bind(&client_name)
    .bind(&phone)
    .bind(&client_email)
    .bind(&req.description)
    .bind(status.as_str())
    .bind(&now)
    .bind(&now)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    sqlx::query("UPDATE client_requests SET request_number = ? WHERE id = ?")
        .bind(format_request_number(id))
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let request = sqlx::query_as::<_, ClientRequest>("SELECT * FROM client_requests WHERE id = ?")
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(request)
}
