//! Repair work order models.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};

use super::common::{RequestStatus, StatusFilter};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RepairRequest {
    pub id: i64,
    pub organization_name: String,
    pub client_last_name: String,
    pub client_first_name: String,
    pub phone: String,
    pub email: String,
    pub equipment_name: String,
    pub issue_description: String,
    pub status: String,
    pub assigned_to: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

impl RepairRequest {
    pub fn status_enum(&self) -> RequestStatus {
        RequestStatus::from(self.status.clone())
    }
}

/// Request to open a repair work order
#[derive(Debug, Deserialize)]
pub struct CreateRepairRequestRequest {
    #[serde(default)]
    pub organization_name: String,
    #[serde(default)]
    pub client_last_name: String,
    #[serde(default)]
    pub client_first_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    pub equipment_name: String,
    pub issue_description: String,
    pub status: Option<RequestStatus>,
}

pub async fn list_repair_requests(
    pool: &SqlitePool,
    filter: StatusFilter,
) -> Result<Vec<RepairRequest>, sqlx::Error> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM repair_requests");
    if let Some(status) = filter.status() {
        qb.push(" WHERE status = ").push_bind(status.as_str());
    }
    qb.push(" ORDER BY created_at DESC, id DESC");

    qb.build_query_as::<RepairRequest>().fetch_all(pool).await
}

pub async fn create_repair_request(
    pool: &SqlitePool,
    req: &CreateRepairRequestRequest,
) -> Result<RepairRequest, sqlx::Error> {
    let now = chrono::Utc::now().to_rfc3339();

    let id = sqlx::query(
        r#"
        INSERT INTO repair_requests (
            organization_name, client_last_name, client_first_name, phone, email,
            equipment_name, issue_description, status, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&req.organization_name)
    .bind(&req.client_last_name)
    .bind(&req.client_first_name)
    .bind(&req.phone)
    .bind(&req.email)
    .bind(&req.equipment_name)
    .bind(&req.issue_description)
    .bind(req.status.unwrap_or_default().as_str())
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?
    .last_insert_rowid();

    sqlx::query_as::<_, RepairRequest>("SELECT * FROM repair_requests WHERE id = ?")
        .bind(id)
        .fetch_one(pool)
        .await
}
