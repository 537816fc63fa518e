use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Users live centrally in the default schema; only domain tables are
/// duplicated per tenant.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: Option<String>,
    pub phone_number: Option<String>,
    pub tenant_id: Option<i64>,
    pub system_admin: bool,
    pub created_at: DateTime<Utc>,
}
