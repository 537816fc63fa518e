use sqlx::PgConnection;

use crate::models::Company;

// Unqualified table names: these run on a `TenantConnection`, whose
// search_path decides which tenant's `companies` table is hit.

pub async fn create(
    conn: &mut PgConnection,
    name: &str,
    email: Option<&str>,
    phone: Option<&str>,
) -> Result<Company, sqlx::Error> {
    sqlx::query_as::<_, Company>(
        "INSERT INTO companies (name, email, phone) VALUES ($1, $2, $3)
         RETURNING id, name, email, phone, active, created_at",
    )
    .bind(name)
    .bind(email)
    .bind(phone)
    .fetch_one(conn)
    .await
}

pub async fn list(conn: &mut PgConnection) -> Result<Vec<Company>, sqlx::Error> {
    sqlx::query_as::<_, Company>(
        "SELECT id, name, email, phone, active, created_at FROM companies ORDER BY id",
    )
    .fetch_all(conn)
    .await
}
