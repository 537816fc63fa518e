use sqlx::PgPool;

use crate::models::Tenant;

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    name: &str,
    schema: &str,
    description: Option<&str>,
    active: bool,
) -> Result<Tenant, sqlx::Error> {
    sqlx::query_as::<_, Tenant>(
        "INSERT INTO tenants (name, schema, description, active)
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(name)
    .bind(schema)
    .bind(description)
    .bind(active)
    .fetch_one(executor)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Tenant>, sqlx::Error> {
    sqlx::query_as::<_, Tenant>("SELECT * FROM tenants WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list(pool: &PgPool) -> Result<Vec<Tenant>, sqlx::Error> {
    sqlx::query_as::<_, Tenant>("SELECT * FROM tenants ORDER BY created_at DESC, id DESC")
        .fetch_all(pool)
        .await
}

pub async fn exists_by_name(pool: &PgPool, name: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM tenants WHERE name = $1)")
        .bind(name)
        .fetch_one(pool)
        .await
}

pub async fn exists_by_schema(pool: &PgPool, schema: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM tenants WHERE schema = $1)")
        .bind(schema)
        .fetch_one(pool)
        .await
}

/// Flip the active flag. The schema column is never touched after creation.
pub async fn set_active(
    pool: &PgPool,
    id: i64,
    active: bool,
) -> Result<Option<Tenant>, sqlx::Error> {
    sqlx::query_as::<_, Tenant>(
        "UPDATE tenants SET active = $2, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(active)
    .fetch_optional(pool)
    .await
}

pub async fn set_admin_user<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    id: i64,
    admin_user_id: i64,
) -> Result<Tenant, sqlx::Error> {
    sqlx::query_as::<_, Tenant>(
        "UPDATE tenants SET admin_user_id = $2, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(admin_user_id)
    .fetch_one(executor)
    .await
}
