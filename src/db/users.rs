use sqlx::PgPool;

use crate::models::User;

pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub full_name: Option<&'a str>,
    pub phone_number: Option<&'a str>,
    pub tenant_id: Option<i64>,
    pub system_admin: bool,
}

pub async fn create<'e, E: sqlx::PgExecutor<'e>>(
    executor: E,
    user: NewUser<'_>,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (username, email, password_hash, full_name, phone_number, tenant_id, system_admin)
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
    )
    .bind(user.username)
    .bind(user.email)
    .bind(user.password_hash)
    .bind(user.full_name)
    .bind(user.phone_number)
    .bind(user.tenant_id)
    .bind(user.system_admin)
    .fetch_one(executor)
    .await
}

pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await
}

pub async fn exists_by_username(pool: &PgPool, username: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE username = $1)")
        .bind(username)
        .fetch_one(pool)
        .await
}

pub async fn exists_by_email(pool: &PgPool, email: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
        .bind(email)
        .fetch_one(pool)
        .await
}

/// Schema of the tenant a user belongs to. `None` for unknown users and for
/// platform accounts without a tenant.
pub async fn find_tenant_schema(
    pool: &PgPool,
    username: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT t.schema FROM users u
         JOIN tenants t ON t.id = u.tenant_id
         WHERE u.username = $1",
    )
    .bind(username)
    .fetch_optional(pool)
    .await
}
