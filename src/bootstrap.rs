use sqlx::PgPool;

use crate::auth::password;
use crate::config::{Config, SystemAdminSeed};
use crate::db;
use crate::db::ConnectionProvider;
use crate::db::users::NewUser;
use crate::error::AppError;
use crate::tenant::{SchemaProvisioner, TenantContext};

/// Make the default schema exist, apply migrations to it and seed the
/// platform admin.
pub async fn prepare_database(pool: &PgPool, config: &Config) -> Result<(), AppError> {
    let default_schema = &config.default_schema;
    let provisioner = SchemaProvisioner::new(ConnectionProvider::new(
        pool.clone(),
        TenantContext::new(default_schema.clone()),
    ));

    if !provisioner.schema_exists(default_schema).await? {
        tracing::info!(schema = %default_schema, "Creating default schema");
        provisioner.ensure_schema(default_schema).await?;
    }

    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to run migrations: {e}")))?;

    tracing::info!(schema = %default_schema, "Migrations applied");

    if let Some(seed) = &config.system_admin {
        seed_system_admin(pool, seed).await?;
    }

    Ok(())
}

async fn seed_system_admin(pool: &PgPool, seed: &SystemAdminSeed) -> Result<(), AppError> {
    if db::users::exists_by_username(pool, &seed.username).await? {
        return Ok(());
    }

    let password_hash = password::hash(&seed.password)?;
    db::users::create(
        pool,
        NewUser {
            username: &seed.username,
            email: &seed.email,
            password_hash: &password_hash,
            full_name: Some("System Administrator"),
            phone_number: None,
            tenant_id: None,
            system_admin: true,
        },
    )
    .await?;

    tracing::info!(username = %seed.username, "System admin account created");
    Ok(())
}
