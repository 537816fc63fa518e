use sqlx::{Executor, PgConnection};

use crate::db::ConnectionProvider;

use super::SchemaName;

/// Baseline domain tables created in every tenant schema.
///
/// Names are unqualified on purpose: the batch runs on a connection whose
/// search_path points at the tenant schema. Every statement must stay a
/// no-op when the table already exists so provisioning can be retried.
const BASELINE_TABLES: &[(&str, &str)] = &[
    (
        "companies",
        "CREATE TABLE IF NOT EXISTS companies (
            id               BIGSERIAL PRIMARY KEY,
            name             VARCHAR(255) NOT NULL,
            logo             VARCHAR(255),
            email            VARCHAR(255),
            phone            VARCHAR(50),
            address          TEXT,
            website          VARCHAR(255),
            tax_code         VARCHAR(50),
            business_code    VARCHAR(50),
            established_date DATE,
            active           BOOLEAN NOT NULL DEFAULT TRUE,
            created_at       TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at       TIMESTAMPTZ,
            created_by       BIGINT,
            updated_by       BIGINT
        )",
    ),
    (
        "departments",
        "CREATE TABLE IF NOT EXISTS departments (
            id          BIGSERIAL PRIMARY KEY,
            name        VARCHAR(255) NOT NULL,
            code        VARCHAR(50),
            description TEXT,
            company_id  BIGINT NOT NULL REFERENCES companies (id),
            parent_id   BIGINT REFERENCES departments (id),
            manager_id  BIGINT,
            active      BOOLEAN NOT NULL DEFAULT TRUE,
            created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at  TIMESTAMPTZ,
            created_by  BIGINT,
            updated_by  BIGINT
        )",
    ),
    (
        "positions",
        "CREATE TABLE IF NOT EXISTS positions (
            id            BIGSERIAL PRIMARY KEY,
            name          VARCHAR(255) NOT NULL,
            code          VARCHAR(50),
            description   TEXT,
            department_id BIGINT REFERENCES departments (id),
            level         INTEGER,
            active        BOOLEAN NOT NULL DEFAULT TRUE,
            created_at    TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at    TIMESTAMPTZ
        )",
    ),
    (
        "employees",
        "CREATE TABLE IF NOT EXISTS employees (
            id            BIGSERIAL PRIMARY KEY,
            user_id       BIGINT,
            employee_code VARCHAR(50),
            full_name     VARCHAR(255) NOT NULL,
            email         VARCHAR(255),
            phone         VARCHAR(50),
            company_id    BIGINT REFERENCES companies (id),
            department_id BIGINT REFERENCES departments (id),
            position_id   BIGINT REFERENCES positions (id),
            hire_date     DATE,
            active        BOOLEAN NOT NULL DEFAULT TRUE,
            created_at    TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at    TIMESTAMPTZ
        )",
    ),
    (
        "teams",
        "CREATE TABLE IF NOT EXISTS teams (
            id            BIGSERIAL PRIMARY KEY,
            name          VARCHAR(255) NOT NULL,
            description   TEXT,
            department_id BIGINT REFERENCES departments (id),
            leader_id     BIGINT REFERENCES employees (id),
            active        BOOLEAN NOT NULL DEFAULT TRUE,
            created_at    TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at    TIMESTAMPTZ
        )",
    ),
];

/// Creates tenant schemas and their baseline tables.
#[derive(Debug, Clone)]
pub struct SchemaProvisioner {
    connections: ConnectionProvider,
}

impl SchemaProvisioner {
    pub fn new(connections: ConnectionProvider) -> Self {
        Self { connections }
    }

    pub fn baseline_tables() -> impl Iterator<Item = &'static str> {
        BASELINE_TABLES.iter().map(|(table, _)| *table)
    }

    pub async fn schema_exists(&self, schema: &SchemaName) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM pg_namespace WHERE nspname = $1)")
            .bind(schema.as_str())
            .fetch_one(self.connections.pool())
            .await
    }

    /// `CREATE SCHEMA IF NOT EXISTS`, issued from the default schema.
    pub async fn ensure_schema(&self, schema: &SchemaName) -> Result<(), sqlx::Error> {
        let context = self.connections.context();
        let default_schema = context.default_schema().clone();

        context
            .pin(default_schema, async {
                let sql = format!("CREATE SCHEMA IF NOT EXISTS {}", schema.quoted());
                let mut conn = self.connections.acquire().await?;
                let result = Executor::execute(&mut *conn, sql.as_str()).await;
                let released = conn.release().await;
                result.map(|_| ()).and(released)
            })
            .await
    }

    /// Create `schema` and its baseline tables.
    ///
    /// There is no rollback: if a statement in the batch fails, the tables
    /// created before it stay in place and the error is returned.
    pub async fn provision(&self, schema: &SchemaName) -> Result<(), sqlx::Error> {
        self.ensure_schema(schema).await?;

        self.connections
            .context()
            .pin(schema.clone(), async {
                let mut conn = self.connections.acquire().await?;
                let result = create_baseline_tables(&mut conn).await;
                let released = conn.release().await;
                result.and(released)
            })
            .await?;

        tracing::info!(schema = %schema, "Tenant schema provisioned");
        Ok(())
    }
}

async fn create_baseline_tables(conn: &mut PgConnection) -> Result<(), sqlx::Error> {
    for &(table, ddl) in BASELINE_TABLES {
        tracing::debug!(table, "Creating baseline table");
        Executor::execute(&mut *conn, ddl).await?;
    }
    Ok(())
}
