use std::ops::{Deref, DerefMut};

use sqlx::pool::PoolConnection;
use sqlx::{Executor, PgConnection, PgPool, Postgres};

use crate::tenant::{SchemaName, TenantContext};

const LIVE: &str = "tenant connection is live until released";

/// Switch the session's active schema.
pub async fn set_search_path(
    conn: &mut PgConnection,
    schema: &SchemaName,
) -> Result<(), sqlx::Error> {
    let sql = format!("SET search_path TO {}", schema.quoted());
    Executor::execute(&mut *conn, sql.as_str()).await?;
    Ok(())
}

/// Checks connections out of the shared pool bound to the current tenant.
///
/// Every idle connection in the pool sits on the default schema. `acquire`
/// moves the checkout to the schema in the [`TenantContext`], and
/// [`TenantConnection::release`] moves it back before it re-enters the pool.
#[derive(Debug, Clone)]
pub struct ConnectionProvider {
    pool: PgPool,
    context: TenantContext,
}

impl ConnectionProvider {
    pub fn new(pool: PgPool, context: TenantContext) -> Self {
        Self { pool, context }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn context(&self) -> &TenantContext {
        &self.context
    }

    pub async fn acquire(&self) -> Result<TenantConnection, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        let schema = self.context.current();

        if let Err(e) = set_search_path(&mut conn, &schema).await {
            tracing::error!(schema = %schema, "Failed to switch schema on checkout: {e}");
            if let Err(close_err) = conn.close().await {
                tracing::warn!("Failed to close connection after schema switch error: {close_err}");
            }
            return Err(e);
        }

        tracing::debug!(schema = %schema, "Connection checked out");
        Ok(TenantConnection {
            conn: Some(conn),
            schema,
            default_schema: self.context.default_schema().clone(),
        })
    }
}

/// A pooled connection whose `search_path` points at one tenant schema.
///
/// Hand it back with [`release`](TenantConnection::release). A connection
/// dropped without being released is detached from the pool and closed,
/// unless it was already on the default schema.
pub struct TenantConnection {
    conn: Option<PoolConnection<Postgres>>,
    schema: SchemaName,
    default_schema: SchemaName,
}

impl TenantConnection {
    pub fn schema(&self) -> &SchemaName {
        &self.schema
    }

    /// Reset the session to the default schema and return it to the pool.
    ///
    /// If the reset fails the connection is closed instead, and the error is
    /// returned.
    pub async fn release(mut self) -> Result<(), sqlx::Error> {
        let Some(mut conn) = self.conn.take() else {
            return Ok(());
        };

        match set_search_path(&mut conn, &self.default_schema).await {
            Ok(()) => {
                tracing::debug!(schema = %self.schema, "Connection released");
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    schema = %self.schema,
                    "Failed to reset schema on release, closing connection: {e}"
                );
                if let Err(close_err) = conn.close().await {
                    tracing::warn!("Failed to close connection: {close_err}");
                }
                Err(e)
            }
        }
    }
}

impl Deref for TenantConnection {
    type Target = PgConnection;

    fn deref(&self) -> &PgConnection {
        self.conn.as_deref().expect(LIVE)
    }
}

impl DerefMut for TenantConnection {
    fn deref_mut(&mut self) -> &mut PgConnection {
        self.conn.as_deref_mut().expect(LIVE)
    }
}

impl Drop for TenantConnection {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };

        if self.schema == self.default_schema {
            return;
        }

        tracing::warn!(
            schema = %self.schema,
            "Connection dropped without release, closing it instead of returning it to the pool"
        );
        drop(conn.detach());
    }
}
