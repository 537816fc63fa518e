use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::jwt::JwtTokens;
use crate::config::Config;
use crate::db::ConnectionProvider;
use crate::tenant::{SchemaProvisioner, TenantContext, TenantResolver};

pub type SharedState = Arc<AppState>;

pub struct AppState {
    /// Default-schema access: tenant registry and users.
    pub pool: PgPool,
    pub config: Config,
    pub tokens: JwtTokens,
    pub context: TenantContext,
    /// Tenant-schema access for request handlers.
    pub connections: ConnectionProvider,
    pub provisioner: SchemaProvisioner,
    pub resolver: TenantResolver,
}
