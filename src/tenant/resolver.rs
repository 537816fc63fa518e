use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::{Authorization, HeaderMapExt};
use sqlx::PgPool;
use tracing::Instrument;

use crate::db;

use super::{SchemaName, TenantContext};

/// The slice of the token service the resolver relies on.
pub trait TokenValidator: Send + Sync {
    /// Signature, expiry and issuer check.
    fn validate(&self, token: &str) -> bool;
    fn subject_of(&self, token: &str) -> Option<String>;
}

/// Maps a username to the schema of the tenant it belongs to.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    async fn schema_for_user(&self, username: &str) -> Result<Option<SchemaName>, sqlx::Error>;
}

/// Directory backed by the central `users` and `tenants` tables.
pub struct PgTenantDirectory {
    pool: PgPool,
}

impl PgTenantDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TenantDirectory for PgTenantDirectory {
    async fn schema_for_user(&self, username: &str) -> Result<Option<SchemaName>, sqlx::Error> {
        let Some(raw) = db::users::find_tenant_schema(&self.pool, username).await? else {
            return Ok(None);
        };

        match SchemaName::parse(&raw) {
            Ok(schema) => Ok(Some(schema)),
            Err(e) => {
                tracing::warn!(username, schema = %raw, "Tenant has an unusable schema name: {e}");
                Ok(None)
            }
        }
    }
}

/// Decides which schema an inbound request is bound to.
#[derive(Clone)]
pub struct TenantResolver {
    context: TenantContext,
    bypass_prefixes: Arc<[String]>,
    tokens: Arc<dyn TokenValidator>,
    directory: Arc<dyn TenantDirectory>,
}

impl TenantResolver {
    pub fn new(
        context: TenantContext,
        bypass_prefixes: Vec<String>,
        tokens: Arc<dyn TokenValidator>,
        directory: Arc<dyn TenantDirectory>,
    ) -> Self {
        Self {
            context,
            bypass_prefixes: bypass_prefixes.into(),
            tokens,
            directory,
        }
    }

    pub fn context(&self) -> &TenantContext {
        &self.context
    }

    pub fn is_bypassed(&self, path: &str) -> bool {
        self.bypass_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Never fails: anything short of a valid token for a user with a
    /// tenant resolves to the default schema. Rejecting the request is left
    /// to authorization.
    pub async fn resolve(&self, path: &str, bearer: Option<&str>) -> SchemaName {
        let default_schema = self.context.default_schema();

        if self.is_bypassed(path) {
            tracing::debug!(path, "Public or auth endpoint, using default schema");
            return default_schema.clone();
        }

        let Some(token) = bearer else {
            tracing::debug!(path, "No bearer token, using default schema");
            return default_schema.clone();
        };

        if !self.tokens.validate(token) {
            tracing::debug!(path, "Invalid bearer token, using default schema");
            return default_schema.clone();
        }

        let Some(username) = self.tokens.subject_of(token) else {
            return default_schema.clone();
        };

        match self.directory.schema_for_user(&username).await {
            Ok(Some(schema)) => {
                tracing::debug!(%username, schema = %schema, "Resolved tenant schema");
                schema
            }
            Ok(None) => {
                tracing::debug!(%username, "User missing or without tenant, using default schema");
                default_schema.clone()
            }
            Err(e) => {
                tracing::warn!(%username, "Tenant lookup failed, using default schema: {e}");
                default_schema.clone()
            }
        }
    }
}

/// Same parsing as the `AuthUser` extractor: the scheme is matched
/// case-insensitively and a malformed header counts as no token.
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|Authorization(bearer)| bearer.token().to_string())
}

/// Middleware binding each request to its tenant schema.
///
/// The rest of the request runs inside a fresh context scope, so the
/// binding is gone once the response is produced, whatever the outcome.
pub async fn resolve_tenant(
    State(resolver): State<TenantResolver>,
    req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();
    let token = bearer_token(req.headers());
    let schema = resolver.resolve(&path, token.as_deref()).await;

    let span = tracing::debug_span!("tenant", schema = %schema);
    let context = resolver.context();

    context
        .scope(
            async {
                context.set(schema);
                next.run(req).await
            }
            .instrument(span),
        )
        .await
}
