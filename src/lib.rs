pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod state;
pub mod tenant;

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderName, HeaderValue};
use sqlx::PgPool;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::auth::jwt::JwtTokens;
use crate::config::Config;
use crate::db::ConnectionProvider;
use crate::state::{AppState, SharedState};
use crate::tenant::resolver::resolve_tenant;
use crate::tenant::{PgTenantDirectory, SchemaProvisioner, TenantContext, TenantResolver};

pub fn build_state(pool: PgPool, config: Config) -> SharedState {
    let context = TenantContext::new(config.default_schema.clone());
    let tokens = JwtTokens::new(
        &config.jwt_secret,
        &config.jwt_issuer,
        config.jwt_expiration_minutes,
    );

    // One pool for every tenant; isolation comes from the per-checkout
    // schema switch.
    let connections = ConnectionProvider::new(pool.clone(), context.clone());
    let provisioner = SchemaProvisioner::new(connections.clone());

    let resolver = TenantResolver::new(
        context.clone(),
        config.bypass_prefixes.clone(),
        Arc::new(tokens.clone()),
        Arc::new(PgTenantDirectory::new(pool.clone())),
    );

    Arc::new(AppState {
        pool,
        config,
        tokens,
        context,
        connections,
        provisioner,
        resolver,
    })
}

pub fn build_app(pool: PgPool, config: Config) -> Router {
    router(build_state(pool, config))
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .merge(routes::api_routes())
        .route("/health", axum::routing::get(health))
        .layer(axum::middleware::from_fn_with_state(
            state.resolver.clone(),
            resolve_tenant,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
