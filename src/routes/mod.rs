pub mod auth;
pub mod tenants;
pub mod workspace;

use axum::Router;
use axum::routing::{get, post, put};

use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Auth (bypasses tenant resolution)
        .route("/api/auth/signin", post(auth::signin))
        .route("/api/auth/tenant-signup", post(tenants::signup))
        // Tenant registry
        .route("/api/tenants", get(tenants::list).post(tenants::create))
        .route("/api/tenants/{id}", get(tenants::get))
        .route("/api/tenants/{id}/activate", put(tenants::activate))
        .route("/api/tenants/{id}/deactivate", put(tenants::deactivate))
        // Tenant-scoped data
        .route("/api/workspace/context", get(workspace::context))
        .route(
            "/api/workspace/companies",
            get(workspace::list_companies).post(workspace::create_company),
        )
}
