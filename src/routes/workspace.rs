use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::models::Company;
use crate::state::{AppState, SharedState};
use crate::tenant::SchemaName;

#[derive(Serialize)]
pub struct WorkspaceContext {
    /// Schema the request was bound to.
    pub schema: String,
    /// `search_path` of the connection handed out for this request.
    pub search_path: String,
    /// First schema on the search path that exists, if any.
    pub current_schema: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateCompany {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

fn require_tenant(state: &AppState) -> Result<SchemaName, AppError> {
    state
        .context
        .bound()
        .filter(|schema| schema != state.context.default_schema())
        .ok_or_else(|| {
            AppError::Forbidden("No tenant workspace is bound to this account".to_string())
        })
}

pub async fn context(State(state): State<SharedState>) -> Result<Json<WorkspaceContext>, AppError> {
    let schema = state.context.current();

    let mut conn = state.connections.acquire().await?;
    let row: Result<(String, Option<String>), sqlx::Error> =
        sqlx::query_as("SELECT current_setting('search_path'), current_schema()::text")
            .fetch_one(&mut *conn)
            .await;
    conn.release().await?;
    let (search_path, current_schema) = row?;

    Ok(Json(WorkspaceContext {
        schema: schema.to_string(),
        search_path,
        current_schema,
    }))
}

pub async fn list_companies(
    _auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<Company>>, AppError> {
    require_tenant(&state)?;

    let mut conn = state.connections.acquire().await?;
    let companies = db::companies::list(&mut conn).await;
    conn.release().await?;

    Ok(Json(companies?))
}

pub async fn create_company(
    _auth: AuthUser,
    State(state): State<SharedState>,
    Json(req): Json<CreateCompany>,
) -> Result<Json<Company>, AppError> {
    let schema = require_tenant(&state)?;

    if req.name.trim().is_empty() {
        return Err(AppError::BadRequest("Company name is required".to_string()));
    }

    let mut conn = state.connections.acquire().await?;
    let company = db::companies::create(
        &mut conn,
        req.name.trim(),
        req.email.as_deref(),
        req.phone.as_deref(),
    )
    .await;
    conn.release().await?;
    let company = company?;

    tracing::info!(schema = %schema, company_id = company.id, "Company created");
    Ok(Json(company))
}
