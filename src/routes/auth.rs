use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::auth::password;
use crate::db;
use crate::error::AppError;
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct SigninRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct SigninResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub username: String,
    pub tenant: Option<String>,
}

pub async fn signin(
    State(state): State<SharedState>,
    Json(req): Json<SigninRequest>,
) -> Result<Json<SigninResponse>, AppError> {
    let user = db::users::find_by_username(&state.pool, &req.username)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

    if !password::verify(&req.password, &user.password_hash)? {
        tracing::debug!(username = %req.username, "Sign-in rejected");
        return Err(AppError::Unauthorized("Invalid credentials".to_string()));
    }

    let tenant = db::users::find_tenant_schema(&state.pool, &user.username).await?;
    let access_token = state
        .tokens
        .issue(&user, tenant.clone())
        .map_err(AppError::Internal)?;

    tracing::info!(username = %user.username, tenant = ?tenant, "User signed in");

    Ok(Json(SigninResponse {
        access_token,
        token_type: "Bearer",
        username: user.username,
        tenant,
    }))
}
