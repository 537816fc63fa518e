use axum::RequestPartsExt;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use axum_extra::headers::Authorization;
use axum_extra::headers::authorization::Bearer;

use crate::error::AppError;
use crate::state::SharedState;

/// Authenticated caller, taken from a Bearer token.
///
/// This is the authorization side: unlike tenant resolution, a missing or
/// invalid token here rejects the request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub username: String,
    pub system_admin: bool,
}

impl AuthUser {
    pub fn require_system_admin(&self) -> Result<(), AppError> {
        if self.system_admin {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "System admin access required".to_string(),
            ))
        }
    }
}

impl FromRequestParts<SharedState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AppError::Unauthorized("Missing authentication token".to_string()))?;

        let claims = state
            .tokens
            .decode(bearer.token())
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))?;

        Ok(AuthUser {
            user_id: claims.uid,
            username: claims.sub,
            system_admin: claims.sys,
        })
    }
}
