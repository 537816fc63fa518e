use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::models::User;
use crate::tenant::TokenValidator;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Username.
    pub sub: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub uid: i64,
    pub email: String,
    pub sys: bool,
    /// Tenant schema at issue time. Informational; the resolver always
    /// looks the tenant up again.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
}

impl Claims {
    pub fn new(user: &User, tenant: Option<String>, issuer: &str, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: user.username.clone(),
            iss: issuer.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            uid: user.id,
            email: user.email.clone(),
            sys: user.system_admin,
            tenant,
        }
    }
}

pub fn encode_token(claims: &Claims, secret: &str) -> Result<String, String> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| format!("JWT encode failed: {e}"))
}

pub fn decode_token(token: &str, secret: &str, issuer: &str) -> Result<Claims, String> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[issuer]);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| format!("JWT decode failed: {e}"))
}

/// HS256 token service: issues tokens at sign-in and validates them for the
/// tenant resolver and the [`AuthUser`](super::extractor::AuthUser) extractor.
#[derive(Debug, Clone)]
pub struct JwtTokens {
    secret: String,
    issuer: String,
    ttl: Duration,
}

impl JwtTokens {
    pub fn new(secret: &str, issuer: &str, ttl_minutes: i64) -> Self {
        Self {
            secret: secret.to_string(),
            issuer: issuer.to_string(),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    pub fn issue(&self, user: &User, tenant: Option<String>) -> Result<String, String> {
        let claims = Claims::new(user, tenant, &self.issuer, self.ttl);
        encode_token(&claims, &self.secret)
    }

    pub fn decode(&self, token: &str) -> Result<Claims, String> {
        decode_token(token, &self.secret, &self.issuer)
    }
}

impl TokenValidator for JwtTokens {
    fn validate(&self, token: &str) -> bool {
        match self.decode(token) {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!("Rejected bearer token: {e}");
                false
            }
        }
    }

    fn subject_of(&self, token: &str) -> Option<String> {
        self.decode(token).ok().map(|claims| claims.sub)
    }
}
