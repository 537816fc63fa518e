use std::net::IpAddr;

use crate::tenant::SchemaName;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_expiration_minutes: i64,
    pub host: IpAddr,
    pub port: u16,
    pub default_schema: SchemaName,
    /// Path prefixes that skip tenant resolution and always run against the
    /// default schema.
    pub bypass_prefixes: Vec<String>,
    pub max_connections: u32,
    pub log_level: String,
    pub system_admin: Option<SystemAdminSeed>,
}

/// Platform account created at startup if it does not exist yet.
#[derive(Debug, Clone)]
pub struct SystemAdminSeed {
    pub username: String,
    pub email: String,
    pub password: String,
}

pub const DEFAULT_BYPASS_PREFIXES: &str = "/api/auth,/api/public";

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;
        let jwt_secret = env_required("JWT_SECRET")?;
        let jwt_issuer = env_or("JWT_ISSUER", "schemagate");

        let jwt_expiration_minutes: i64 = env_or("JWT_EXPIRATION_MINUTES", "60")
            .parse()
            .map_err(|e| format!("Invalid JWT_EXPIRATION_MINUTES: {e}"))?;

        let host: IpAddr = env_or("SCHEMAGATE_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid SCHEMAGATE_HOST: {e}"))?;

        let port: u16 = env_or("SCHEMAGATE_PORT", "3000")
            .parse()
            .map_err(|e| format!("Invalid SCHEMAGATE_PORT: {e}"))?;

        let default_schema = SchemaName::parse(&env_or("SCHEMAGATE_DEFAULT_SCHEMA", "public"))
            .map_err(|e| format!("Invalid SCHEMAGATE_DEFAULT_SCHEMA: {e}"))?;

        let bypass_prefixes =
            parse_prefixes(&env_or("SCHEMAGATE_BYPASS_PREFIXES", DEFAULT_BYPASS_PREFIXES))?;

        let max_connections: u32 = env_or("SCHEMAGATE_MAX_CONNECTIONS", "10")
            .parse()
            .map_err(|e| format!("Invalid SCHEMAGATE_MAX_CONNECTIONS: {e}"))?;

        let log_level = env_or("SCHEMAGATE_LOG_LEVEL", "info");

        let system_admin = match (
            std::env::var("SCHEMAGATE_SYSADMIN_USERNAME").ok(),
            std::env::var("SCHEMAGATE_SYSADMIN_EMAIL").ok(),
            std::env::var("SCHEMAGATE_SYSADMIN_PASSWORD").ok(),
        ) {
            (Some(username), Some(email), Some(password)) => Some(SystemAdminSeed {
                username,
                email,
                password,
            }),
            _ => None,
        };

        Ok(Config {
            database_url,
            jwt_secret,
            jwt_issuer,
            jwt_expiration_minutes,
            host,
            port,
            default_schema,
            bypass_prefixes,
            max_connections,
            log_level,
            system_admin,
        })
    }
}

/// Comma-separated list of absolute path prefixes.
pub fn parse_prefixes(raw: &str) -> Result<Vec<String>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            if s.starts_with('/') {
                Ok(s.to_string())
            } else {
                Err(format!("Invalid SCHEMAGATE_BYPASS_PREFIXES entry '{s}': must start with '/'"))
            }
        })
        .collect()
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
