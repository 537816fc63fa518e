#![allow(dead_code)]

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use schemagate::config::{Config, DEFAULT_BYPASS_PREFIXES, SystemAdminSeed, parse_prefixes};
use schemagate::db::ConnectionProvider;
use schemagate::state::SharedState;
use schemagate::tenant::{SchemaName, SchemaProvisioner, TenantContext};

pub const SYSADMIN_USERNAME: &str = "sysadmin";
pub const SYSADMIN_PASSWORD: &str = "sysadmin123";

/// A running test server instance with a dedicated test database.
pub struct TestApp {
    pub addr: std::net::SocketAddr,
    pub pool: PgPool,
    pub state: SharedState,
    pub config: Config,
    pub client: Client,
    pub db_name: String,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn default_schema(&self) -> SchemaName {
        self.config.default_schema.clone()
    }

    /// A provider over a separate pool, for tests that need to control which
    /// physical connection gets reused.
    pub async fn dedicated_provider(&self, max_connections: u32) -> ConnectionProvider {
        let config = Config {
            max_connections,
            ..self.config.clone()
        };
        let pool = schemagate::db::connect(&config)
            .await
            .expect("Failed to open dedicated pool");
        ConnectionProvider::new(pool, TenantContext::new(self.default_schema()))
    }

    pub fn provisioner(&self) -> SchemaProvisioner {
        SchemaProvisioner::new(ConnectionProvider::new(
            self.pool.clone(),
            TenantContext::new(self.default_schema()),
        ))
    }

    /// Onboard a tenant through the public signup endpoint.
    pub async fn signup(&self, name: &str, schema: &str, admin: &str) -> (Value, StatusCode) {
        let body = json!({
            "name": name,
            "description": format!("{name} test tenant"),
            "schema": schema,
            "admin_username": admin,
            "admin_email": format!("{admin}@example.com"),
            "admin_password": "password123",
            "admin_full_name": format!("{name} Admin"),
        });
        let resp = self
            .client
            .post(self.url("/api/auth/tenant-signup"))
            .json(&body)
            .send()
            .await
            .expect("signup request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn signin(&self, username: &str, password: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url("/api/auth/signin"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("signin request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Sign in and return the access token.
    pub async fn token(&self, username: &str, password: &str) -> String {
        let (body, status) = self.signin(username, password).await;
        assert_eq!(status, StatusCode::OK, "signin failed: {body}");
        body["access_token"].as_str().unwrap().to_string()
    }

    /// Onboard a tenant and return its admin's access token.
    pub async fn onboard(&self, name: &str, schema: &str, admin: &str) -> String {
        let (body, status) = self.signup(name, schema, admin).await;
        assert_eq!(status, StatusCode::OK, "signup failed: {body}");
        self.token(admin, "password123").await
    }

    pub async fn sysadmin_token(&self) -> String {
        self.token(SYSADMIN_USERNAME, SYSADMIN_PASSWORD).await
    }

    pub async fn get_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("get request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn post_auth(&self, path: &str, token: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("post request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn put_auth(&self, path: &str, token: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .put(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("put request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn schema_exists(&self, schema: &str) -> bool {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM pg_namespace WHERE nspname = $1)")
            .bind(schema)
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    pub async fn tables_in(&self, schema: &str) -> Vec<String> {
        sqlx::query_scalar(
            "SELECT table_name::text FROM information_schema.tables
             WHERE table_schema = $1 ORDER BY table_name",
        )
        .bind(schema)
        .fetch_all(&self.pool)
        .await
        .unwrap()
    }
}

fn admin_url(base_url: &str) -> String {
    base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.to_string())
}

/// Spawn a test app with a fresh temporary database.
pub async fn spawn_app() -> TestApp {
    let _ = dotenvy::dotenv();

    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    let db_name = format!("schemagate_test_{}", Uuid::now_v7().simple());

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url(&base_url))
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    admin_pool.close().await;

    let test_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| base_url.clone());

    let config = Config {
        database_url: test_url,
        jwt_secret: "test-jwt-secret-that-is-long-enough".to_string(),
        jwt_issuer: "schemagate-test".to_string(),
        jwt_expiration_minutes: 15,
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        default_schema: SchemaName::parse("public").unwrap(),
        bypass_prefixes: parse_prefixes(DEFAULT_BYPASS_PREFIXES).unwrap(),
        max_connections: 5,
        log_level: "warn".to_string(),
        system_admin: Some(SystemAdminSeed {
            username: SYSADMIN_USERNAME.to_string(),
            email: "sysadmin@example.com".to_string(),
            password: SYSADMIN_PASSWORD.to_string(),
        }),
    };

    let pool = schemagate::db::connect(&config)
        .await
        .expect("Failed to connect to test database");

    schemagate::bootstrap::prepare_database(&pool, &config)
        .await
        .expect("Failed to prepare test database");

    let state = schemagate::build_state(pool.clone(), config.clone());
    let app = schemagate::router(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    TestApp {
        addr,
        pool,
        state,
        config,
        client: Client::new(),
        db_name,
    }
}

/// Drop the test database after tests complete.
pub async fn cleanup(app: TestApp) {
    let db_name = app.db_name.clone();
    app.pool.close().await;
    drop(app.state);

    let base_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url(&base_url))
        .await
        .expect("Failed to connect for cleanup");

    let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS \"{db_name}\" WITH (FORCE)"))
        .execute(&admin_pool)
        .await;

    admin_pool.close().await;
}
