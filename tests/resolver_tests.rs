use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode, header};
use axum::routing::get;
use tower::ServiceExt;

use schemagate::auth::jwt::{Claims, JwtTokens, encode_token};
use schemagate::models::User;
use schemagate::tenant::resolver::resolve_tenant;
use schemagate::tenant::{SchemaName, TenantContext, TenantDirectory, TenantResolver};

const SECRET: &str = "resolver-test-secret";
const ISSUER: &str = "schemagate-test";

fn schema(name: &str) -> SchemaName {
    SchemaName::parse(name).unwrap()
}

/// In-memory directory: username to tenant schema, `None` for users
/// without a tenant. Lookups for `broken` fail.
struct FakeDirectory(HashMap<&'static str, Option<&'static str>>);

#[async_trait]
impl TenantDirectory for FakeDirectory {
    async fn schema_for_user(&self, username: &str) -> Result<Option<SchemaName>, sqlx::Error> {
        if username == "broken" {
            return Err(sqlx::Error::PoolTimedOut);
        }
        Ok(self.0.get(username).copied().flatten().map(schema))
    }
}

fn tokens() -> JwtTokens {
    JwtTokens::new(SECRET, ISSUER, 15)
}

fn user(username: &str) -> User {
    User {
        id: 1,
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password_hash: String::new(),
        full_name: None,
        phone_number: None,
        tenant_id: None,
        system_admin: false,
        created_at: chrono::Utc::now(),
    }
}

fn token_for(username: &str) -> String {
    tokens().issue(&user(username), None).unwrap()
}

fn resolver() -> TenantResolver {
    let directory = FakeDirectory(HashMap::from([
        ("alice", Some("acme")),
        ("bob", Some("beta")),
        ("platform", None),
    ]));
    TenantResolver::new(
        TenantContext::new(schema("public")),
        vec!["/api/auth".to_string(), "/api/public".to_string()],
        Arc::new(tokens()),
        Arc::new(directory),
    )
}

// ── Resolution ──────────────────────────────────────────────────

#[tokio::test]
async fn valid_token_resolves_to_the_users_tenant() {
    let resolver = resolver();

    let alice = token_for("alice");
    assert_eq!(resolver.resolve("/api/workspace", Some(&alice)).await, schema("acme"));

    let bob = token_for("bob");
    assert_eq!(resolver.resolve("/api/workspace", Some(&bob)).await, schema("beta"));
}

#[tokio::test]
async fn bypassed_paths_ignore_the_token() {
    let resolver = resolver();
    let alice = token_for("alice");

    assert!(resolver.is_bypassed("/api/auth/signin"));
    assert!(resolver.is_bypassed("/api/public/info"));
    assert!(!resolver.is_bypassed("/api/tenants"));

    assert_eq!(
        resolver.resolve("/api/auth/signin", Some(&alice)).await,
        schema("public")
    );
    assert_eq!(
        resolver.resolve("/api/public/info", Some(&alice)).await,
        schema("public")
    );
}

#[tokio::test]
async fn unusable_tokens_fall_back_to_default() {
    let resolver = resolver();
    let public = schema("public");

    assert_eq!(resolver.resolve("/api/workspace", None).await, public);
    assert_eq!(resolver.resolve("/api/workspace", Some("garbage")).await, public);
    assert_eq!(resolver.resolve("/api/workspace", Some("")).await, public);

    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: "alice".to_string(),
        iss: ISSUER.to_string(),
        iat: now - 7200,
        exp: now - 3600,
        uid: 1,
        email: "alice@example.com".to_string(),
        sys: false,
        tenant: Some("acme".to_string()),
    };
    let expired = encode_token(&claims, SECRET).unwrap();
    assert_eq!(resolver.resolve("/api/workspace", Some(&expired)).await, public);

    let fresh = Claims {
        iat: now,
        exp: now + 600,
        ..claims
    };
    let forged = encode_token(&fresh, "some-other-secret").unwrap();
    assert_eq!(resolver.resolve("/api/workspace", Some(&forged)).await, public);

    let foreign = encode_token(
        &Claims {
            iss: "someone-else".to_string(),
            ..fresh
        },
        SECRET,
    )
    .unwrap();
    assert_eq!(resolver.resolve("/api/workspace", Some(&foreign)).await, public);
}

#[tokio::test]
async fn users_without_a_tenant_fall_back_to_default() {
    let resolver = resolver();
    let public = schema("public");

    let platform = token_for("platform");
    assert_eq!(resolver.resolve("/api/workspace", Some(&platform)).await, public);

    let ghost = token_for("ghost");
    assert_eq!(resolver.resolve("/api/workspace", Some(&ghost)).await, public);

    let broken = token_for("broken");
    assert_eq!(resolver.resolve("/api/workspace", Some(&broken)).await, public);
}

// ── Middleware ──────────────────────────────────────────────────

async fn echo_schema(State(resolver): State<TenantResolver>) -> String {
    resolver.context().current().to_string()
}

async fn failing_handler(State(resolver): State<TenantResolver>) -> (StatusCode, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        resolver.context().current().to_string(),
    )
}

fn app(resolver: TenantResolver) -> Router {
    Router::new()
        .route("/api/workspace", get(echo_schema))
        .route("/api/auth/whoami", get(echo_schema))
        .route("/api/fail", get(failing_handler))
        .layer(axum::middleware::from_fn_with_state(
            resolver.clone(),
            resolve_tenant,
        ))
        .with_state(resolver)
}

async fn call(app: Router, path: &str, token: Option<&str>) -> (StatusCode, String) {
    let authorization = token.map(|token| format!("Bearer {token}"));
    call_with_authorization(app, path, authorization.as_deref()).await
}

async fn call_with_authorization(
    app: Router,
    path: &str,
    authorization: Option<&str>,
) -> (StatusCode, String) {
    let mut req = Request::builder().uri(path);
    if let Some(value) = authorization {
        req = req.header(header::AUTHORIZATION, value);
    }
    let resp = app.oneshot(req.body(Body::empty()).unwrap()).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn middleware_binds_the_request_and_clears_afterwards() {
    let resolver = resolver();
    let alice = token_for("alice");

    let (status, body) = call(app(resolver.clone()), "/api/workspace", Some(&alice)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "acme");
    assert_eq!(resolver.context().bound(), None);

    let (_, body) = call(app(resolver.clone()), "/api/workspace", None).await;
    assert_eq!(body, "public");

    let (_, body) = call(app(resolver.clone()), "/api/auth/whoami", Some(&alice)).await;
    assert_eq!(body, "public");

    let (_, body) = call(
        app(resolver.clone()),
        "/api/workspace",
        Some(&format!("{alice}x")),
    )
    .await;
    assert_eq!(body, "public");
}

#[tokio::test]
async fn failing_handler_still_leaves_no_binding() {
    let resolver = resolver();
    let bob = token_for("bob");

    let (status, body) = call(app(resolver.clone()), "/api/fail", Some(&bob)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "beta");
    assert_eq!(resolver.context().current(), schema("public"));
}

#[tokio::test]
async fn back_to_back_requests_do_not_leak_bindings() {
    let resolver = resolver();
    let alice = token_for("alice");
    let bob = token_for("bob");

    let sequence = [
        (Some(alice.as_str()), "acme"),
        (None, "public"),
        (Some(bob.as_str()), "beta"),
        (Some("garbage"), "public"),
        (Some(alice.as_str()), "acme"),
    ];
    for (token, expected) in sequence {
        let (_, body) = call(app(resolver.clone()), "/api/workspace", token).await;
        assert_eq!(body, expected);
    }
}

#[tokio::test]
async fn bearer_scheme_is_case_insensitive() {
    let resolver = resolver();
    let alice = token_for("alice");

    for scheme in ["Bearer", "bearer", "BEARER"] {
        let value = format!("{scheme} {alice}");
        let (status, body) =
            call_with_authorization(app(resolver.clone()), "/api/workspace", Some(&value)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "acme", "scheme {scheme}");
    }

    for value in ["Basic YWxpY2U6c2VjcmV0", "Bearer", "alice"] {
        let (_, body) =
            call_with_authorization(app(resolver.clone()), "/api/workspace", Some(value)).await;
        assert_eq!(body, "public", "header {value}");
    }
}
