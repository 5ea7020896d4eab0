//! Router tests that never reach the database
//!
//! The pool connects lazily, so every request here must be answered by
//! routing, authentication, role checks or input validation.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use bookaholic_server::{
    api,
    config::AppConfig,
    models::{
        enums::{AuthProvider, Role},
        user::{User, UserClaims},
    },
    repository::Repository,
    services::Services,
    AppState,
};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

fn app() -> (Router, AppConfig) {
    app_with(AppConfig::default())
}

fn app_with(config: AppConfig) -> (Router, AppConfig) {
    let pool = PgPoolOptions::new()
        .connect_lazy(&config.database.url)
        .expect("lazy pool");
    let services = Services::new(Repository::new(pool.clone()), &config).expect("services");

    let state = AppState {
        config: Arc::new(config.clone()),
        services: Arc::new(services),
        pool,
    };
    (api::router(state), config)
}

fn token(config: &AppConfig, role: Role) -> String {
    let user = User {
        id: 1,
        email: "someone@example.com".to_string(),
        full_name: "Some One".to_string(),
        password: None,
        role,
        auth_provider: AuthProvider::Local,
        is_verified: true,
        otp_code: None,
        otp_expiry: None,
        reset_password_token: None,
        reset_token_expiry: None,
        created_at: chrono::Utc::now(),
    };
    UserClaims::new(&user, 1)
        .create_token(&config.auth.jwt_secret)
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn request(method: Method, uri: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let (app, _) = app();
    let (status, body) = send(app, request(Method::GET, "/api/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let (app, _) = app();
    let (status, body) = send(app, request(Method::GET, "/api/borrow/my-history", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 2);
}

#[tokio::test]
async fn test_garbage_token_is_unauthorized() {
    let (app, _) = app();
    let (status, _) = send(app, request(Method::GET, "/api/auth/me", Some("not.a.jwt"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admins_cannot_borrow() {
    let (app, config) = app();
    let admin = token(&config, Role::Admin);
    let (status, _) = send(app, request(Method::POST, "/api/borrow/1", Some(&admin))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_members_cannot_use_admin_routes() {
    let member = {
        let (_, config) = app();
        token(&config, Role::User)
    };

    for (method, uri) in [
        (Method::GET, "/api/borrow/all"),
        (Method::GET, "/api/borrow/count"),
        (Method::PUT, "/api/borrow/admin/override/1?status=RETURNED"),
        (Method::GET, "/api/admin/users"),
        (Method::GET, "/api/admin/users/1/records"),
    ] {
        let (app, _) = app();
        let (status, _) = send(app, request(method, uri, Some(&member))).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{}", uri);
    }
}

#[tokio::test]
async fn test_invalid_page_size_rejected() {
    let (app, _) = app();
    let (status, body) = send(app, request(Method::GET, "/api/books?size=0", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 5);
}

#[tokio::test]
async fn test_page_index_overflow_rejected() {
    let (app, _) = app();
    let (status, body) = send(
        app,
        request(Method::GET, "/api/books?page=9223372036854775807&size=10", None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 5);
}

#[tokio::test]
async fn test_admin_registration_requires_code() {
    let (app, _) = app();
    let (status, _) = send(
        app,
        json_request(
            "/api/auth/register",
            json!({
                "firstname": "Eve",
                "lastname": "Admin",
                "email": "eve@example.com",
                "password": "secret123",
                "role": "ADMIN",
                "adminCode": "guess"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_registration_validates_input() {
    let (app, _) = app();
    let (status, _) = send(
        app,
        json_request(
            "/api/auth/register",
            json!({
                "firstname": "Eve",
                "lastname": "Reader",
                "email": "not-an-email",
                "password": "secret123"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_google_login_disabled_without_client_id() {
    let (app, _) = app();
    let (status, _) = send(app, json_request("/api/auth/google", json!({ "token": "x" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_openapi_document_served() {
    let (app, _) = app();
    let (status, body) = send(app, request(Method::GET, "/api-docs/openapi.json", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["info"]["title"], "Bookaholic API");
}

#[tokio::test]
async fn test_auth_routes_rate_limited_per_client() {
    let mut config = AppConfig::default();
    config.server.auth_rate_limit_per_second = Some(1);
    config.server.auth_rate_limit_burst = 1;
    let (app, _) = app_with(config);

    let from = |ip: &str| {
        Request::builder()
            .method(Method::GET)
            .uri("/api/auth/me")
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .unwrap()
    };

    let (status, _) = send(app.clone(), from("10.0.0.1")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(app.clone(), from("10.0.0.1")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    // Other clients and other route groups are unaffected
    let (status, _) = send(app.clone(), from("10.0.0.2")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(app, request(Method::GET, "/api/health", None)).await;
    assert_eq!(status, StatusCode::OK);
}
