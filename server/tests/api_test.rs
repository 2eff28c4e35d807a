//! Router-level tests.
//!
//! Build the full axum router against a lazy (never-connected) pool and
//! exercise the routes that do not touch the database: the health check and
//! the auth gate on protected surfaces.
//!
//! Run with: `cargo test --test api_test`

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use at_server::api::{create_router, AppState};
use at_server::config::Config;
use at_server::db::create_lazy_pool;

fn test_app() -> axum::Router {
    let config = Config::default_for_test();
    let pool = create_lazy_pool(&config.database_url).unwrap();
    create_router(AppState::new(pool, config))
}

#[tokio::test]
async fn test_health_check_reports_ok() {
    let app = test_app();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["editor_sessions"], 0);
}

#[tokio::test]
async fn test_protected_routes_require_auth_header() {
    let app = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/courses")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "MISSING_AUTH");
}

#[tokio::test]
async fn test_garbage_bearer_token_is_rejected() {
    let app = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/admin/status")
                .header("Authorization", "Bearer not-a-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_auth_header_is_rejected() {
    let app = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/me/subscription")
                .header("Authorization", "Basic dXNlcjpwYXNz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "INVALID_AUTH_HEADER");
}
