//! Router-level tests for the JSON API surface.
//!
//! These drive the real router with `tower::ServiceExt::oneshot`. The
//! database pool is lazy and never connected - every path exercised here is
//! decided before a query would run.

#![allow(clippy::unwrap_used)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use secrecy::SecretString;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

use rangoli_core::{Email, UserId};
use rangoli_storefront::config::{StorefrontConfig, StrapiConfig};
use rangoli_storefront::middleware::AUTH_COOKIE_NAME;
use rangoli_storefront::routes;
use rangoli_storefront::services::auth::token;
use rangoli_storefront::state::AppState;

const TEST_SECRET: &str = "k9#mQ2$vX7!pL4@wZ8&nR3*jT6^hB1%d";

fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://127.0.0.1:1/rangoli_test"),
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        base_url: "http://localhost:3000".to_string(),
        auth_secret: SecretString::from(TEST_SECRET),
        strapi: StrapiConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            api_token: SecretString::from("test-token"),
        },
        google_client_id: None,
        expose_errors: false,
        sentry_dsn: None,
    }
}

fn app() -> Router {
    let config = test_config();
    // Lazy pool: parses the URL, never connects
    let pool = PgPoolOptions::new()
        .connect_lazy("postgres://127.0.0.1:1/rangoli_test")
        .unwrap();
    routes::router(AppState::new(config, pool))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn session_cookie() -> String {
    let email = Email::parse("user@example.com").unwrap();
    let jwt = token::issue(
        &SecretString::from(TEST_SECRET),
        UserId::new(1),
        &email,
    )
    .unwrap();
    format!("{AUTH_COOKIE_NAME}={jwt}")
}

#[tokio::test]
async fn health_answers_ok() {
    let response = app()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unauthenticated_cart_get_returns_empty_cart_envelope() {
    let response = app()
        .oneshot(Request::get("/api/cart").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["cart"], serde_json::json!([]));
    assert_eq!(json["error"], "Not authenticated");
}

#[tokio::test]
async fn unauthenticated_cart_post_is_rejected() {
    let response = app()
        .oneshot(
            Request::post("/api/cart")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"productSlug": "diya-set", "quantity": 2}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Not authenticated");
}

#[tokio::test]
async fn cart_rejects_garbage_cookie() {
    let response = app()
        .oneshot(
            Request::get("/api/cart")
                .header(header::COOKIE, format!("{AUTH_COOKIE_NAME}=not-a-jwt"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_without_cookie_uses_authenticated_envelope() {
    let response = app()
        .oneshot(Request::get("/api/auth/me").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["authenticated"], false);
    assert_eq!(json["error"], "Not authenticated");
}

#[tokio::test]
async fn login_rejects_unrecognized_shapes() {
    for body in [
        r#"{"username": "someone"}"#,
        r#"{"email": "a@b.c", "credential": "xyz"}"#,
        r"{}",
        r#"{"email": "a@b.c", "extra": true}"#,
    ] {
        let response = app()
            .oneshot(
                Request::post("/api/auth/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "body {body} must be rejected at the boundary"
        );
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
    }
}

#[tokio::test]
async fn register_requires_name() {
    let response = app()
        .oneshot(
            Request::post("/api/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"name": "  ", "email": "a@b.c"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn logout_always_succeeds_and_clears_cookie() {
    let response = app()
        .oneshot(
            Request::post("/api/auth/logout")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(set_cookie.starts_with(&format!("{AUTH_COOKIE_NAME}=")));
    assert!(set_cookie.contains("Max-Age=0"));
    assert!(set_cookie.contains("HttpOnly"));

    let json = body_json(response).await;
    assert_eq!(json["success"], true);
}

#[tokio::test]
async fn logout_with_valid_session_still_succeeds() {
    let response = app()
        .oneshot(
            Request::post("/api/auth/logout")
                .header(header::COOKIE, session_cookie())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
}

#[tokio::test]
async fn cart_delete_requires_id_parameter() {
    let response = app()
        .oneshot(
            Request::delete("/api/cart")
                .header(header::COOKIE, session_cookie())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn request_id_header_is_echoed() {
    let response = app()
        .oneshot(
            Request::get("/health")
                .header("x-request-id", "req-abc-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "req-abc-123"
    );
}
