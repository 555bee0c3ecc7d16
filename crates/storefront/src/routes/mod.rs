//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health             - Liveness check
//! GET  /health/ready       - Readiness check (verifies database)
//!
//! # Auth
//! POST /api/auth/login     - Login with {email} or {credential}
//! POST /api/auth/register  - Register with {name, email, image?}
//! GET  /api/auth/me        - Session introspection (cookie)
//! POST /api/auth/logout    - Clear the session cookie
//!
//! # Cart (cookie-authenticated)
//! GET    /api/cart         - List items with live product data
//! POST   /api/cart         - Add {productSlug, quantity}
//! DELETE /api/cart?id=<id> - Remove an item (ownership-checked)
//! ```

pub mod auth;
pub mod cart;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::middleware;
use crate::state::AppState;

/// Create the auth routes router.
///
/// The whole group sits behind the strict rate limiter.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/me", get(auth::me))
        .route("/logout", post(auth::logout))
        .layer(middleware::auth_rate_limiter())
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(cart::get_cart)
                .post(cart::add_item)
                .delete(cart::remove_item),
        )
        .layer(middleware::api_rate_limiter())
}

/// Build the application router over the given state.
///
/// Sentry layers are added by the binary on top of this router so tests can
/// drive it without a Sentry client.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api/auth", auth_routes())
        .nest("/api/cart", cart_routes())
        .layer(axum::middleware::from_fn(
            middleware::request_id_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity before returning OK.
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
