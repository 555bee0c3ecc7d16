//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers return `Result<T, AppError>`;
//! responses carry the `{"success": false, "error": "..."}` envelope the
//! storefront client expects.

use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::cart::CartError;
use crate::strapi::StrapiError;

/// Whether 500 responses may carry the internal error message.
///
/// Set once at startup from `APP_ENV=development`; elided everywhere else.
static EXPOSE_ERRORS: AtomicBool = AtomicBool::new(false);

/// Configure internal-error exposure (call once at startup).
pub fn set_expose_errors(expose: bool) {
    EXPOSE_ERRORS.store(expose, Ordering::Relaxed);
}

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// CMS operation failed.
    #[error("CMS error: {0}")]
    Strapi(#[from] StrapiError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error, per the taxonomy:
    /// 401 unauthenticated, 404 not found, 409 conflict, 400 validation,
    /// 503 upstream unavailable, 500 everything else.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Database(err) => repository_status(err),
            Self::Strapi(err) => strapi_status(err),
            Self::Auth(err) => match err {
                AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
                AuthError::UserNotFound => StatusCode::NOT_FOUND,
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::InvalidEmail(_) | AuthError::InvalidCredential(_) => {
                    StatusCode::BAD_REQUEST
                }
                AuthError::Repository(err) => repository_status(err),
                AuthError::TokenIssue => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Cart(err) => match err {
                CartError::InvalidQuantity => StatusCode::BAD_REQUEST,
                CartError::ProductNotFound(_)
                | CartError::ItemNotFound
                | CartError::UserNotFound => StatusCode::NOT_FOUND,
                CartError::Strapi(err) => strapi_status(err),
                CartError::Repository(err) => repository_status(err),
                CartError::CartMissing => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Internal details are elided outside
    /// development mode.
    #[must_use]
    pub fn client_message(&self) -> String {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR && !EXPOSE_ERRORS.load(Ordering::Relaxed) {
            return "Internal server error".to_string();
        }
        if status == StatusCode::SERVICE_UNAVAILABLE {
            return "Service temporarily unavailable".to_string();
        }

        match self {
            Self::Auth(AuthError::InvalidToken) => "Not authenticated".to_string(),
            Self::Auth(AuthError::UserNotFound) => "User not found".to_string(),
            Self::Auth(AuthError::UserAlreadyExists) => {
                "An account with this email already exists".to_string()
            }
            Self::Auth(AuthError::InvalidEmail(e)) => e.to_string(),
            Self::Auth(AuthError::InvalidCredential(_)) => "Invalid login credential".to_string(),
            Self::Cart(CartError::InvalidQuantity) => "Quantity must be at least 1".to_string(),
            Self::Cart(CartError::ProductNotFound(slug)) => format!("Product not found: {slug}"),
            Self::Cart(CartError::ItemNotFound) => "Cart item not found".to_string(),
            Self::Cart(CartError::UserNotFound) => "User not found".to_string(),
            Self::Unauthorized(_) => "Not authenticated".to_string(),
            Self::NotFound(what) => format!("Not found: {what}"),
            Self::BadRequest(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::Conflict(_) => StatusCode::CONFLICT,
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Database(_) | RepositoryError::Timeout(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        RepositoryError::DataCorruption(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn strapi_status(err: &StrapiError) -> StatusCode {
    match err {
        StrapiError::NotFound(_) => StatusCode::NOT_FOUND,
        StrapiError::Conflict(_) => StatusCode::CONFLICT,
        err if err.is_unavailable() => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.status().is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = json!({
            "success": false,
            "error": self.client_message(),
        });

        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
