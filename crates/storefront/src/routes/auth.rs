//! Authentication route handlers.
//!
//! Handles login (email or Google credential), registration, session
//! introspection, and logout. Successful login and registration answer with
//! the same `{success, user, jwt}` shape and set the session cookie.

use std::time::Duration;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use rangoli_core::Email;

use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalUser, auth_cookie, clear_auth_cookie};
use crate::models::user::UserProfile;
use crate::state::AppState;

/// How long the best-effort cart bootstrap may hold up a login.
const CART_BOOTSTRAP_TIMEOUT: Duration = Duration::from_secs(8);

// =============================================================================
// Request Types
// =============================================================================

/// Login request body: exactly one of the two accepted shapes.
///
/// `{"email": ...}` logs in a registered user; `{"credential": ...}` carries
/// a Google ID token. Anything else is rejected at the boundary with a 400.
#[derive(Debug, Deserialize)]
#[serde(try_from = "LoginBody")]
pub enum LoginRequest {
    Email { email: String },
    Credential { credential: String },
}

/// Raw login body used to discriminate the two accepted shapes.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LoginBody {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    credential: Option<String>,
}

impl TryFrom<LoginBody> for LoginRequest {
    type Error = String;

    fn try_from(body: LoginBody) -> Result<Self, Self::Error> {
        match (body.email, body.credential) {
            (Some(email), None) => Ok(Self::Email { email }),
            (None, Some(credential)) => Ok(Self::Credential { credential }),
            _ => Err("expected exactly one of \"email\" or \"credential\"".to_string()),
        }
    }
}

/// Registration request body.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub image: Option<String>,
}

// =============================================================================
// Response Types
// =============================================================================

/// Response for successful login and registration.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub user: UserProfile,
    pub jwt: String,
}

/// Response for `GET /api/auth/me`.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub authenticated: bool,
    pub user: UserProfile,
}

// =============================================================================
// Handlers
// =============================================================================

/// `POST /api/auth/login`
///
/// Looks up the user (email variant) or decodes the Google credential and
/// auto-registers first-time users (credential variant), then issues the
/// session token. A cart is bootstrapped in the CMS best-effort; its failure
/// never fails the login.
#[instrument(skip(state, jar, body))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let Json(request) = body.map_err(|_| {
        AppError::BadRequest("expected {\"email\"} or {\"credential\"}".to_string())
    })?;

    let auth = state.auth();
    let (user, jwt) = match request {
        LoginRequest::Email { email } => auth.login_with_email(&email).await?,
        LoginRequest::Credential { credential } => auth.login_with_credential(&credential).await?,
    };

    bootstrap_cart(&state, &user.email).await;
    set_sentry_user(&user.id, Some(user.email.as_str()));

    let jar = jar.add(auth_cookie(jwt.clone(), state.config().cookie_secure()));
    Ok((
        jar,
        Json(AuthResponse {
            success: true,
            user: UserProfile::from(&user),
            jwt,
        }),
    ))
}

/// `POST /api/auth/register`
///
/// Creates the user and issues a session token identical in shape to login's.
/// A duplicate email answers 409.
#[instrument(skip(state, jar, body))]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let Json(request) = body
        .map_err(|_| AppError::BadRequest("name and email are required".to_string()))?;

    if request.name.trim().is_empty() {
        return Err(AppError::BadRequest("name is required".to_string()));
    }

    let (user, jwt) = state
        .auth()
        .register(&request.name, &request.email, request.image.as_deref())
        .await?;

    bootstrap_cart(&state, &user.email).await;
    set_sentry_user(&user.id, Some(user.email.as_str()));

    let jar = jar.add(auth_cookie(jwt.clone(), state.config().cookie_secure()));
    Ok((
        jar,
        Json(AuthResponse {
            success: true,
            user: UserProfile::from(&user),
            jwt,
        }),
    ))
}

/// `GET /api/auth/me`
///
/// Verifies the session cookie, resolves the user through the 5-minute cache,
/// and returns the sanitized projection. Uses the `{authenticated, ...}`
/// envelope rather than `{success, ...}`.
#[instrument(skip(state, session))]
pub async fn me(State(state): State<AppState>, OptionalUser(session): OptionalUser) -> Response {
    let Some(session) = session else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "authenticated": false,
                "error": "Not authenticated",
            })),
        )
            .into_response();
    };

    match state.auth().current_user(session.user_id).await {
        Ok(user) => Json(MeResponse {
            authenticated: true,
            user: UserProfile::from(user),
        })
        .into_response(),
        Err(err) => {
            let err = AppError::Auth(err);
            let status = err.status();
            (
                status,
                Json(json!({
                    "authenticated": false,
                    "error": err.client_message(),
                })),
            )
                .into_response()
        }
    }
}

/// `POST /api/auth/logout`
///
/// Best-effort cache invalidation, then clears the cookie unconditionally.
/// Always reports success.
#[instrument(skip(state, session, jar))]
pub async fn logout(
    State(state): State<AppState>,
    OptionalUser(session): OptionalUser,
    jar: CookieJar,
) -> (CookieJar, Json<serde_json::Value>) {
    if let Some(session) = session {
        state.auth().invalidate(session.user_id).await;
        state.carts().invalidate(&session.email).await;
    }
    clear_sentry_user();

    let jar = jar.add(clear_auth_cookie(state.config().cookie_secure()));
    (jar, Json(json!({"success": true})))
}

/// Ensure the user's CMS cart exists, bounded by the auth-layer timeout.
/// Failures are logged and swallowed - cart bootstrap never fails a login.
async fn bootstrap_cart(state: &AppState, email: &Email) {
    match tokio::time::timeout(CART_BOOTSTRAP_TIMEOUT, state.carts().ensure_cart(email)).await {
        Ok(Ok(_)) => {}
        Ok(Err(err)) => {
            tracing::warn!(error = %err, "Cart bootstrap failed during login");
        }
        Err(_) => {
            tracing::warn!("Cart bootstrap timed out during login");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_login_request_accepts_email_shape() {
        let parsed: LoginRequest = serde_json::from_str(r#"{"email": "a@b.c"}"#).unwrap();
        assert!(matches!(parsed, LoginRequest::Email { .. }));
    }

    #[test]
    fn test_login_request_accepts_credential_shape() {
        let parsed: LoginRequest = serde_json::from_str(r#"{"credential": "abc.def.ghi"}"#).unwrap();
        assert!(matches!(parsed, LoginRequest::Credential { .. }));
    }

    #[test]
    fn test_login_request_rejects_unknown_shapes() {
        assert!(serde_json::from_str::<LoginRequest>(r#"{"username": "a"}"#).is_err());
        assert!(serde_json::from_str::<LoginRequest>(r#""just-a-string""#).is_err());
        assert!(serde_json::from_str::<LoginRequest>(r"{}").is_err());
    }

    #[test]
    fn test_login_request_rejects_mixed_shape() {
        // Extra fields must not silently match a variant
        let result =
            serde_json::from_str::<LoginRequest>(r#"{"email": "a@b.c", "credential": "x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_register_request_image_is_optional() {
        let parsed: RegisterRequest =
            serde_json::from_str(r#"{"name": "Asha", "email": "a@b.c"}"#).unwrap();
        assert_eq!(parsed.image, None);
    }
}
