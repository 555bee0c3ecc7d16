//! Authentication middleware and extractors.
//!
//! Sessions are stateless JWTs carried in the `auth-token` cookie. The
//! extractors verify the token against the configured signing secret and
//! expose the claims; handlers that need the full user record go through
//! `AuthService::current_user`.

use axum::{
    Json,
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::json;

use rangoli_core::{Email, UserId};

use crate::services::auth::{TOKEN_TTL_SECONDS, token};
use crate::state::AppState;

/// Session cookie name.
pub const AUTH_COOKIE_NAME: &str = "auth-token";

/// The authenticated identity carried by a verified session token.
#[derive(Debug, Clone)]
pub struct AuthSession {
    /// User id from the token's `sub` claim.
    pub user_id: UserId,
    /// Email captured at issuance time.
    pub email: Email,
}

/// Extractor that requires a valid session cookie.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     CurrentUser(session): CurrentUser,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", session.email)
/// }
/// ```
pub struct CurrentUser(pub AuthSession);

/// Rejection for unauthenticated requests: 401 with the standard envelope.
pub struct AuthRejection;

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "success": false,
                "error": "Not authenticated",
            })),
        )
            .into_response()
    }
}

fn session_from_parts(parts: &Parts, state: &AppState) -> Option<AuthSession> {
    let jar = CookieJar::from_headers(&parts.headers);
    let token_value = jar.get(AUTH_COOKIE_NAME)?.value().to_string();

    let claims = token::verify(&state.config().auth_secret, &token_value).ok()?;
    let email = Email::parse(&claims.email).ok()?;

    Some(AuthSession {
        user_id: claims.user_id(),
        email,
    })
}

impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        session_from_parts(parts, &state)
            .map(Self)
            .ok_or(AuthRejection)
    }
}

/// Extractor that optionally resolves the session.
///
/// Unlike `CurrentUser`, this does not reject unauthenticated requests;
/// handlers that need a custom 401 body (the cart listing, `me`) build it
/// themselves.
pub struct OptionalUser(pub Option<AuthSession>);

impl<S> FromRequestParts<S> for OptionalUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        Ok(Self(session_from_parts(parts, &state)))
    }
}

// =============================================================================
// Cookie Construction
// =============================================================================

/// Build the session cookie: HTTP-only, `SameSite=Lax`, 7-day max-age,
/// `Secure` when the site is served over https.
#[must_use]
pub fn auth_cookie(token: String, secure: bool) -> Cookie<'static> {
    let mut cookie = Cookie::new(AUTH_COOKIE_NAME, token);
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_path("/");
    cookie.set_max_age(time::Duration::seconds(TOKEN_TTL_SECONDS));
    cookie.set_secure(secure);
    cookie
}

/// Build the expired cookie that clears the session unconditionally.
#[must_use]
pub fn clear_auth_cookie(secure: bool) -> Cookie<'static> {
    let mut cookie = Cookie::new(AUTH_COOKIE_NAME, "");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_path("/");
    cookie.set_max_age(time::Duration::ZERO);
    cookie.set_secure(secure);
    cookie
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_cookie_attributes() {
        let cookie = auth_cookie("tok".to_string(), true);
        assert_eq!(cookie.name(), AUTH_COOKIE_NAME);
        assert_eq!(cookie.value(), "tok");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(
            cookie.max_age(),
            Some(time::Duration::seconds(TOKEN_TTL_SECONDS))
        );
    }

    #[test]
    fn test_clear_cookie_expires_immediately() {
        let cookie = clear_auth_cookie(false);
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
    }
}
