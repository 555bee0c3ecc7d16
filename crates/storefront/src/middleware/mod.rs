//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Rate limiting (governor, auth routes only)
//!
//! Authentication is handled per-route via extractors rather than a layer:
//! the session is a stateless cookie, so there is no store to consult.

pub mod auth;
pub mod rate_limit;
pub mod request_id;

pub use auth::{
    AUTH_COOKIE_NAME, AuthSession, CurrentUser, OptionalUser, auth_cookie, clear_auth_cookie,
};
pub use rate_limit::{api_rate_limiter, auth_rate_limiter};
pub use request_id::request_id_middleware;
