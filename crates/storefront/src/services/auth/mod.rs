//! Authentication service.
//!
//! Issues and verifies stateless session tokens and owns the short-lived
//! user-record cache that `me` reads through. Database calls go through the
//! shared bounded-retry helper; token verification failures are terminal and
//! never retried.

mod error;
pub mod google;
pub mod token;

pub use error::AuthError;
pub use google::GoogleProfile;
pub use token::{Claims, TOKEN_TTL_SECONDS};

use moka::future::Cache;
use secrecy::SecretString;
use sqlx::PgPool;
use tracing::instrument;

use rangoli_core::{Email, UserId};

use crate::db::users::UserRepository;
use crate::db::{RepositoryError, with_retry};
use crate::models::user::User;

/// User cache TTL in seconds (5 minutes).
pub const USER_CACHE_TTL_SECONDS: u64 = 5 * 60;

/// Create the user cache shared by all `AuthService` instances.
#[must_use]
pub fn user_cache() -> Cache<UserId, User> {
    Cache::builder()
        .max_capacity(10_000)
        .time_to_live(std::time::Duration::from_secs(USER_CACHE_TTL_SECONDS))
        .build()
}

/// Authentication service.
///
/// Constructed per request from borrowed application state.
pub struct AuthService<'a> {
    pool: &'a PgPool,
    cache: &'a Cache<UserId, User>,
    secret: &'a SecretString,
    google_client_id: Option<&'a str>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(
        pool: &'a PgPool,
        cache: &'a Cache<UserId, User>,
        secret: &'a SecretString,
        google_client_id: Option<&'a str>,
    ) -> Self {
        Self {
            pool,
            cache,
            secret,
            google_client_id,
        }
    }

    // =========================================================================
    // Login and Registration
    // =========================================================================

    /// Login with an email address.
    ///
    /// The input is normalized before lookup, so casing and whitespace never
    /// produce a spurious miss.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if no user has this email.
    #[instrument(skip(self, raw_email))]
    pub async fn login_with_email(&self, raw_email: &str) -> Result<(User, String), AuthError> {
        let email = Email::parse(raw_email)?;

        let pool = self.pool;
        let user = with_retry("users.get_by_email", move || {
            let email = email.clone();
            async move { UserRepository::new(pool).get_by_email(&email).await }
        })
        .await?
        .ok_or(AuthError::UserNotFound)?;

        let jwt = token::issue(self.secret, user.id, &user.email)?;
        Ok((user, jwt))
    }

    /// Login with a Google Identity Services credential.
    ///
    /// First-time credential logins register the user automatically; later
    /// logins behave exactly like the email variant.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredential` if the credential is malformed
    /// or fails the audience check.
    #[instrument(skip(self, credential))]
    pub async fn login_with_credential(&self, credential: &str) -> Result<(User, String), AuthError> {
        let profile = google::decode_credential(credential, self.google_client_id)?;
        let email = Email::parse(&profile.email)?;

        let pool = self.pool;
        let lookup_email = email.clone();
        let existing = with_retry("users.get_by_email", move || {
            let email = lookup_email.clone();
            async move { UserRepository::new(pool).get_by_email(&email).await }
        })
        .await?;

        let user = match existing {
            Some(user) => user,
            None => {
                let name = profile.name.clone().unwrap_or_else(|| email.local_part().to_string());
                self.create_user(&name, &email, profile.picture.as_deref())
                    .await?
            }
        };

        let jwt = token::issue(self.secret, user.id, &user.email)?;
        Ok((user, jwt))
    }

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip(self, raw_email, image))]
    pub async fn register(
        &self,
        name: &str,
        raw_email: &str,
        image: Option<&str>,
    ) -> Result<(User, String), AuthError> {
        let email = Email::parse(raw_email)?;
        let user = self.create_user(name, &email, image).await?;
        let jwt = token::issue(self.secret, user.id, &user.email)?;
        Ok((user, jwt))
    }

    async fn create_user(
        &self,
        name: &str,
        email: &Email,
        image: Option<&str>,
    ) -> Result<User, AuthError> {
        let pool = self.pool;
        let name = name.trim().to_string();
        let email = email.clone();
        let image = image.map(str::to_string);

        with_retry("users.create", move || {
            let name = name.clone();
            let email = email.clone();
            let image = image.clone();
            async move {
                UserRepository::new(pool)
                    .create(&name, &email, image.as_deref())
                    .await
            }
        })
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
            other => AuthError::Repository(other),
        })
    }

    // =========================================================================
    // Session Resolution
    // =========================================================================

    /// Verify a session token. Terminal on failure (401, no retry).
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the token is missing its
    /// signature, expired, or malformed.
    pub fn verify_token(&self, jwt: &str) -> Result<Claims, AuthError> {
        token::verify(self.secret, jwt)
    }

    /// Resolve the current user through the 5-minute cache.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user record has disappeared
    /// since the token was issued.
    #[instrument(skip(self))]
    pub async fn current_user(&self, user_id: UserId) -> Result<User, AuthError> {
        if let Some(user) = self.cache.get(&user_id).await {
            return Ok(user);
        }

        let pool = self.pool;
        let user = with_retry("users.get_by_id", move || async move {
            UserRepository::new(pool).get_by_id(user_id).await
        })
        .await?
        .ok_or(AuthError::UserNotFound)?;

        self.cache.insert(user_id, user.clone()).await;
        Ok(user)
    }

    /// Drop the cached record for a user (logout, best effort).
    pub async fn invalidate(&self, user_id: UserId) {
        self.cache.invalidate(&user_id).await;
    }
}
