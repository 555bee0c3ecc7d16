//! Database operations for storefront `PostgreSQL`.
//!
//! # Database: `rangoli_storefront`
//!
//! Stores local data only (the CMS is source of truth for catalog and carts):
//!
//! ## Tables
//!
//! - `users` - Site authentication identities (name, unique email, image)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p rangoli-cli -- migrate storefront
//! ```

pub mod users;

use std::future::Future;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use users::UserRepository;

/// Maximum attempts for a retryable database operation.
const MAX_ATTEMPTS: u32 = 2;

/// Per-operation timeout applied around each attempt.
const OPERATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Initial backoff between attempts (doubles after each retry).
const INITIAL_BACKOFF: Duration = Duration::from_millis(150);

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// Operation exceeded its timeout.
    #[error("operation timed out: {0}")]
    Timeout(String),
}

impl RepositoryError {
    /// Whether the error is worth retrying.
    ///
    /// Connection-level failures are transient; constraint violations,
    /// missing rows, and corrupt data are terminal and re-thrown immediately.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Database(err) => matches!(
                err,
                sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed
            ),
            Self::Timeout(_) => true,
            Self::DataCorruption(_) | Self::NotFound | Self::Conflict(_) => false,
        }
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Run a database operation with bounded retry.
///
/// Each attempt is wrapped in a per-operation timeout. Transient failures
/// (connection loss, pool exhaustion, attempt timeout) are retried once with
/// backoff; terminal errors propagate unchanged so callers can map conflicts
/// and missing rows precisely.
///
/// # Errors
///
/// Returns the last error once attempts are exhausted.
pub async fn with_retry<T, F, Fut>(operation: &str, mut run: F) -> Result<T, RepositoryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RepositoryError>>,
{
    let mut backoff = INITIAL_BACKOFF;
    let mut attempt = 1;

    loop {
        let result = match tokio::time::timeout(OPERATION_TIMEOUT, run()).await {
            Ok(result) => result,
            Err(_) => Err(RepositoryError::Timeout(operation.to_string())),
        };

        match result {
            Ok(value) => return Ok(value),
            Err(err) if attempt < MAX_ATTEMPTS && err.is_transient() => {
                tracing::warn!(
                    operation,
                    attempt,
                    error = %err,
                    "retrying database operation"
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test]
    async fn test_with_retry_returns_first_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result = with_retry("test", move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, RepositoryError>(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_with_retry_retries_transient_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result = with_retry("test", move || {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(RepositoryError::Timeout("test".to_string()))
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_with_retry_does_not_retry_terminal_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<u32, _> = with_retry("test", move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(RepositoryError::Conflict("email already exists".to_string()))
            }
        })
        .await;

        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_with_retry_exhausts_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<u32, _> = with_retry("test", move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(RepositoryError::Timeout("test".to_string()))
            }
        })
        .await;

        assert!(matches!(result, Err(RepositoryError::Timeout(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_conflict_is_terminal() {
        assert!(!RepositoryError::Conflict("dup".to_string()).is_transient());
        assert!(!RepositoryError::NotFound.is_transient());
        assert!(RepositoryError::Timeout("op".to_string()).is_transient());
    }
}
