//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] rangoli_core::EmailError),

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Session token missing, malformed, expired, or badly signed.
    /// Terminal - never retried.
    #[error("invalid session token")]
    InvalidToken,

    /// Session token could not be issued.
    #[error("failed to issue session token")]
    TokenIssue,

    /// Google credential was malformed or failed the audience check.
    #[error("invalid login credential: {0}")]
    InvalidCredential(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
