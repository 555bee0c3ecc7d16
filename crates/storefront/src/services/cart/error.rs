//! Cart service error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::strapi::StrapiError;

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Quantity must be at least 1.
    #[error("quantity must be at least 1")]
    InvalidQuantity,

    /// No product with the requested slug.
    #[error("product not found: {0}")]
    ProductNotFound(String),

    /// No cart item with the requested id in the caller's cart.
    ///
    /// Also covers items that exist but belong to another user's cart -
    /// the two cases are indistinguishable to the caller.
    #[error("cart item not found")]
    ItemNotFound,

    /// User record backing the session could not be resolved.
    #[error("user not found")]
    UserNotFound,

    /// Cart vanished between a create conflict and the follow-up fetch.
    #[error("cart could not be resolved")]
    CartMissing,

    /// CMS error.
    #[error("CMS error: {0}")]
    Strapi(#[from] StrapiError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
