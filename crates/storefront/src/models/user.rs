//! User domain types.
//!
//! These types represent validated domain objects separate from database row
//! types and from the JSON projections the API returns.

use chrono::{DateTime, Utc};
use serde::Serialize;

use rangoli_core::{Email, UserId};

/// A storefront user (domain type).
///
/// Separate from CMS cart records - this is the authentication identity owned
/// by the relational store.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// User's email address (stored normalized).
    pub email: Email,
    /// Optional avatar URL.
    pub image: Option<String>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Sanitized user projection returned by the API.
///
/// Never carries timestamps or any internal columns.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub image: Option<String>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            image: user.image.clone(),
        }
    }
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            image: user.image,
        }
    }
}
