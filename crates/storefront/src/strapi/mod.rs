//! Strapi CMS REST client.
//!
//! # Architecture
//!
//! - Strapi is source of truth for catalog and cart persistence - NO local
//!   sync, direct REST calls against the v4 `{"data", "attributes"}` envelope
//! - Bearer token auth on every request
//! - In-memory caching via `moka` for product lookups (60 second TTL);
//!   cart reads are cached one level up, in the cart service, where the
//!   stale-on-error policy lives
//!
//! # Example
//!
//! ```rust,ignore
//! use rangoli_storefront::strapi::StrapiClient;
//!
//! let client = StrapiClient::new(&config.strapi);
//!
//! // Look up a product
//! let product = client.find_product("diya-set").await?;
//!
//! // Find the cart for a user
//! let cart = client.find_cart("user@example.com").await?;
//! ```

mod conversions;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};

use rangoli_core::CartItemId;
use rust_decimal::Decimal;

use crate::config::StrapiConfig;
use crate::models::cart::{Cart, CartItem, Product};

use conversions::{convert_cart, convert_cart_item, convert_product, item_owner_email};
use types::{
    CartAttributes, CartConnect, CartItemAttributes, CartItemPatch, ConnectByEmail, Data,
    ErrorResponse, ListResponse, NewCart, NewCartItem, ProductAttributes, SingleResponse,
};

/// Default timeout applied to every CMS request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Product cache TTL (the catalog revalidation window).
const PRODUCT_CACHE_TTL: Duration = Duration::from_secs(60);

/// Errors that can occur when talking to the CMS.
#[derive(Debug, Error)]
pub enum StrapiError {
    /// HTTP transport error (includes connect failures and timeouts).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status from the CMS.
    #[error("CMS returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique constraint violation (e.g., duplicate cart for a user).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Rate limited by the CMS.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Response body did not match the expected envelope.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl StrapiError {
    /// Whether the error indicates the CMS is unreachable (vs. a rejected
    /// request), for the 503-vs-500 split at the API boundary.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        match self {
            Self::Http(err) => err.is_connect() || err.is_timeout(),
            Self::RateLimited(_) => true,
            _ => false,
        }
    }
}

/// Client for the Strapi CMS REST API.
///
/// Cheaply cloneable; product lookups are cached for 60 seconds.
#[derive(Clone)]
pub struct StrapiClient {
    inner: Arc<StrapiClientInner>,
}

struct StrapiClientInner {
    client: reqwest::Client,
    base_url: String,
    api_token: String,
    product_cache: Cache<String, Product>,
}

impl StrapiClient {
    /// Create a new CMS client.
    #[must_use]
    pub fn new(config: &StrapiConfig) -> Self {
        let product_cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(PRODUCT_CACHE_TTL)
            .build();

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            inner: Arc::new(StrapiClientInner {
                client,
                base_url: config.base_url.clone(),
                api_token: config.api_token.expose_secret().to_string(),
                product_cache,
            }),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    // =========================================================================
    // Request Plumbing
    // =========================================================================

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, StrapiError> {
        let response = self
            .inner
            .client
            .get(self.url(path))
            .bearer_auth(&self.inner.api_token)
            .query(query)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, StrapiError> {
        let response = self
            .inner
            .client
            .post(self.url(path))
            .bearer_auth(&self.inner.api_token)
            .json(body)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    async fn put_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, StrapiError> {
        let response = self
            .inner
            .client
            .put(self.url(path))
            .bearer_auth(&self.inner.api_token)
            .json(body)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    async fn delete(&self, path: &str) -> Result<(), StrapiError> {
        let response = self
            .inner
            .client
            .delete(self.url(path))
            .bearer_auth(&self.inner.api_token)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        Err(Self::classify_failure(status, &response.text().await?))
    }

    /// Parse a response body, mapping non-success statuses to typed errors.
    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, StrapiError> {
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(StrapiError::RateLimited(retry_after));
        }

        // Read the body as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Self::classify_failure(status, &body));
        }

        match serde_json::from_str(&body) {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    body = %body.chars().take(500).collect::<String>(),
                    "Failed to parse CMS response"
                );
                Err(StrapiError::Parse(e))
            }
        }
    }

    /// Map a non-success status plus error envelope to a typed error.
    fn classify_failure(status: StatusCode, body: &str) -> StrapiError {
        let message = serde_json::from_str::<ErrorResponse>(body).map_or_else(
            |_| body.chars().take(200).collect::<String>(),
            |e| e.error.message,
        );

        match status {
            StatusCode::NOT_FOUND => StrapiError::NotFound(message),
            StatusCode::CONFLICT => StrapiError::Conflict(message),
            StatusCode::BAD_REQUEST if message.to_lowercase().contains("unique") => {
                StrapiError::Conflict(message)
            }
            _ => StrapiError::Status {
                status: status.as_u16(),
                message,
            },
        }
    }

    // =========================================================================
    // Cart Methods (not cached - mutable state)
    // =========================================================================

    /// Find the cart for a user email, with items populated.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails; an absent cart is `None`.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn find_cart(&self, email: &str) -> Result<Option<Cart>, StrapiError> {
        let response: ListResponse<CartAttributes> = self
            .get_json(
                "/api/carts",
                &[
                    ("filters[userEmail][$eq]", email),
                    ("populate", "cartItems"),
                ],
            )
            .await?;

        Ok(response.data.into_iter().next().map(convert_cart))
    }

    /// Create a cart with zero totals for a user.
    ///
    /// # Errors
    ///
    /// Returns `StrapiError::Conflict` if a cart for this email already
    /// exists (unique `userEmail` constraint).
    #[instrument(skip(self), fields(email = %email))]
    pub async fn create_cart(
        &self,
        email: &str,
        external_user_id: &str,
        currency: &str,
    ) -> Result<Cart, StrapiError> {
        let payload = Data {
            data: NewCart {
                user_email: email,
                external_user_id,
                total_amount: Decimal::ZERO,
                currency,
            },
        };

        let response: SingleResponse<CartAttributes> =
            self.post_json("/api/carts", &payload).await?;

        Ok(convert_cart(response.data))
    }

    /// Get a cart item by id with its owning cart populated.
    ///
    /// Returns the item and the owner's email (when the relation is set).
    /// An unknown id is `None`, not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn get_cart_item(
        &self,
        item_id: CartItemId,
    ) -> Result<Option<(CartItem, Option<String>)>, StrapiError> {
        let result: Result<SingleResponse<CartItemAttributes>, StrapiError> = self
            .get_json(
                &format!("/api/cart-items/{item_id}"),
                &[("populate", "cart")],
            )
            .await;

        match result {
            Ok(response) => {
                let owner = item_owner_email(&response.data);
                Ok(Some((convert_cart_item(response.data), owner)))
            }
            Err(StrapiError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Create a cart item, connected to the user's cart by email.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(email = %email, slug = %product_slug))]
    pub async fn create_cart_item(
        &self,
        email: &str,
        product_slug: &str,
        quantity: u32,
        unit_price: Decimal,
    ) -> Result<CartItem, StrapiError> {
        let payload = Data {
            data: NewCartItem {
                product_slug,
                quantity,
                unit_price,
                total_price: unit_price * Decimal::from(quantity),
                cart: CartConnect {
                    connect: vec![ConnectByEmail { user_email: email }],
                },
            },
        };

        let response: SingleResponse<CartItemAttributes> =
            self.post_json("/api/cart-items", &payload).await?;

        Ok(convert_cart_item(response.data))
    }

    /// Update an item's quantity, recomputing the stored line total.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn update_cart_item(
        &self,
        item_id: CartItemId,
        quantity: u32,
        unit_price: Decimal,
    ) -> Result<CartItem, StrapiError> {
        let payload = Data {
            data: CartItemPatch {
                quantity,
                total_price: unit_price * Decimal::from(quantity),
            },
        };

        let response: SingleResponse<CartItemAttributes> = self
            .put_json(&format!("/api/cart-items/{item_id}"), &payload)
            .await?;

        Ok(convert_cart_item(response.data))
    }

    /// Delete a cart item by id.
    ///
    /// # Errors
    ///
    /// Returns `StrapiError::NotFound` if the item does not exist.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn delete_cart_item(&self, item_id: CartItemId) -> Result<(), StrapiError> {
        self.delete(&format!("/api/cart-items/{item_id}")).await
    }

    // =========================================================================
    // Product Methods
    // =========================================================================

    /// Find a product by slug, cached for 60 seconds.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails; an unknown slug is `None`.
    #[instrument(skip(self), fields(slug = %slug))]
    pub async fn find_product(&self, slug: &str) -> Result<Option<Product>, StrapiError> {
        if let Some(product) = self.inner.product_cache.get(slug).await {
            debug!("Cache hit for product");
            return Ok(Some(product));
        }

        let response: ListResponse<ProductAttributes> = self
            .get_json(
                "/api/products",
                &[("filters[slug][$eq]", slug), ("populate", "images")],
            )
            .await?;

        let product = response.data.into_iter().next().map(convert_product);

        if let Some(ref product) = product {
            self.inner
                .product_cache
                .insert(slug.to_string(), product.clone())
                .await;
        }

        Ok(product)
    }

    /// Invalidate a cached product.
    pub async fn invalidate_product(&self, slug: &str) {
        self.inner.product_cache.invalidate(slug).await;
    }
}
