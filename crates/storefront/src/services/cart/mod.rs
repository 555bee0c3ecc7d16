//! Cart synchronization service.
//!
//! Maps authenticated users to their CMS cart and keeps reads cheap with two
//! in-process caches:
//!
//! - `cart_cache` (email -> cart): entries are considered fresh for 30
//!   seconds but retained much longer, so a failing upstream refresh can fall
//!   back to the last known-good value instead of surfacing the failure.
//! - `email_cache` (user id -> email): 4x the base TTL; the CMS keys carts by
//!   email while sessions carry the numeric user id.
//!
//! Both caches are process-local. Under horizontal scaling each instance
//! holds its own view; the deployment runs a single instance.

mod error;

pub use error::CartError;

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use moka::future::Cache;
use rand::Rng;
use rand::distr::Alphanumeric;
use sqlx::PgPool;
use tracing::{debug, instrument, warn};

use rangoli_core::{CartItemId, Email, UserId};

use crate::db::users::UserRepository;
use crate::db::with_retry;
use crate::models::cart::{Cart, CartItem, CartItemView, Product};
use crate::strapi::{StrapiClient, StrapiError};

/// Freshness window for cached carts.
const CART_FRESH_TTL: Duration = Duration::from_secs(30);

/// How long stale cart entries are retained for the error fallback.
const CART_RETENTION: Duration = Duration::from_secs(60 * 60);

/// Email cache TTL: 4x the cart freshness window.
const EMAIL_CACHE_TTL: Duration = Duration::from_secs(4 * 30);

/// Length of the generated cart `externalUserId`.
const EXTERNAL_USER_ID_LEN: usize = 24;

/// A cached cart fetch result with its own freshness timestamp.
///
/// `None` means the CMS answered and the user has no cart yet; that answer is
/// cached like any other.
#[derive(Clone)]
struct CachedCart {
    cart: Option<Cart>,
    fetched_at: Instant,
}

impl CachedCart {
    fn is_fresh(&self) -> bool {
        self.fetched_at.elapsed() < CART_FRESH_TTL
    }
}

/// Cart synchronization service.
///
/// Cheaply cloneable; shares its caches across all handles.
#[derive(Clone)]
pub struct CartService {
    inner: Arc<CartServiceInner>,
}

struct CartServiceInner {
    strapi: StrapiClient,
    cart_cache: Cache<String, CachedCart>,
    email_cache: Cache<UserId, Email>,
}

impl CartService {
    /// Create a new cart service over a CMS client.
    #[must_use]
    pub fn new(strapi: StrapiClient) -> Self {
        let cart_cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(CART_RETENTION)
            .build();
        let email_cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(EMAIL_CACHE_TTL)
            .build();

        Self {
            inner: Arc::new(CartServiceInner {
                strapi,
                cart_cache,
                email_cache,
            }),
        }
    }

    // =========================================================================
    // Identity Resolution
    // =========================================================================

    /// Resolve a session's numeric user id to the email the CMS keys carts by.
    ///
    /// # Errors
    ///
    /// Returns `CartError::UserNotFound` if the user record is gone.
    #[instrument(skip(self, pool))]
    pub async fn resolve_email(&self, pool: &PgPool, user_id: UserId) -> Result<Email, CartError> {
        if let Some(email) = self.inner.email_cache.get(&user_id).await {
            return Ok(email);
        }

        let user = with_retry("users.get_by_id", move || async move {
            UserRepository::new(pool).get_by_id(user_id).await
        })
        .await?
        .ok_or(CartError::UserNotFound)?;

        self.inner
            .email_cache
            .insert(user_id, user.email.clone())
            .await;
        Ok(user.email)
    }

    // =========================================================================
    // Cart Reads
    // =========================================================================

    /// Fetch the user's cart, serving from cache within the freshness window.
    ///
    /// On upstream failure the last known-good value is returned when one is
    /// cached; the error propagates only on a cold cache. `None` means the
    /// user has no cart yet.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Strapi` only when no cached value exists.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn fetch_cart(
        &self,
        email: &Email,
        force_refresh: bool,
    ) -> Result<Option<Cart>, CartError> {
        let key = email.as_str().to_string();
        let cached = self.inner.cart_cache.get(&key).await;

        if !force_refresh
            && let Some(ref entry) = cached
            && entry.is_fresh()
        {
            debug!("Cache hit for cart");
            return Ok(entry.cart.clone());
        }

        match self.inner.strapi.find_cart(email.as_str()).await {
            Ok(cart) => {
                self.inner
                    .cart_cache
                    .insert(
                        key,
                        CachedCart {
                            cart: cart.clone(),
                            fetched_at: Instant::now(),
                        },
                    )
                    .await;
                Ok(cart)
            }
            Err(err) => match cached {
                Some(stale) => {
                    warn!(error = %err, "Cart refresh failed, serving stale cache");
                    Ok(stale.cart)
                }
                None => Err(err.into()),
            },
        }
    }

    /// Fetch the cart and enrich every item with live product data.
    ///
    /// Product lookups run concurrently, one per item. Items whose product no
    /// longer resolves keep their stored prices and get a placeholder name
    /// instead of being dropped.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Strapi` if the cart itself cannot be fetched and
    /// no cached value exists.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn cart_view(
        &self,
        email: &Email,
        force_refresh: bool,
    ) -> Result<Vec<CartItemView>, CartError> {
        let Some(cart) = self.fetch_cart(email, force_refresh).await? else {
            return Ok(Vec::new());
        };

        let products = join_all(
            cart.items
                .iter()
                .map(|item| self.get_product(&item.product_slug)),
        )
        .await;

        Ok(cart
            .items
            .iter()
            .zip(products.iter())
            .map(|(item, product)| CartItemView::new(item, product.as_ref()))
            .collect())
    }

    /// Look up a product for display, collapsing every failure to `None`.
    ///
    /// Read paths favor availability: a missing or unreachable product must
    /// never break a cart listing.
    pub async fn get_product(&self, slug: &str) -> Option<Product> {
        match self.inner.strapi.find_product(slug).await {
            Ok(product) => product,
            Err(err) => {
                warn!(slug, error = %err, "Product lookup failed");
                None
            }
        }
    }

    // =========================================================================
    // Cart Writes
    // =========================================================================

    /// Ensure a cart exists for the user, creating one on first access.
    ///
    /// Creation relies on the CMS-side unique `userEmail` constraint: a
    /// conflict means another request won the creation race, and the existing
    /// cart is re-fetched instead of trusting the earlier existence check.
    /// Serialized repeat calls always return the same cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Strapi` if the CMS rejects both paths.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn ensure_cart(&self, email: &Email) -> Result<Cart, CartError> {
        if let Some(cart) = self.inner.strapi.find_cart(email.as_str()).await? {
            return Ok(cart);
        }

        let external_user_id = generate_external_user_id();
        match self
            .inner
            .strapi
            .create_cart(email.as_str(), &external_user_id, "USD")
            .await
        {
            Ok(cart) => {
                self.invalidate(email).await;
                Ok(cart)
            }
            Err(StrapiError::Conflict(_)) => {
                debug!("Lost cart creation race, re-fetching");
                self.inner
                    .strapi
                    .find_cart(email.as_str())
                    .await?
                    .ok_or(CartError::CartMissing)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Add a product to the user's cart.
    ///
    /// An existing line for the same product merges by incrementing its
    /// quantity (`q1 + q2`), keeping the originally stored unit price; the
    /// line total is recomputed from that price at write time.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` for a zero quantity and
    /// `CartError::ProductNotFound` for an unknown slug.
    #[instrument(skip(self), fields(email = %email, slug = %product_slug))]
    pub async fn add_item(
        &self,
        email: &Email,
        product_slug: &str,
        quantity: u32,
    ) -> Result<CartItem, CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }

        let product = self
            .inner
            .strapi
            .find_product(product_slug)
            .await?
            .ok_or_else(|| CartError::ProductNotFound(product_slug.to_string()))?;

        let cart = self.ensure_cart(email).await?;

        let item = match cart.items.iter().find(|i| i.product_slug == product_slug) {
            Some(existing) => {
                self.inner
                    .strapi
                    .update_cart_item(
                        existing.id,
                        existing.quantity + quantity,
                        existing.unit_price,
                    )
                    .await?
            }
            None => {
                self.inner
                    .strapi
                    .create_cart_item(email.as_str(), product_slug, quantity, product.price)
                    .await?
            }
        };

        self.invalidate(email).await;
        Ok(item)
    }

    /// Remove an item from the user's cart.
    ///
    /// The item's owning cart is fetched and matched against the caller
    /// before the delete is issued; items in another user's cart answer
    /// exactly like missing ones.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` for missing or foreign items.
    #[instrument(skip(self), fields(email = %email, item_id = %item_id))]
    pub async fn remove_item(&self, email: &Email, item_id: CartItemId) -> Result<(), CartError> {
        let Some((_, owner)) = self.inner.strapi.get_cart_item(item_id).await? else {
            return Err(CartError::ItemNotFound);
        };

        if owner.as_deref() != Some(email.as_str()) {
            warn!("Blocked cart item delete outside caller's cart");
            return Err(CartError::ItemNotFound);
        }

        self.inner.strapi.delete_cart_item(item_id).await?;
        self.invalidate(email).await;
        Ok(())
    }

    /// Drop the cached cart for a user after a write.
    pub async fn invalidate(&self, email: &Email) {
        self.inner.cart_cache.invalidate(email.as_str()).await;
    }
}

/// Generate the random 24-character alphanumeric `externalUserId` assigned to
/// new carts.
fn generate_external_user_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(EXTERNAL_USER_ID_LEN)
        .map(char::from)
        .collect()
}
