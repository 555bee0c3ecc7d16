//! Application state shared across handlers.

use std::sync::Arc;

use moka::future::Cache;
use sqlx::PgPool;

use rangoli_core::UserId;

use crate::config::StorefrontConfig;
use crate::models::user::User;
use crate::services::auth::{self, AuthService};
use crate::services::cart::CartService;
use crate::strapi::StrapiClient;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    strapi: StrapiClient,
    carts: CartService,
    user_cache: Cache<UserId, User>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `PostgreSQL` connection pool
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        let strapi = StrapiClient::new(&config.strapi);
        let carts = CartService::new(strapi.clone());
        let user_cache = auth::user_cache();

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                strapi,
                carts,
                user_cache,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the CMS client.
    #[must_use]
    pub fn strapi(&self) -> &StrapiClient {
        &self.inner.strapi
    }

    /// Get a reference to the cart service.
    #[must_use]
    pub fn carts(&self) -> &CartService {
        &self.inner.carts
    }

    /// Build an authentication service borrowing this state.
    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(
            &self.inner.pool,
            &self.inner.user_cache,
            &self.inner.config.auth_secret,
            self.inner.config.google_client_id.as_deref(),
        )
    }
}
