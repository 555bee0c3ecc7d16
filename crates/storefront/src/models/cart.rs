//! Cart and product domain types.
//!
//! The CMS owns cart persistence; these are the converted domain shapes the
//! service layer caches and the API serializes. Line items durably snapshot
//! `unit_price` at write time - display data (name, image) is merged live at
//! read time and never overwrites the billed price.

use rust_decimal::Decimal;
use serde::Serialize;

use rangoli_core::{CartId, CartItemId, CurrencyCode, ProductId};

/// Display name substituted for items whose product lookup fails.
pub const PRODUCT_NOT_FOUND_NAME: &str = "Product Not Found";

/// A per-user cart aggregate, keyed by email in the CMS.
#[derive(Debug, Clone)]
pub struct Cart {
    /// CMS entry id.
    pub id: CartId,
    /// Owning user's normalized email.
    pub user_email: String,
    /// Random identifier generated at cart creation.
    pub external_user_id: Option<String>,
    /// Aggregate total.
    pub total_amount: Decimal,
    /// ISO currency code.
    pub currency: CurrencyCode,
    /// Line items.
    pub items: Vec<CartItem>,
}

/// A cart line item as stored in the CMS.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// CMS entry id.
    pub id: CartItemId,
    /// Slug of the referenced product.
    pub product_slug: String,
    /// Unit count (>= 1).
    pub quantity: u32,
    /// Price per unit captured at write time.
    pub unit_price: Decimal,
    /// `quantity x unit_price`, computed at write time.
    pub total_price: Decimal,
}

impl CartItem {
    /// Recompute the stored line total from quantity and unit price.
    #[must_use]
    pub fn derived_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// A catalog product, read live from the CMS.
#[derive(Debug, Clone)]
pub struct Product {
    /// CMS entry id.
    pub id: ProductId,
    /// URL slug (lookup key).
    pub slug: String,
    /// Display name.
    pub name: String,
    /// Current catalog price.
    pub price: Decimal,
    /// Image URLs.
    pub images: Vec<String>,
}

/// Live product data merged into a cart item at read time.
///
/// When the product lookup fails the item is kept and a placeholder is
/// substituted instead of dropping the line.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub slug: String,
    pub name: String,
    pub price: Option<Decimal>,
    pub image: Option<String>,
    /// False when the placeholder stands in for a missing product.
    pub found: bool,
}

impl ProductSummary {
    /// Summary for a product that resolved.
    #[must_use]
    pub fn from_product(product: &Product) -> Self {
        Self {
            slug: product.slug.clone(),
            name: product.name.clone(),
            price: Some(product.price),
            image: product.images.first().cloned(),
            found: true,
        }
    }

    /// Placeholder for a product that no longer resolves.
    #[must_use]
    pub fn not_found(slug: &str) -> Self {
        Self {
            slug: slug.to_string(),
            name: PRODUCT_NOT_FOUND_NAME.to_string(),
            price: None,
            image: None,
            found: false,
        }
    }
}

/// A cart item enriched with live product data, as returned by the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemView {
    pub id: CartItemId,
    pub product_slug: String,
    pub quantity: u32,
    /// Billing math always uses this stored price, not the live one.
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub product: ProductSummary,
}

impl CartItemView {
    /// Merge a stored item with its live product data.
    #[must_use]
    pub fn new(item: &CartItem, product: Option<&Product>) -> Self {
        let product = product.map_or_else(
            || ProductSummary::not_found(&item.product_slug),
            ProductSummary::from_product,
        );

        Self {
            id: item.id,
            product_slug: item.product_slug.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            total_price: item.total_price,
            product,
        }
    }
}
