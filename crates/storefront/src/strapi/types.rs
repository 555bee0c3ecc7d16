//! Wire types for the Strapi v4 REST API.
//!
//! Every resource travels in the `{"data": {"id", "attributes": {...}}}`
//! envelope; relations nest the same envelope one level down. These types
//! stay private to the client layer - conversions produce the domain types
//! in [`crate::models::cart`].

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Envelope Types
// =============================================================================

/// A single entry: numeric id plus the collection's attributes.
#[derive(Debug, Clone, Deserialize)]
pub struct Entry<T> {
    pub id: i32,
    pub attributes: T,
}

/// Response for collection queries (`GET /api/<collection>?filters...`).
#[derive(Debug, Deserialize)]
pub struct ListResponse<T> {
    pub data: Vec<Entry<T>>,
}

/// Response for single-entry operations (create, update, `GET /:id`).
#[derive(Debug, Deserialize)]
pub struct SingleResponse<T> {
    pub data: Entry<T>,
}

/// A to-one relation (`populate=<name>`); `data` is null when unset.
#[derive(Debug, Clone, Deserialize)]
pub struct Relation<T> {
    pub data: Option<Entry<T>>,
}

/// A to-many relation (`populate=<name>`).
#[derive(Debug, Clone, Deserialize)]
pub struct RelationList<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<Entry<T>>,
}

/// Error envelope: `{"error": {"status", "name", "message"}}`.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Error payload inside the envelope.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub message: String,
}

// =============================================================================
// Collection Attributes
// =============================================================================

/// `carts` collection attributes.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartAttributes {
    pub user_email: String,
    #[serde(default)]
    pub external_user_id: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub total_amount: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub cart_items: Option<RelationList<CartItemAttributes>>,
}

/// `cart-items` collection attributes.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemAttributes {
    pub product_slug: String,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price: Decimal,
    /// Present only when the query populates the owning cart.
    #[serde(default)]
    pub cart: Option<Relation<CartOwnerAttributes>>,
}

/// The slice of cart attributes needed for ownership checks.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartOwnerAttributes {
    pub user_email: String,
}

/// `products` collection attributes.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductAttributes {
    pub name: String,
    pub slug: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default)]
    pub images: Option<RelationList<MediaAttributes>>,
}

/// Media entry attributes (only the URL matters here).
#[derive(Debug, Clone, Deserialize)]
pub struct MediaAttributes {
    pub url: String,
}

// =============================================================================
// Write Payloads
// =============================================================================

/// Mutation envelope: Strapi expects `{"data": {...}}` on writes.
#[derive(Debug, Serialize)]
pub struct Data<T> {
    pub data: T,
}

/// Payload for creating a cart with zero totals.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCart<'a> {
    pub user_email: &'a str,
    pub external_user_id: &'a str,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub currency: &'a str,
}

/// Payload for creating a cart item, connected to its cart by the unique
/// `userEmail` field rather than by cart id.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCartItem<'a> {
    pub product_slug: &'a str,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price: Decimal,
    pub cart: CartConnect<'a>,
}

/// Relation connect clause.
#[derive(Debug, Serialize)]
pub struct CartConnect<'a> {
    pub connect: Vec<ConnectByEmail<'a>>,
}

/// Connect-by-unique-field target.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectByEmail<'a> {
    pub user_email: &'a str,
}

/// Payload for the quantity-merge update of an existing item.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemPatch {
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price: Decimal,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_cart_list_with_items() {
        let json = r#"{
            "data": [{
                "id": 4,
                "attributes": {
                    "userEmail": "user@example.com",
                    "externalUserId": "a1b2c3d4e5f6a7b8c9d0e1f2",
                    "totalAmount": 300.0,
                    "currency": "USD",
                    "cartItems": {
                        "data": [{
                            "id": 11,
                            "attributes": {
                                "productSlug": "diya-set",
                                "quantity": 3,
                                "unitPrice": 100.0,
                                "totalPrice": 300.0
                            }
                        }]
                    }
                }
            }],
            "meta": {"pagination": {"page": 1}}
        }"#;

        let parsed: ListResponse<CartAttributes> = serde_json::from_str(json).unwrap();
        let cart = parsed.data.first().unwrap();
        assert_eq!(cart.id, 4);
        assert_eq!(cart.attributes.user_email, "user@example.com");

        let items = &cart.attributes.cart_items.as_ref().unwrap().data;
        assert_eq!(items.len(), 1);
        let item = items.first().unwrap();
        assert_eq!(item.attributes.quantity, 3);
        assert_eq!(item.attributes.unit_price, Decimal::from(100));
    }

    #[test]
    fn test_deserialize_cart_without_populated_items() {
        let json = r#"{
            "data": {
                "id": 4,
                "attributes": {
                    "userEmail": "user@example.com",
                    "totalAmount": 0,
                    "currency": "USD"
                }
            }
        }"#;

        let parsed: SingleResponse<CartAttributes> = serde_json::from_str(json).unwrap();
        assert!(parsed.data.attributes.cart_items.is_none());
        assert!(parsed.data.attributes.external_user_id.is_none());
    }

    #[test]
    fn test_deserialize_item_with_owner_relation() {
        let json = r#"{
            "data": {
                "id": 11,
                "attributes": {
                    "productSlug": "diya-set",
                    "quantity": 2,
                    "unitPrice": 50.5,
                    "totalPrice": 101.0,
                    "cart": {
                        "data": {
                            "id": 4,
                            "attributes": {"userEmail": "owner@example.com"}
                        }
                    }
                }
            }
        }"#;

        let parsed: SingleResponse<CartItemAttributes> = serde_json::from_str(json).unwrap();
        let owner = parsed.data.attributes.cart.unwrap().data.unwrap();
        assert_eq!(owner.attributes.user_email, "owner@example.com");
    }

    #[test]
    fn test_deserialize_error_envelope() {
        let json = r#"{
            "data": null,
            "error": {"status": 400, "name": "ValidationError", "message": "This attribute must be unique"}
        }"#;

        let parsed: ErrorResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.error.status, 400);
        assert_eq!(parsed.error.message, "This attribute must be unique");
    }

    #[test]
    fn test_serialize_new_cart_item_connects_by_email() {
        let payload = Data {
            data: NewCartItem {
                product_slug: "diya-set",
                quantity: 2,
                unit_price: Decimal::from(100),
                total_price: Decimal::from(200),
                cart: CartConnect {
                    connect: vec![ConnectByEmail {
                        user_email: "user@example.com",
                    }],
                },
            },
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["data"]["productSlug"], "diya-set");
        assert_eq!(json["data"]["unitPrice"], 100.0);
        assert_eq!(json["data"]["totalPrice"], 200.0);
        assert_eq!(
            json["data"]["cart"]["connect"][0]["userEmail"],
            "user@example.com"
        );
    }

    #[test]
    fn test_deserialize_product_with_images() {
        let json = r#"{
            "data": [{
                "id": 9,
                "attributes": {
                    "name": "Diya Set",
                    "slug": "diya-set",
                    "price": 120.0,
                    "images": {
                        "data": [
                            {"id": 1, "attributes": {"url": "/uploads/diya.jpg"}}
                        ]
                    }
                }
            }]
        }"#;

        let parsed: ListResponse<ProductAttributes> = serde_json::from_str(json).unwrap();
        let product = parsed.data.first().unwrap();
        assert_eq!(product.attributes.price, Decimal::from(120));
        assert_eq!(
            product.attributes.images.as_ref().unwrap().data.len(),
            1
        );
    }
}
