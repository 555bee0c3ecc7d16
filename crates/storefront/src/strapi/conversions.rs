//! Conversions from Strapi wire types to domain types.

use rust_decimal::Decimal;

use rangoli_core::{CartId, CartItemId, CurrencyCode, ProductId};

use crate::models::cart::{Cart, CartItem, Product};

use super::types::{CartAttributes, CartItemAttributes, Entry, ProductAttributes};

/// Convert a populated cart entry into the domain cart.
pub fn convert_cart(entry: Entry<CartAttributes>) -> Cart {
    let attrs = entry.attributes;
    let items = attrs
        .cart_items
        .map(|rel| rel.data.into_iter().map(convert_cart_item).collect())
        .unwrap_or_default();

    Cart {
        id: CartId::new(entry.id),
        user_email: attrs.user_email,
        external_user_id: attrs.external_user_id,
        total_amount: attrs.total_amount.unwrap_or(Decimal::ZERO),
        currency: attrs
            .currency
            .as_deref()
            .map(CurrencyCode::parse_or_default)
            .unwrap_or_default(),
        items,
    }
}

/// Convert a cart item entry into the domain item.
pub fn convert_cart_item(entry: Entry<CartItemAttributes>) -> CartItem {
    let attrs = entry.attributes;
    CartItem {
        id: CartItemId::new(entry.id),
        product_slug: attrs.product_slug,
        quantity: attrs.quantity,
        unit_price: attrs.unit_price,
        total_price: attrs.total_price,
    }
}

/// Extract the owning cart's email from a populated item entry, if any.
pub fn item_owner_email(entry: &Entry<CartItemAttributes>) -> Option<String> {
    entry
        .attributes
        .cart
        .as_ref()
        .and_then(|rel| rel.data.as_ref())
        .map(|owner| owner.attributes.user_email.clone())
}

/// Convert a product entry into the domain product.
pub fn convert_product(entry: Entry<ProductAttributes>) -> Product {
    let attrs = entry.attributes;
    let images = attrs
        .images
        .map(|rel| {
            rel.data
                .into_iter()
                .map(|media| media.attributes.url)
                .collect()
        })
        .unwrap_or_default();

    Product {
        id: ProductId::new(entry.id),
        slug: attrs.slug,
        name: attrs.name,
        price: attrs.price,
        images,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::strapi::types::ListResponse;

    #[test]
    fn test_convert_cart_defaults_missing_fields() {
        let json = r#"{
            "data": [{
                "id": 2,
                "attributes": {"userEmail": "u@example.com"}
            }]
        }"#;
        let parsed: ListResponse<CartAttributes> = serde_json::from_str(json).unwrap();
        let cart = convert_cart(parsed.data.into_iter().next().unwrap());

        assert_eq!(cart.id, CartId::new(2));
        assert_eq!(cart.total_amount, Decimal::ZERO);
        assert_eq!(cart.currency, CurrencyCode::USD);
        assert!(cart.items.is_empty());
    }

    #[test]
    fn test_convert_cart_carries_items() {
        let json = r#"{
            "data": [{
                "id": 2,
                "attributes": {
                    "userEmail": "u@example.com",
                    "currency": "INR",
                    "cartItems": {"data": [
                        {"id": 5, "attributes": {"productSlug": "rangoli-stencil", "quantity": 2, "unitPrice": 15.5, "totalPrice": 31.0}}
                    ]}
                }
            }]
        }"#;
        let parsed: ListResponse<CartAttributes> = serde_json::from_str(json).unwrap();
        let cart = convert_cart(parsed.data.into_iter().next().unwrap());

        assert_eq!(cart.currency, CurrencyCode::INR);
        assert_eq!(cart.items.len(), 1);
        let item = cart.items.first().unwrap();
        assert_eq!(item.id, CartItemId::new(5));
        assert_eq!(item.total_price, Decimal::new(310, 1));
    }
}
