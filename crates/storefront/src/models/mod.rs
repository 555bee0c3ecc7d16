//! Domain models for storefront.

pub mod cart;
pub mod user;

pub use cart::{Cart, CartItem, CartItemView, Product, ProductSummary};
pub use user::{User, UserProfile};
