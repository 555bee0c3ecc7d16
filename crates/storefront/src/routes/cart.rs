//! Cart route handlers.
//!
//! All three operations require a session cookie. Reads go through the cart
//! cache; every write invalidates it, so the client's follow-up refetch
//! observes its own mutation.

use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use rangoli_core::CartItemId;

use crate::error::AppError;
use crate::middleware::{CurrentUser, OptionalUser};
use crate::models::cart::{CartItem, CartItemView};
use crate::state::AppState;

// =============================================================================
// Request / Response Types
// =============================================================================

/// Body for `POST /api/cart`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AddItemRequest {
    pub product_slug: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

const fn default_quantity() -> u32 {
    1
}

/// Query for `DELETE /api/cart?id=<itemId>`.
#[derive(Debug, Deserialize)]
pub struct RemoveItemQuery {
    pub id: i32,
}

/// Response for `GET /api/cart`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub success: bool,
    pub cart: Vec<CartItemView>,
    pub total_items: u32,
}

/// Response for `POST /api/cart`.
#[derive(Debug, Serialize)]
pub struct AddItemResponse {
    pub success: bool,
    pub item: CartItem,
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /api/cart`
///
/// Returns the cart items enriched with live product data. Unauthenticated
/// requests get the empty-cart 401 envelope the client renders directly.
#[instrument(skip(state, session))]
pub async fn get_cart(
    State(state): State<AppState>,
    OptionalUser(session): OptionalUser,
) -> Response {
    let Some(session) = session else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "success": false,
                "cart": [],
                "error": "Not authenticated",
            })),
        )
            .into_response();
    };

    let result: Result<Vec<CartItemView>, AppError> = async {
        let email = state
            .carts()
            .resolve_email(state.pool(), session.user_id)
            .await?;
        Ok(state.carts().cart_view(&email, false).await?)
    }
    .await;

    match result {
        Ok(items) => {
            let total_items = items.iter().map(|item| item.quantity).sum();
            Json(CartResponse {
                success: true,
                cart: items,
                total_items,
            })
            .into_response()
        }
        Err(err) => err.into_response(),
    }
}

/// `POST /api/cart`
///
/// Adds a product to the caller's cart, merging quantities with any existing
/// line for the same product.
#[instrument(skip(state, session, body))]
pub async fn add_item(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    body: Result<Json<AddItemRequest>, JsonRejection>,
) -> Result<Json<AddItemResponse>, AppError> {
    let Json(request) =
        body.map_err(|_| AppError::BadRequest("productSlug is required".to_string()))?;

    let email = state
        .carts()
        .resolve_email(state.pool(), session.user_id)
        .await?;

    let item = state
        .carts()
        .add_item(&email, &request.product_slug, request.quantity)
        .await?;

    Ok(Json(AddItemResponse {
        success: true,
        item,
    }))
}

/// `DELETE /api/cart?id=<itemId>`
///
/// Removes an item from the caller's cart. Ownership is verified before the
/// delete; items in other carts are indistinguishable from missing ones.
#[instrument(skip(state, session, query))]
pub async fn remove_item(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    query: Result<Query<RemoveItemQuery>, QueryRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Query(request) =
        query.map_err(|_| AppError::BadRequest("id query parameter is required".to_string()))?;

    let email = state
        .carts()
        .resolve_email(state.pool(), session.user_id)
        .await?;

    state
        .carts()
        .remove_item(&email, CartItemId::new(request.id))
        .await?;

    Ok(Json(json!({"success": true})))
}
