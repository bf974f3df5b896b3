//! The caller's cart. Every endpoint needs an authenticated user.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{CartId, CartItemId, ProductId};
use domain::{CartItemChanges, CartItemInput, CartLine};
use entity_store::{CartItem, EntityStore};
use serde::{Deserialize, Serialize};

use super::products::ProductSummary;
use crate::AppState;
use crate::error::ApiError;
use crate::extract::{AppJson, CurrentActor, parse_id};

// -- Request types --

#[derive(Deserialize)]
pub struct CartItemRequest {
    pub product: ProductId,
    pub quantity: i32,
}

#[derive(Deserialize)]
pub struct CartItemPatchRequest {
    pub product: Option<ProductId>,
    pub quantity: Option<i32>,
}

// -- Response types --

#[derive(Serialize)]
pub struct CartItemResponse {
    pub id: CartItemId,
    pub cart: CartId,
    pub product: ProductId,
    pub quantity: i32,
}

/// A cart line with the product expanded.
#[derive(Serialize)]
pub struct CartLineResponse {
    pub id: CartItemId,
    pub cart: CartId,
    pub product: ProductSummary,
    pub quantity: i32,
}

impl From<CartItem> for CartItemResponse {
    fn from(item: CartItem) -> Self {
        Self {
            id: item.id,
            cart: item.cart_id,
            product: item.product_id,
            quantity: item.quantity,
        }
    }
}

impl From<CartLine> for CartLineResponse {
    fn from(line: CartLine) -> Self {
        Self {
            id: line.item.id,
            cart: line.item.cart_id,
            product: line.product.into(),
            quantity: line.item.quantity,
        }
    }
}

// -- Handlers --

/// GET /cart
#[tracing::instrument(skip(state))]
pub async fn list<S: EntityStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<CartLineResponse>>, ApiError> {
    let lines = state.cart.list_items(&actor).await?;
    Ok(Json(lines.into_iter().map(CartLineResponse::from).collect()))
}

/// GET /cart/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: EntityStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> Result<Json<CartLineResponse>, ApiError> {
    let line = state.cart.get_item(&actor, parse_id(&id)?).await?;
    Ok(Json(line.into()))
}

/// POST /cart: adds a product, merging with an existing line for the same
/// product. Responds with the stored line.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: EntityStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentActor(actor): CurrentActor,
    AppJson(req): AppJson<CartItemRequest>,
) -> Result<(StatusCode, Json<CartItemResponse>), ApiError> {
    let input = CartItemInput {
        product_id: req.product,
        quantity: req.quantity,
    };
    let item = state.cart.add_item(&actor, input).await?;
    Ok((StatusCode::CREATED, Json(item.into())))
}

/// PUT /cart/{id}
#[tracing::instrument(skip(state, req))]
pub async fn replace<S: EntityStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    AppJson(req): AppJson<CartItemRequest>,
) -> Result<Json<CartItemResponse>, ApiError> {
    let changes = CartItemChanges {
        product_id: Some(req.product),
        quantity: Some(req.quantity),
    };
    let item = state
        .cart
        .update_item(&actor, parse_id(&id)?, changes)
        .await?;
    Ok(Json(item.into()))
}

/// PATCH /cart/{id}
#[tracing::instrument(skip(state, req))]
pub async fn update<S: EntityStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    AppJson(req): AppJson<CartItemPatchRequest>,
) -> Result<Json<CartItemResponse>, ApiError> {
    let changes = CartItemChanges {
        product_id: req.product,
        quantity: req.quantity,
    };
    let item = state
        .cart
        .update_item(&actor, parse_id(&id)?, changes)
        .await?;
    Ok(Json(item.into()))
}

/// DELETE /cart/{id}
#[tracing::instrument(skip(state))]
pub async fn delete<S: EntityStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.cart.remove_item(&actor, parse_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}
