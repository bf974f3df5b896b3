//! The caller's wishlist. Every endpoint needs an authenticated user.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{ProductId, UserId, WishItemId};
use domain::WishLine;
use entity_store::{EntityStore, WishItem};
use serde::{Deserialize, Serialize};

use super::products::ProductSummary;
use crate::AppState;
use crate::error::ApiError;
use crate::extract::{AppJson, CurrentActor, parse_id};

#[derive(Deserialize)]
pub struct WishItemRequest {
    pub product: ProductId,
}

#[derive(Serialize)]
pub struct WishItemResponse {
    pub id: WishItemId,
    pub user: UserId,
    pub product: ProductId,
}

#[derive(Serialize)]
pub struct WishLineResponse {
    pub id: WishItemId,
    pub user: UserId,
    pub product: ProductSummary,
}

impl From<WishItem> for WishItemResponse {
    fn from(item: WishItem) -> Self {
        Self {
            id: item.id,
            user: item.user_id,
            product: item.product_id,
        }
    }
}

impl From<WishLine> for WishLineResponse {
    fn from(line: WishLine) -> Self {
        Self {
            id: line.item.id,
            user: line.item.user_id,
            product: line.product.into(),
        }
    }
}

/// GET /wishlist
#[tracing::instrument(skip(state))]
pub async fn list<S: EntityStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<WishLineResponse>>, ApiError> {
    let lines = state.wishlist.list_items(&actor).await?;
    Ok(Json(lines.into_iter().map(WishLineResponse::from).collect()))
}

/// GET /wishlist/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: EntityStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> Result<Json<WishLineResponse>, ApiError> {
    let line = state.wishlist.get_item(&actor, parse_id(&id)?).await?;
    Ok(Json(line.into()))
}

/// POST /wishlist
#[tracing::instrument(skip(state, req))]
pub async fn create<S: EntityStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentActor(actor): CurrentActor,
    AppJson(req): AppJson<WishItemRequest>,
) -> Result<(StatusCode, Json<WishItemResponse>), ApiError> {
    let item = state.wishlist.add_item(&actor, req.product).await?;
    Ok((StatusCode::CREATED, Json(item.into())))
}

/// DELETE /wishlist/{id}
#[tracing::instrument(skip(state))]
pub async fn delete<S: EntityStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.wishlist.remove_item(&actor, parse_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}
