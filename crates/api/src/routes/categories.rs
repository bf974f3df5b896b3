//! Category endpoints. Reads are public; writes need an administrator.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use domain::{CategoryChanges, CategoryInput};
use entity_store::{Category, EntityStore};
use serde::Deserialize;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::{AppJson, CurrentActor, parse_id};

#[derive(Deserialize)]
pub struct CategoryRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct CategoryPatchRequest {
    pub name: Option<String>,
}

/// GET /categories
#[tracing::instrument(skip(state))]
pub async fn list<S: EntityStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(state.catalog.list_categories().await?))
}

/// GET /categories/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: EntityStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.catalog.get_category(parse_id(&id)?).await?))
}

/// POST /categories
#[tracing::instrument(skip(state, req))]
pub async fn create<S: EntityStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentActor(actor): CurrentActor,
    AppJson(req): AppJson<CategoryRequest>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let category = state
        .catalog
        .create_category(&actor, CategoryInput::new(req.name))
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// PUT /categories/{id}
#[tracing::instrument(skip(state, req))]
pub async fn replace<S: EntityStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    AppJson(req): AppJson<CategoryRequest>,
) -> Result<Json<Category>, ApiError> {
    let changes = CategoryChanges {
        name: Some(req.name),
    };
    let category = state
        .catalog
        .update_category(&actor, parse_id(&id)?, changes)
        .await?;
    Ok(Json(category))
}

/// PATCH /categories/{id}
#[tracing::instrument(skip(state, req))]
pub async fn update<S: EntityStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    AppJson(req): AppJson<CategoryPatchRequest>,
) -> Result<Json<Category>, ApiError> {
    let changes = CategoryChanges { name: req.name };
    let category = state
        .catalog
        .update_category(&actor, parse_id(&id)?, changes)
        .await?;
    Ok(Json(category))
}

/// DELETE /categories/{id}: also deletes the category's products.
#[tracing::instrument(skip(state))]
pub async fn delete<S: EntityStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.catalog.delete_category(&actor, parse_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}
