//! Review endpoints.
//!
//! Anyone may read. Writing needs an authenticated user; only the author
//! may edit, and the author or an administrator may delete.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{ProductId, ReviewId, UserId};
use domain::{ReviewChanges, ReviewInput};
use entity_store::{EntityStore, Review, ReviewQuery, ReviewSortField, parse_ordering};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;
use crate::extract::{AppJson, AppQuery, CurrentActor, parse_filter_id, parse_id};

// -- Request types --

#[derive(Deserialize)]
pub struct ReviewListParams {
    pub product: Option<String>,
    pub user: Option<String>,
    pub ordering: Option<String>,
}

#[derive(Deserialize)]
pub struct ReviewRequest {
    pub product: ProductId,
    pub rating: i32,
    #[serde(default)]
    pub commentary: String,
}

/// Body of PUT. `product` must be present but the review keeps its product.
#[derive(Deserialize)]
pub struct ReviewReplaceRequest {
    pub product: ProductId,
    pub rating: i32,
    pub commentary: Option<String>,
}

/// Body of PATCH. A `product` key is accepted and ignored.
#[derive(Deserialize)]
pub struct ReviewPatchRequest {
    pub rating: Option<i32>,
    pub commentary: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct ReviewResponse {
    pub id: ReviewId,
    pub rating: i32,
    pub commentary: String,
    pub user: UserId,
    pub product: ProductId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Review> for ReviewResponse {
    fn from(review: Review) -> Self {
        Self {
            id: review.id,
            rating: review.rating,
            commentary: review.commentary,
            user: review.user_id,
            product: review.product_id,
            created_at: review.created_at,
            updated_at: review.updated_at,
        }
    }
}

impl ReviewListParams {
    fn into_query(self) -> Result<ReviewQuery, ApiError> {
        let mut query = ReviewQuery::new();
        if let Some(raw) = self.product.as_deref() {
            query = query.product(parse_filter_id("product", raw)?);
        }
        if let Some(raw) = self.user.as_deref() {
            query = query.user(parse_filter_id("user", raw)?);
        }
        query.ordering =
            parse_ordering::<ReviewSortField>(self.ordering.as_deref().unwrap_or_default());
        Ok(query)
    }
}

// -- Handlers --

/// GET /reviews?product=<id>&user=<id>&ordering=-rating
#[tracing::instrument(skip(state, params))]
pub async fn list<S: EntityStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AppQuery(params): AppQuery<ReviewListParams>,
) -> Result<Json<Vec<ReviewResponse>>, ApiError> {
    let reviews = state.reviews.list_reviews(params.into_query()?).await?;
    Ok(Json(reviews.into_iter().map(ReviewResponse::from).collect()))
}

/// GET /reviews/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: EntityStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ReviewResponse>, ApiError> {
    let review = state.reviews.get_review(parse_id(&id)?).await?;
    Ok(Json(review.into()))
}

/// POST /reviews
#[tracing::instrument(skip(state, req))]
pub async fn create<S: EntityStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentActor(actor): CurrentActor,
    AppJson(req): AppJson<ReviewRequest>,
) -> Result<(StatusCode, Json<ReviewResponse>), ApiError> {
    let input = ReviewInput {
        product_id: req.product,
        rating: req.rating,
        commentary: req.commentary,
    };
    let review = state.reviews.create_review(&actor, input).await?;
    Ok((StatusCode::CREATED, Json(review.into())))
}

/// PUT /reviews/{id}
#[tracing::instrument(skip(state, req))]
pub async fn replace<S: EntityStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    AppJson(req): AppJson<ReviewReplaceRequest>,
) -> Result<Json<ReviewResponse>, ApiError> {
    let changes = ReviewChanges {
        rating: Some(req.rating),
        commentary: req.commentary,
    };
    let review = state
        .reviews
        .update_review(&actor, parse_id(&id)?, changes)
        .await?;
    Ok(Json(review.into()))
}

/// PATCH /reviews/{id}
#[tracing::instrument(skip(state, req))]
pub async fn update<S: EntityStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    AppJson(req): AppJson<ReviewPatchRequest>,
) -> Result<Json<ReviewResponse>, ApiError> {
    let changes = ReviewChanges {
        rating: req.rating,
        commentary: req.commentary,
    };
    let review = state
        .reviews
        .update_review(&actor, parse_id(&id)?, changes)
        .await?;
    Ok(Json(review.into()))
}

/// DELETE /reviews/{id}
#[tracing::instrument(skip(state))]
pub async fn delete<S: EntityStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.reviews.delete_review(&actor, parse_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}
