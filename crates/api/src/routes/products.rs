//! Product endpoints. Reads are public; writes need an administrator.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::{CategoryId, ProductId};
use domain::{ProductChanges, ProductInput};
use entity_store::{EntityStore, Product, ProductQuery, ProductSortField, Properties, parse_ordering};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;
use crate::extract::{AppJson, AppQuery, CurrentActor, parse_filter_id, parse_id};

// -- Request types --

#[derive(Deserialize)]
pub struct ProductListParams {
    /// Comma separated category ids.
    #[serde(rename = "category__in")]
    pub category_in: Option<String>,
    pub ordering: Option<String>,
}

/// Body of POST and PUT. Omitted optional fields are empty.
#[derive(Deserialize)]
pub struct ProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub brand: String,
    pub price: Decimal,
    pub stock: i32,
    pub category: CategoryId,
    #[serde(default)]
    pub properties: Properties,
}

/// Body of PATCH. `rating` is not accepted from clients.
#[derive(Deserialize)]
pub struct ProductPatchRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
    pub category: Option<CategoryId>,
    pub properties: Option<Properties>,
}

// -- Response types --

/// Compact product representation for listings and expanded cart lines.
#[derive(Serialize)]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub brand: String,
    pub price: Decimal,
    pub rating: f64,
}

#[derive(Serialize)]
pub struct ProductDetail {
    pub id: ProductId,
    pub name: String,
    pub brand: String,
    pub price: Decimal,
    pub rating: f64,
    pub description: String,
    pub stock: i32,
    pub category: CategoryId,
    pub properties: Properties,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Product> for ProductSummary {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            name: product.name,
            brand: product.brand,
            price: product.price,
            rating: product.rating,
        }
    }
}

impl From<Product> for ProductDetail {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            name: product.name,
            brand: product.brand,
            price: product.price,
            rating: product.rating,
            description: product.description,
            stock: product.stock,
            category: product.category_id,
            properties: product.properties,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

impl ProductRequest {
    fn into_input(self) -> ProductInput {
        ProductInput {
            name: self.name,
            description: self.description,
            brand: self.brand,
            price: self.price,
            stock: self.stock,
            category_id: self.category,
            properties: self.properties,
        }
    }
}

impl ProductListParams {
    fn into_query(self) -> Result<ProductQuery, ApiError> {
        let mut query = ProductQuery::new();
        if let Some(raw) = self.category_in {
            let ids = raw
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| parse_filter_id::<CategoryId>("category__in", part))
                .collect::<Result<Vec<_>, _>>()?;
            query = query.in_categories(ids);
        }
        query.ordering =
            parse_ordering::<ProductSortField>(self.ordering.as_deref().unwrap_or_default());
        Ok(query)
    }
}

// -- Handlers --

/// GET /products?category__in=<id,id>&ordering=-rating,price
#[tracing::instrument(skip(state, params))]
pub async fn list<S: EntityStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AppQuery(params): AppQuery<ProductListParams>,
) -> Result<Json<Vec<ProductSummary>>, ApiError> {
    let products = state.catalog.list_products(params.into_query()?).await?;
    Ok(Json(products.into_iter().map(ProductSummary::from).collect()))
}

/// GET /products/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: EntityStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ProductDetail>, ApiError> {
    let product = state.catalog.get_product(parse_id(&id)?).await?;
    Ok(Json(product.into()))
}

/// POST /products
#[tracing::instrument(skip(state, req))]
pub async fn create<S: EntityStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentActor(actor): CurrentActor,
    AppJson(req): AppJson<ProductRequest>,
) -> Result<(StatusCode, Json<ProductDetail>), ApiError> {
    let product = state
        .catalog
        .create_product(&actor, req.into_input())
        .await?;
    Ok((StatusCode::CREATED, Json(product.into())))
}

/// PUT /products/{id}
#[tracing::instrument(skip(state, req))]
pub async fn replace<S: EntityStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    AppJson(req): AppJson<ProductRequest>,
) -> Result<Json<ProductDetail>, ApiError> {
    let changes = ProductChanges {
        name: Some(req.name),
        description: Some(req.description),
        brand: Some(req.brand),
        price: Some(req.price),
        stock: Some(req.stock),
        category_id: Some(req.category),
        properties: Some(req.properties),
    };
    let product = state
        .catalog
        .update_product(&actor, parse_id(&id)?, changes)
        .await?;
    Ok(Json(product.into()))
}

/// PATCH /products/{id}
#[tracing::instrument(skip(state, req))]
pub async fn update<S: EntityStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    AppJson(req): AppJson<ProductPatchRequest>,
) -> Result<Json<ProductDetail>, ApiError> {
    let changes = ProductChanges {
        name: req.name,
        description: req.description,
        brand: req.brand,
        price: req.price,
        stock: req.stock,
        category_id: req.category,
        properties: req.properties,
    };
    let product = state
        .catalog
        .update_product(&actor, parse_id(&id)?, changes)
        .await?;
    Ok(Json(product.into()))
}

/// DELETE /products/{id}
#[tracing::instrument(skip(state))]
pub async fn delete<S: EntityStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.catalog.delete_product(&actor, parse_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}
