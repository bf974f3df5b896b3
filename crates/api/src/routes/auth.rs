//! Registration and token issuance.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use domain::Registration;
use entity_store::EntityStore;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;
use crate::extract::AppJson;

// -- Request types --

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Deserialize)]
pub struct TokenRequest {
    pub email: String,
    pub password: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct RegisterResponse {
    pub name: String,
    pub email: String,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub token: String,
}

// -- Handlers --

/// POST /register
#[tracing::instrument(skip(state, req), fields(email = %req.email))]
pub async fn register<S: EntityStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AppJson(req): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let user = state
        .accounts
        .register(Registration::new(req.email, req.password).with_name(req.name))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            name: user.name,
            email: user.email,
        }),
    ))
}

/// POST /token: exchanges email and password for the user's API token.
#[tracing::instrument(skip(state, req), fields(email = %req.email))]
pub async fn token<S: EntityStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AppJson(req): AppJson<TokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = state.accounts.issue_token(&req.email, &req.password).await?;
    Ok(Json(TokenResponse { token: token.key }))
}
