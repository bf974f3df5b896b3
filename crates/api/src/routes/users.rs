//! Public user directory and the caller's own profile (`/me`).

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::UserId;
use domain::{AddressPatch, ProfileChanges};
use entity_store::{Address, EntityStore, User, UserQuery, UserSortField, parse_ordering};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;
use crate::extract::{AppJson, AppQuery, CurrentActor, parse_id};

// -- Request types --

#[derive(Deserialize)]
pub struct UserListParams {
    pub ordering: Option<String>,
}

/// Address as sent by clients. `{}` clears the stored address.
#[derive(Debug, Default, Deserialize)]
pub struct AddressBody {
    pub country: Option<String>,
    pub city: Option<String>,
    pub street: Option<String>,
    pub house: Option<i32>,
    pub postal_code: Option<String>,
}

impl From<AddressBody> for AddressPatch {
    fn from(body: AddressBody) -> Self {
        AddressPatch {
            country: body.country,
            city: body.city,
            street: body.street,
            house: body.house,
            postal_code: body.postal_code,
        }
    }
}

/// PUT /me body. Email and password are required.
#[derive(Deserialize)]
pub struct ProfileReplaceRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub address: Option<AddressBody>,
}

/// PATCH /me body.
#[derive(Deserialize)]
pub struct ProfilePatchRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub address: Option<AddressBody>,
}

// -- Response types --

#[derive(Serialize)]
pub struct AddressResponse {
    pub country: String,
    pub city: String,
    pub street: String,
    pub house: i32,
    pub postal_code: String,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub surname: String,
    pub address: Option<AddressResponse>,
}

impl From<Address> for AddressResponse {
    fn from(address: Address) -> Self {
        Self {
            country: address.country,
            city: address.city,
            street: address.street,
            house: address.house,
            postal_code: address.postal_code,
        }
    }
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            surname: user.surname,
            address: user.address.map(AddressResponse::from),
        }
    }
}

// -- Handlers --

/// GET /users?ordering=-created_at
#[tracing::instrument(skip(state, params))]
pub async fn list<S: EntityStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    AppQuery(params): AppQuery<UserListParams>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let query = UserQuery {
        ordering: parse_ordering::<UserSortField>(params.ordering.as_deref().unwrap_or_default()),
    };
    let users = state.accounts.list_users(query).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// GET /users/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: EntityStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.accounts.get_user(parse_id(&id)?).await?;
    Ok(Json(user.into()))
}

/// GET /me
#[tracing::instrument(skip(state))]
pub async fn me<S: EntityStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.accounts.profile(&actor).await?;
    Ok(Json(user.into()))
}

/// PUT /me
#[tracing::instrument(skip(state, req))]
pub async fn replace_me<S: EntityStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentActor(actor): CurrentActor,
    AppJson(req): AppJson<ProfileReplaceRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let changes = ProfileChanges {
        email: Some(req.email),
        name: req.name,
        surname: req.surname,
        password: Some(req.password),
        address: req.address.map(AddressPatch::from),
    };
    let user = state.accounts.update_profile(&actor, changes).await?;
    Ok(Json(user.into()))
}

/// PATCH /me
#[tracing::instrument(skip(state, req))]
pub async fn update_me<S: EntityStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentActor(actor): CurrentActor,
    AppJson(req): AppJson<ProfilePatchRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let changes = ProfileChanges {
        email: req.email,
        name: req.name,
        surname: req.surname,
        password: req.password,
        address: req.address.map(AddressPatch::from),
    };
    let user = state.accounts.update_profile(&actor, changes).await?;
    Ok(Json(user.into()))
}

/// DELETE /me
#[tracing::instrument(skip(state))]
pub async fn delete_me<S: EntityStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CurrentActor(actor): CurrentActor,
) -> Result<StatusCode, ApiError> {
    state.accounts.delete_profile(&actor).await?;
    Ok(StatusCode::NO_CONTENT)
}
