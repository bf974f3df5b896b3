//! Request extractors: the calling actor, and JSON/query wrappers whose
//! rejections render as [`ApiError`].

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{FromRequest, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use domain::Actor;
use entity_store::EntityStore;

use crate::AppState;
use crate::error::ApiError;

/// The caller, resolved from an `Authorization: Token <key>` header.
///
/// `Bearer` is accepted as an alias for `Token`. Requests without the header,
/// or with another scheme, are anonymous; a malformed or unknown token is
/// rejected with 401.
#[derive(Debug, Clone, Copy)]
pub struct CurrentActor(pub Actor);

impl<S> FromRequestParts<Arc<AppState<S>>> for CurrentActor
where
    S: EntityStore + Clone + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let Some(header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(Self(Actor::Anonymous));
        };
        let header = header.to_str().map_err(|_| {
            ApiError::Unauthorized(
                "Invalid token header. Token string should not contain invalid characters"
                    .to_string(),
            )
        })?;

        match token_key(header)? {
            Some(key) => Ok(Self(state.accounts.authenticate(key).await?)),
            None => Ok(Self(Actor::Anonymous)),
        }
    }
}

fn token_key(header: &str) -> Result<Option<&str>, ApiError> {
    let mut words = header.split_whitespace();
    let Some(scheme) = words.next() else {
        return Ok(None);
    };
    if !scheme.eq_ignore_ascii_case("token") && !scheme.eq_ignore_ascii_case("bearer") {
        return Ok(None);
    }

    match (words.next(), words.next()) {
        (Some(key), None) => Ok(Some(key)),
        (None, _) => Err(ApiError::Unauthorized(
            "Invalid token header. No credentials provided".to_string(),
        )),
        (Some(_), Some(_)) => Err(ApiError::Unauthorized(
            "Invalid token header. Token string should not contain spaces".to_string(),
        )),
    }
}

/// JSON body extractor; malformed bodies and missing fields answer 400.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

/// Query string extractor with the same error rendering as [`AppJson`].
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct AppQuery<T>(pub T);

/// Parses an id taken from the path. An id that cannot exist is simply not
/// found.
pub fn parse_id<T: FromStr>(raw: &str) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::NotFound("Not found".to_string()))
}

/// Parses an id taken from a query filter.
pub fn parse_filter_id<T: FromStr>(name: &str, raw: &str) -> Result<T, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("{name}: Enter a valid id")))
}
