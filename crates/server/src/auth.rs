//! Bearer-token identity. Tokens are HS256 JWTs minted by the external
//! identity provider; `sub` carries the user id.

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
}

pub fn verify_token(token: &str, key: &DecodingKey) -> Result<AuthUser, ApiError> {
    let data = decode::<Claims>(token, key, &Validation::new(Algorithm::HS256)).map_err(|e| {
        debug!(error = %e, "Rejected bearer token");
        ApiError::Unauthorized
    })?;
    Ok(AuthUser {
        user_id: data.claims.sub,
    })
}

/// `Ok(None)` only when no Authorization header was sent at all. A header that
/// is present but malformed or carries a bad token is always rejected.
fn authenticate(parts: &Parts, state: &AppState) -> Result<Option<AuthUser>, ApiError> {
    if !parts.headers.contains_key(AUTHORIZATION) {
        return Ok(None);
    }
    let Authorization(bearer) = parts
        .headers
        .typed_get::<Authorization<Bearer>>()
        .ok_or(ApiError::Unauthorized)?;
    verify_token(bearer.token(), state.jwt_key()).map(Some)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authenticate(parts, state)?.ok_or(ApiError::Unauthorized)
    }
}

impl OptionalFromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        authenticate(parts, state)
    }
}
