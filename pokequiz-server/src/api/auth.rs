//! Bearer token extractors
//!
//! [`RequireUser`] rejects requests without a valid token (401).
//! [`MaybeUser`] treats a missing or invalid token as an anonymous caller.

use crate::error::ApiError;
use crate::AppState;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use pokequiz_common::auth::{now_ms, TokenError, UserId};
use tracing::debug;

/// Identified caller
#[derive(Debug, Clone, Copy)]
pub struct RequireUser(pub UserId);

/// Caller identity when a valid token is present
#[derive(Debug, Clone, Copy)]
pub struct MaybeUser(pub Option<UserId>);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn authenticate(parts: &Parts, state: &AppState) -> Result<UserId, ApiError> {
    let token = bearer_token(parts)
        .ok_or_else(|| ApiError::Unauthorized("Authorization header is required".to_string()))?;

    state.signer.verify(token, now_ms()).map_err(|e| match e {
        TokenError::Expired { .. } => ApiError::Unauthorized("Token has expired".to_string()),
        _ => ApiError::Unauthorized("Invalid token".to_string()),
    })
}

#[axum::async_trait]
impl FromRequestParts<AppState> for RequireUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).map(RequireUser)
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if bearer_token(parts).is_none() {
            return Ok(MaybeUser(None));
        }

        match authenticate(parts, state) {
            Ok(user_id) => Ok(MaybeUser(Some(user_id))),
            Err(e) => {
                debug!(error = %e, "Ignoring invalid token on optional-identity route");
                Ok(MaybeUser(None))
            }
        }
    }
}
