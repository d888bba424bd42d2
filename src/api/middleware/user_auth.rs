//! User authentication middleware using JWT tokens

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::domain::user::User;

const NO_TOKEN: &str = "No token";
const INVALID_TOKEN: &str = "Invalid token";

/// Extractor that requires a valid JWT token
///
/// Extracts the JWT token from:
/// - Authorization header: `Bearer <jwt_token>`
///
/// A token whose subject no longer resolves to a user is treated as invalid.
#[derive(Debug, Clone)]
pub struct RequireUser(pub User);

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_jwt_token(&parts.headers)?;

        debug!("Validating JWT token");

        let claims = state.jwt_service.validate(&token).map_err(|e| {
            debug!(error = %e, "Rejected JWT");
            ApiError::unauthorized(INVALID_TOKEN)
        })?;

        let user = state
            .user_service
            .get(claims.user_id())
            .await?
            .ok_or_else(|| ApiError::unauthorized(INVALID_TOKEN))?;

        Ok(RequireUser(user))
    }
}

/// Extract JWT token from Authorization header
pub fn extract_jwt_token(headers: &axum::http::HeaderMap) -> Result<String, ApiError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    match token {
        Some(token) => Ok(token.to_string()),
        None => Err(ApiError::unauthorized(NO_TOKEN)),
    }
}
