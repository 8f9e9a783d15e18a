//! Owner authentication
//!
//! Every `/api/v1` request carries `Authorization: Bearer <api key>`. The
//! key is looked up in the owners table and the matching [`Owner`] is placed
//! in the request extensions for the handlers.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use netarchive_common::db::{owners, Owner};
use tracing::warn;

use crate::error::ApiError;
use crate::AppState;

/// API key from an `Authorization` header value
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Authentication middleware
///
/// Returns 401 Unauthorized unless the request names a known API key.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer API key".to_string()))?;

    let key = bearer_token(header)
        .ok_or_else(|| ApiError::Unauthorized("Malformed Authorization header".to_string()))?
        .to_string();

    let owner: Owner = match owners::owner_by_api_key(&state.db, &key).await? {
        Some(owner) => owner,
        None => {
            warn!(path = %request.uri().path(), "Rejected unknown API key");
            return Err(ApiError::Unauthorized("Unknown API key".to_string()));
        }
    };

    request.extensions_mut().insert(owner);
    Ok(next.run(request).await)
}
