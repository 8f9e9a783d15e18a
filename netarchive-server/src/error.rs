//! API error type
//!
//! Every failed request answers with the API version, the canonical reason
//! for its status code and a human-readable message.

use crate::api::API_VERSION;
use crate::archive::ArchiveError;
use crate::query::ConfigurationError;
use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed request (400)
    #[error("{0}")]
    BadRequest(String),

    /// Missing or unknown API key (401)
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated, but not allowed (403)
    #[error("{0}")]
    Forbidden(String),

    /// Unknown resource (404)
    #[error("{0}")]
    NotFound(String),

    /// Well-formed upload that cannot be processed (422)
    #[error("{0}")]
    Unprocessable(String),

    /// Internal server error (500)
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let body = Json(json!({
            "_version": API_VERSION,
            "error": status.canonical_reason().unwrap_or("Error"),
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}

impl From<ConfigurationError> for ApiError {
    fn from(e: ConfigurationError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<netarchive_common::Error> for ApiError {
    fn from(e: netarchive_common::Error) -> Self {
        use netarchive_common::Error;
        match e {
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ArchiveError> for ApiError {
    fn from(e: ArchiveError) -> Self {
        match e {
            ArchiveError::UnacceptableFile(_) => ApiError::BadRequest(e.to_string()),
            ArchiveError::NotFound(_) => ApiError::NotFound(e.to_string()),
            ArchiveError::NotOwner(_) => ApiError::Forbidden(e.to_string()),
            ArchiveError::Load { .. } => ApiError::Unprocessable(e.to_string()),
            ArchiveError::Store(e) => e.into(),
            ArchiveError::Io(_) | ArchiveError::Task(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::BadRequest(e.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(e: PathRejection) -> Self {
        ApiError::BadRequest(e.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        ApiError::BadRequest(format!("Malformed upload: {}", e))
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
