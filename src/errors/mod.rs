/// Unified error handling module
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::warn;

/// Unified error response format
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Transport failure talking to the buoy API
    #[error("External API error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("Fetch failed for {endpoint}: HTTP {status}")]
    Status { endpoint: String, status: u16 },

    /// Upstream could not be reached
    #[error("Upstream unavailable: {0}")]
    Unavailable(String),

    /// Upstream payload did not match the expected schema
    #[error("Malformed payload from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Map unavailable: {0}")]
    MapUnavailable(String),
}

impl ApiError {
    /// HTTP status reported by the upstream, when there was one
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::Http(_) | ApiError::Unavailable(_) | ApiError::Decode { .. } => {
                (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR")
            }
            ApiError::Status { status, .. } => (
                StatusCode::BAD_GATEWAY,
                match status {
                    403 => "UPSTREAM_403",
                    404 => "UPSTREAM_404",
                    429 => "UPSTREAM_429",
                    500..=599 => "UPSTREAM_5XX",
                    _ => "UPSTREAM_ERROR",
                },
            ),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            ApiError::MapUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "MAP_UNAVAILABLE"),
        };
        if status == StatusCode::BAD_GATEWAY {
            warn!(error = %self, "upstream failure passed to client");
        }

        let error_response = ErrorResponse {
            ok: false,
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
            },
        };

        (status, Json(error_response)).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
