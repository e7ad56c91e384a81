//! Error types for the roads proxy
//!
//! Provides unified error handling using thiserror.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Upstream Error Enum ==
/// Classification of a failed upstream fetch.
///
/// These never reach the HTTP caller directly. They are absorbed by mirror
/// rotation or stale fallback, and otherwise travel as the cause of
/// [`ProxyError::NoDataAvailable`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    /// Mirror answered 429
    #[error("Rate limited by {0}")]
    RateLimited(String),

    /// The attempt ran past its timeout
    #[error("Timeout from {0}")]
    Timeout(String),

    /// Mirror answered 504
    #[error("Gateway timeout from {0}")]
    GatewayTimeout(String),

    /// Mirror answered 200 with a body that is not JSON
    #[error("Invalid JSON from {0}")]
    Malformed(String),

    /// Mirror answered with a non-retryable status
    #[error("Overpass error: {status} from {mirror}")]
    Rejected { mirror: String, status: u16 },

    /// Connection-level failure other than a timeout
    #[error("Request to {mirror} failed: {reason}")]
    Transport { mirror: String, reason: String },
}

impl UpstreamError {
    // == Status Code ==
    /// HTTP status reported to the caller when this is the final cause.
    pub fn status_code(&self) -> StatusCode {
        match self {
            UpstreamError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            UpstreamError::Timeout(_) | UpstreamError::GatewayTimeout(_) => {
                StatusCode::GATEWAY_TIMEOUT
            }
            UpstreamError::Malformed(_)
            | UpstreamError::Rejected { .. }
            | UpstreamError::Transport { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

// == Proxy Error Enum ==
/// Unified error type for the roads proxy.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Missing or unparseable bbox / query
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Every mirror failed and nothing was cached for the region
    #[error("No data available: {0}")]
    NoDataAvailable(#[source] UpstreamError),

    /// Startup or wiring problem (empty mirror list, bad directory file)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ProxyError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ProxyError::NoDataAvailable(cause) => (cause.status_code(), cause.to_string()),
            ProxyError::Configuration(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            ProxyError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(ErrorResponse::new(message));

        (status, body).into_response()
    }
}

// == Rejection Conversion ==
/// Request bodies that fail to deserialize are reported like any other
/// invalid request, as a JSON error body with status 400.
impl From<JsonRejection> for ProxyError {
    fn from(rejection: JsonRejection) -> Self {
        ProxyError::InvalidRequest(rejection.body_text())
    }
}

// == Result Type Alias ==
/// Convenience Result type for the roads proxy.
pub type Result<T> = std::result::Result<T, ProxyError>;
