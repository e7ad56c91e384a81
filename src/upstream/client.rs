//! Upstream HTTP client
//!
//! The seam between the retry loop and the network. The loop only sees a
//! status code and a body, so tests can script mirrors without sockets.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Raw answer from one mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: String,
}

impl UpstreamResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Failure below the HTTP status line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("{0}")]
    Other(String),
}

/// Posts an Overpass query to a mirror.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn post_query(
        &self,
        mirror: &str,
        query: &str,
        timeout: Duration,
    ) -> Result<UpstreamResponse, TransportError>;
}

// == Reqwest Client ==
/// Real client backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestUpstream {
    client: reqwest::Client,
}

impl ReqwestUpstream {
    /// Builds the client. Timeouts are applied per request, not here.
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("roads_proxy/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl UpstreamClient for ReqwestUpstream {
    async fn post_query(
        &self,
        mirror: &str,
        query: &str,
        timeout: Duration,
    ) -> Result<UpstreamResponse, TransportError> {
        let response = self
            .client
            .post(mirror)
            .timeout(timeout)
            .body(query.to_string())
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify_reqwest_error)?;

        Ok(UpstreamResponse { status, body })
    }
}

fn classify_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Other(err.to_string())
    }
}
