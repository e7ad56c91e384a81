//! Mirror rotation
//!
//! Single-attempt classification and the round-robin retry loop over the
//! configured Overpass mirrors.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::Value;
use tracing::{error, info, warn};

use super::client::{TransportError, UpstreamClient};
use crate::error::{ProxyError, UpstreamError};

// == Mirror Pool ==
/// Ordered, non-empty list of mirrors plus the rotating start offset.
#[derive(Debug)]
pub struct MirrorPool {
    mirrors: Vec<String>,
    cursor: AtomicUsize,
}

impl MirrorPool {
    pub fn new(mirrors: Vec<String>) -> Result<Self, ProxyError> {
        if mirrors.is_empty() {
            return Err(ProxyError::Configuration(
                "at least one upstream mirror is required".to_string(),
            ));
        }
        Ok(Self {
            mirrors,
            cursor: AtomicUsize::new(0),
        })
    }

    pub fn len(&self) -> usize {
        self.mirrors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mirrors.is_empty()
    }

    /// First configured mirror, used by warm-up.
    pub fn primary(&self) -> &str {
        &self.mirrors[0]
    }

    /// Every mirror exactly once, starting one past where the previous
    /// rotation started.
    pub fn rotation(&self) -> impl Iterator<Item = &str> + '_ {
        let n = self.mirrors.len();
        let start = self.cursor.fetch_add(1, Ordering::Relaxed) % n;
        (0..n).map(move |i| self.mirrors[(start + i) % n].as_str())
    }
}

// == Retry Policy ==
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Bound on one attempt, connection through body
    pub attempt_timeout: Duration,
    /// Pause after a 429 when another mirror remains
    pub rate_limit_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(90),
            rate_limit_backoff: Duration::from_secs(1),
        }
    }
}

// == Single Attempt ==
/// Sends one query to one mirror and classifies the outcome.
///
/// The timeout is enforced here as well as handed to the client, so a client
/// that ignores it still cannot stall the loop.
pub async fn attempt(
    client: &dyn UpstreamClient,
    mirror: &str,
    query: &str,
    timeout: Duration,
) -> Result<Value, UpstreamError> {
    let sent = tokio::time::timeout(timeout, client.post_query(mirror, query, timeout)).await;

    let response = match sent {
        Err(_) | Ok(Err(TransportError::Timeout)) => {
            return Err(UpstreamError::Timeout(mirror.to_string()))
        }
        Ok(Err(TransportError::Other(reason))) => {
            return Err(UpstreamError::Transport {
                mirror: mirror.to_string(),
                reason,
            })
        }
        Ok(Ok(response)) => response,
    };

    match response.status {
        200 => serde_json::from_str(&response.body).map_err(|e| {
            let preview: String = response.body.chars().take(200).collect();
            error!("Invalid JSON from {} ({}): {}", mirror, e, preview);
            UpstreamError::Malformed(mirror.to_string())
        }),
        429 => Err(UpstreamError::RateLimited(mirror.to_string())),
        504 => Err(UpstreamError::GatewayTimeout(mirror.to_string())),
        status => Err(UpstreamError::Rejected {
            mirror: mirror.to_string(),
            status,
        }),
    }
}

// == Rotation Loop ==
/// Tries each mirror at most once, in rotation order.
///
/// Rate limits, timeouts, malformed bodies and transport errors move on to
/// the next mirror. Any other status ends the loop immediately. When every
/// mirror has failed the last failure is returned.
pub async fn fetch_with_rotation(
    client: &dyn UpstreamClient,
    pool: &MirrorPool,
    query: &str,
    policy: &RetryPolicy,
) -> Result<Value, UpstreamError> {
    let total = pool.len();
    let mut last_error = None;

    for (index, mirror) in pool.rotation().enumerate() {
        let is_last = index + 1 == total;
        info!("Querying {} (attempt {}/{})", mirror, index + 1, total);

        let err = match attempt(client, mirror, query, policy.attempt_timeout).await {
            Ok(document) => return Ok(document),
            Err(err) => err,
        };

        match &err {
            UpstreamError::Rejected { status, .. } => {
                error!("Overpass API error {} from {}, giving up", status, mirror);
                return Err(err);
            }
            UpstreamError::RateLimited(_) => {
                warn!("Rate limit on {}", mirror);
                if !is_last && !policy.rate_limit_backoff.is_zero() {
                    tokio::time::sleep(policy.rate_limit_backoff).await;
                }
            }
            UpstreamError::Timeout(_) => warn!("Timeout on {}", mirror),
            UpstreamError::GatewayTimeout(_) => warn!("Gateway timeout (504) from {}", mirror),
            UpstreamError::Transport { reason, .. } => {
                warn!("Request to {} failed: {}", mirror, reason)
            }
            UpstreamError::Malformed(_) => {}
        }

        last_error = Some(err);
    }

    // The pool is never empty, so at least one attempt ran
    Err(last_error.unwrap_or_else(|| UpstreamError::Transport {
        mirror: String::new(),
        reason: "no mirrors configured".to_string(),
    }))
}
