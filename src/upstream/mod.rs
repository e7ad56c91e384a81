//! Upstream Module
//!
//! Talking to the Overpass mirrors: the HTTP client seam and the rotation
//! loop that classifies each answer.

mod client;
mod mirrors;

pub use client::{ReqwestUpstream, TransportError, UpstreamClient, UpstreamResponse};
pub use mirrors::{attempt, fetch_with_rotation, MirrorPool, RetryPolicy};
