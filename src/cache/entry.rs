//! Cache Entry Module
//!
//! Defines the structure for individual cached upstream documents.

use std::sync::Arc;

use serde_json::Value;

// == Cache Entry ==
/// An upstream JSON document and the moment it was stored.
///
/// Entries are never mutated; a refresh replaces the whole entry. The payload
/// sits behind an `Arc` so handing it to a response does not copy the geometry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The upstream document, passed through verbatim
    pub payload: Arc<Value>,
    /// Store timestamp (Unix milliseconds)
    pub stored_at: u64,
}

impl CacheEntry {
    // == Constructor ==
    pub fn new(payload: Arc<Value>, stored_at: u64) -> Self {
        Self { payload, stored_at }
    }

    // == Age ==
    /// Milliseconds since the entry was stored, zero if `now_ms` is earlier.
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.stored_at)
    }

    // == Is Fresh ==
    /// Checks whether the entry is still within its TTL.
    ///
    /// Boundary condition: an entry stored at T is fresh strictly before
    /// T + TTL and stale from T + TTL onwards.
    pub fn is_fresh(&self, now_ms: u64, ttl_secs: u64) -> bool {
        self.age_ms(now_ms) < ttl_secs.saturating_mul(1000)
    }
}

/// Counts the `elements` array of an Overpass document, 0 when absent.
pub fn element_count(payload: &Value) -> usize {
    payload
        .get("elements")
        .and_then(Value::as_array)
        .map_or(0, Vec::len)
}
