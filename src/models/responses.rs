//! Response DTOs for the roads proxy API
//!
//! Defines the structure of outgoing HTTP response bodies. Road documents
//! themselves are passed through untouched and have no DTO.

use serde::Serialize;
use serde_json::{json, Value};

use crate::roads::{CacheSnapshot, WarmupReport};

/// Response body for `GET /api/roads`
#[derive(Debug, Clone, Serialize)]
pub struct RoadsInfoResponse {
    pub status: String,
    pub endpoint: String,
    pub method: String,
    pub description: String,
    pub cache_size: usize,
    pub cache_ttl: String,
    pub example: Value,
}

impl RoadsInfoResponse {
    pub fn new(cache_size: usize, cache_ttl: u64) -> Self {
        Self {
            status: "ok".to_string(),
            endpoint: "/api/roads".to_string(),
            method: "POST".to_string(),
            description: "Caching proxy for the Overpass API".to_string(),
            cache_size,
            cache_ttl: format!("{} seconds", cache_ttl),
            example: json!({
                "method": "POST",
                "headers": {"Content-Type": "application/json"},
                "body": {
                    "bbox": "57.1,65.5,57.2,65.6",
                    "query": "[out:json][timeout:25];(way[\"highway\"](57.1,65.5,57.2,65.6));out geom;"
                }
            }),
        }
    }
}

/// Response body for `GET /api/roads/cache/stats`
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatsResponse {
    pub cache_size: usize,
    pub cache_ttl: u64,
    pub cached_areas: Vec<String>,
    pub hits: u64,
    pub misses: u64,
    pub stale_hits: u64,
    pub evictions: u64,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<CacheSnapshot> for CacheStatsResponse {
    fn from(snapshot: CacheSnapshot) -> Self {
        Self {
            cache_size: snapshot.size,
            cache_ttl: snapshot.ttl,
            cached_areas: snapshot.keys.iter().map(ToString::to_string).collect(),
            hits: snapshot.counters.hits,
            misses: snapshot.counters.misses,
            stale_hits: snapshot.counters.stale_hits,
            evictions: snapshot.counters.evictions,
            hit_rate: snapshot.counters.hit_rate(),
        }
    }
}

/// Response body for `POST /api/roads/cache/clear`
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub success: bool,
    pub message: String,
}

impl ClearResponse {
    pub fn cleared() -> Self {
        Self {
            success: true,
            message: "Cache cleared".to_string(),
        }
    }
}

/// Response body for `POST /api/roads/warmup`
#[derive(Debug, Clone, Serialize)]
pub struct WarmupResponse {
    pub success: bool,
    pub warmed_cities: Vec<String>,
    pub cache_size: usize,
}

impl From<&WarmupReport> for WarmupResponse {
    fn from(report: &WarmupReport) -> Self {
        Self {
            success: true,
            warmed_cities: report.lines(),
            cache_size: report.cache_size,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
