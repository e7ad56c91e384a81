//! Configuration Module
//!
//! Handles loading and managing proxy configuration from environment variables.

use std::env;
use std::str::FromStr;

/// Overpass interpreters tried in order when `OVERPASS_MIRRORS` is unset.
pub const DEFAULT_MIRRORS: [&str; 3] = [
    "https://overpass-api.de/api/interpreter",
    "https://overpass.kumi.systems/api/interpreter",
    "https://overpass.openstreetmap.ru/api/interpreter",
];

/// Proxy configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Seconds an entry stays fresh
    pub cache_ttl: u64,
    /// Soft capacity; exceeding it evicts the oldest half
    pub max_entries: usize,
    /// Ordered list of upstream interpreter URLs
    pub mirrors: Vec<String>,
    /// Per-attempt upstream timeout in seconds
    pub upstream_timeout: u64,
    /// Pause after a 429 before moving to the next mirror, in milliseconds
    pub rate_limit_backoff_ms: u64,
    /// Seconds between scheduled warm-ups, 0 disables the task
    pub warmup_interval: u64,
    /// Number of cities (largest first) covered by a warm-up
    pub warmup_city_limit: usize,
    /// Degrees added around a city's shop bounds
    pub warmup_buffer_deg: f64,
    /// Optional JSON file with pre-aggregated city bounds
    pub city_bounds_file: Option<String>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 5000)
    /// - `CACHE_TTL` - Freshness window in seconds (default: 3600)
    /// - `MAX_ENTRIES` - Soft cache capacity (default: 100)
    /// - `OVERPASS_MIRRORS` - Comma-separated mirror URLs (default: three public mirrors)
    /// - `UPSTREAM_TIMEOUT` - Per-attempt timeout in seconds (default: 90)
    /// - `RATE_LIMIT_BACKOFF_MS` - Pause after a 429 (default: 1000)
    /// - `WARMUP_INTERVAL` - Scheduled warm-up period in seconds (default: 0, disabled)
    /// - `WARMUP_CITY_LIMIT` - Cities per warm-up (default: 5)
    /// - `WARMUP_BUFFER_DEG` - Buffer around city bounds (default: 0.27, ~30km)
    /// - `CITY_BOUNDS_FILE` - JSON file of city bounds (default: unset)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let mirrors = env::var("OVERPASS_MIRRORS")
            .ok()
            .map(|v| parse_mirror_list(&v))
            .filter(|list| !list.is_empty())
            .unwrap_or(defaults.mirrors);

        Self {
            server_port: env_or("SERVER_PORT", defaults.server_port),
            cache_ttl: env_or("CACHE_TTL", defaults.cache_ttl),
            max_entries: env_or("MAX_ENTRIES", defaults.max_entries),
            mirrors,
            upstream_timeout: env_or("UPSTREAM_TIMEOUT", defaults.upstream_timeout),
            rate_limit_backoff_ms: env_or("RATE_LIMIT_BACKOFF_MS", defaults.rate_limit_backoff_ms),
            warmup_interval: env_or("WARMUP_INTERVAL", defaults.warmup_interval),
            warmup_city_limit: env_or("WARMUP_CITY_LIMIT", defaults.warmup_city_limit),
            warmup_buffer_deg: env_or("WARMUP_BUFFER_DEG", defaults.warmup_buffer_deg),
            city_bounds_file: env::var("CITY_BOUNDS_FILE")
                .ok()
                .filter(|v| !v.trim().is_empty()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 5000,
            cache_ttl: 3600,
            max_entries: 100,
            mirrors: DEFAULT_MIRRORS.iter().map(|m| m.to_string()).collect(),
            upstream_timeout: 90,
            rate_limit_backoff_ms: 1000,
            warmup_interval: 0,
            warmup_city_limit: 5,
            warmup_buffer_deg: 0.27,
            city_bounds_file: None,
        }
    }
}

/// Reads and parses an env var, falling back on absence or parse failure.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Splits a comma-separated mirror list, dropping blanks.
pub fn parse_mirror_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(String::from)
        .collect()
}
