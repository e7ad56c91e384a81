//! Roads Proxy - A caching proxy for the Overpass API
//!
//! Deduplicates nearby bounding-box queries, rotates across mirrors, and
//! serves stale road geometry when every mirror is down.

pub mod api;
pub mod cache;
pub mod config;
pub mod directory;
pub mod error;
pub mod models;
pub mod roads;
pub mod tasks;
pub mod upstream;

pub use api::AppState;
pub use config::Config;
pub use roads::RoadQueryCache;
pub use tasks::spawn_warmup_task;
