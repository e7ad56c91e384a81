//! Roads Module
//!
//! The road query cache and its out-of-band warm-up.

mod query_cache;
pub mod warmup;

pub use query_cache::{CacheSnapshot, DataSource, RoadData, RoadQueryCache};
pub use warmup::{
    road_query, targets_from_directory, WarmupEntry, WarmupOutcome, WarmupReport, WarmupSettings,
    WarmupTarget,
};
