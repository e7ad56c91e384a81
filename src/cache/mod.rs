//! Cache Module
//!
//! In-memory road geometry cache keyed by rounded bounding box, with lazy TTL
//! checks and oldest-half eviction.

mod clock;
mod entry;
mod key;
mod stats;
mod store;


// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::{element_count, CacheEntry};
pub use key::{BoundingBox, CacheKey, KEY_PRECISION};
pub use stats::{CacheStats, StatsCounters};
pub use store::CacheStore;
