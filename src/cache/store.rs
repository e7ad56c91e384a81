//! Cache Store Module
//!
//! Map of rounded bounding-box keys to upstream documents, with lazy TTL
//! checks and batch eviction of the oldest half.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::cache::{CacheEntry, CacheKey, CacheStats, StatsCounters};

// == Cache Store ==
/// Road geometry storage with TTL freshness and oldest-half eviction.
///
/// Time is always passed in by the caller; the store never reads a clock.
#[derive(Debug)]
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<CacheKey, CacheEntry>,
    /// Performance statistics
    stats: StatsCounters,
    /// Soft capacity; crossing it triggers eviction
    max_entries: usize,
    /// Freshness window in seconds
    ttl: u64,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore with specified capacity and TTL.
    ///
    /// # Arguments
    /// * `max_entries` - Soft capacity
    /// * `ttl` - Freshness window in seconds
    pub fn new(max_entries: usize, ttl: u64) -> Self {
        Self {
            entries: HashMap::new(),
            stats: StatsCounters::new(),
            max_entries,
            ttl,
        }
    }

    // == Get Fresh ==
    /// Returns the payload if an entry exists and is within TTL.
    ///
    /// Records a hit or a miss. Stale entries stay in place so they can
    /// serve as a fallback. Needs only shared access.
    pub fn get_fresh(&self, key: &CacheKey, now_ms: u64) -> Option<Arc<Value>> {
        match self.entries.get(key) {
            Some(entry) if entry.is_fresh(now_ms, self.ttl) => {
                let payload = entry.payload.clone();
                self.stats.record_hit();
                Some(payload)
            }
            _ => {
                self.stats.record_miss();
                None
            }
        }
    }

    // == Is Fresh ==
    /// Freshness check without touching statistics.
    pub fn is_fresh(&self, key: &CacheKey, now_ms: u64) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| entry.is_fresh(now_ms, self.ttl))
    }

    // == Get Stale ==
    /// Returns whatever is stored for `key`, regardless of age.
    ///
    /// Used after the upstream failed; records a stale hit when found.
    pub fn get_stale(&self, key: &CacheKey) -> Option<Arc<Value>> {
        let payload = self.entries.get(key).map(|entry| entry.payload.clone())?;
        self.stats.record_stale_hit();
        Some(payload)
    }

    // == Peek ==
    /// Read-only access to an entry.
    pub fn peek(&self, key: &CacheKey) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    // == Insert ==
    /// Stores or overwrites an entry, then runs capacity eviction.
    ///
    /// Returns the number of entries evicted.
    pub fn insert(&mut self, key: CacheKey, payload: Arc<Value>, now_ms: u64) -> usize {
        self.entries.insert(key, CacheEntry::new(payload, now_ms));
        self.evict_if_over_capacity()
    }

    // == Evict If Over Capacity ==
    /// Removes the oldest half of the entries once the soft maximum is exceeded.
    ///
    /// Entries are ranked by `stored_at` ascending, ties broken by key so the
    /// victim set is deterministic. Returns the number of entries removed.
    pub fn evict_if_over_capacity(&mut self) -> usize {
        let len = self.entries.len();
        if len <= self.max_entries {
            return 0;
        }

        let mut by_age: Vec<(u64, CacheKey)> = self
            .entries
            .iter()
            .map(|(key, entry)| (entry.stored_at, key.clone()))
            .collect();
        by_age.sort_unstable();

        let victims = (len / 2).max(1);
        for (_, key) in by_age.into_iter().take(victims) {
            self.entries.remove(&key);
        }

        self.stats.record_evictions(victims);
        victims
    }

    // == Clear ==
    /// Replaces the map with an empty one. Returns how many entries it held.
    ///
    /// Counters are kept; they describe the process lifetime.
    pub fn clear(&mut self) -> usize {
        std::mem::take(&mut self.entries).len()
    }

    // == Keys ==
    /// Current keys, sorted for stable output.
    pub fn keys(&self) -> Vec<CacheKey> {
        let mut keys: Vec<CacheKey> = self.entries.keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    pub fn ttl(&self) -> u64 {
        self.ttl
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::BoundingBox;
    use serde_json::json;

    const TTL: u64 = 3600;
    const HOUR_MS: u64 = 3_600_000;

    fn key(i: usize) -> CacheKey {
        BoundingBox::new(i as f64, 0.0, i as f64 + 0.5, 0.5)
            .unwrap()
            .cache_key()
    }

    fn doc(i: usize) -> Arc<Value> {
        Arc::new(json!({"elements": [i]}))
    }

    #[test]
    fn test_store_new() {
        let store = CacheStore::new(100, TTL);
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.ttl(), TTL);
        assert_eq!(store.max_entries(), 100);
    }

    #[test]
    fn test_store_insert_and_get_fresh() {
        let mut store = CacheStore::new(100, TTL);

        store.insert(key(1), doc(1), 0);
        let payload = store.get_fresh(&key(1), 1_000).unwrap();

        assert_eq!(*payload, json!({"elements": [1]}));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_get_fresh_nonexistent() {
        let store = CacheStore::new(100, TTL);
        assert!(store.get_fresh(&key(1), 0).is_none());
        assert_eq!(store.stats().misses, 1);
    }

    #[test]
    fn test_store_expired_entry_kept_for_fallback() {
        let mut store = CacheStore::new(100, TTL);
        store.insert(key(1), doc(1), 0);

        assert!(store.get_fresh(&key(1), HOUR_MS).is_none());
        assert_eq!(store.len(), 1);

        let stale = store.get_stale(&key(1)).unwrap();
        assert_eq!(*stale, json!({"elements": [1]}));
        assert_eq!(store.stats().stale_hits, 1);
    }

    #[test]
    fn test_store_get_stale_missing() {
        let store = CacheStore::new(100, TTL);
        assert!(store.get_stale(&key(9)).is_none());
        assert_eq!(store.stats().stale_hits, 0);
    }

    #[test]
    fn test_store_overwrite_refreshes_timestamp() {
        let mut store = CacheStore::new(100, TTL);

        store.insert(key(1), doc(1), 0);
        store.insert(key(1), doc(2), HOUR_MS);

        assert_eq!(store.len(), 1);
        assert_eq!(store.peek(&key(1)).unwrap().stored_at, HOUR_MS);
        let payload = store.get_fresh(&key(1), HOUR_MS + 1).unwrap();
        assert_eq!(*payload, json!({"elements": [2]}));
    }

    #[test]
    fn test_is_fresh_does_not_touch_stats() {
        let mut store = CacheStore::new(100, TTL);
        store.insert(key(1), doc(1), 0);

        assert!(store.is_fresh(&key(1), 10));
        assert!(!store.is_fresh(&key(2), 10));
        let stats = store.stats();
        assert_eq!(stats.hits + stats.misses, 0);
    }

    #[test]
    fn test_eviction_removes_oldest_half() {
        let mut store = CacheStore::new(100, TTL);

        for i in 0..100 {
            assert_eq!(store.insert(key(i), doc(i), i as u64), 0);
        }
        let evicted = store.insert(key(100), doc(100), 100);

        assert_eq!(evicted, 50);
        assert_eq!(store.len(), 51);
        for i in 0..50 {
            assert!(store.peek(&key(i)).is_none(), "key {} should be evicted", i);
        }
        for i in 50..=100 {
            assert!(store.peek(&key(i)).is_some(), "key {} should remain", i);
        }
        assert_eq!(store.stats().evictions, 50);
    }

    #[test]
    fn test_overwrite_at_capacity_does_not_evict() {
        let mut store = CacheStore::new(3, TTL);
        for i in 0..3 {
            store.insert(key(i), doc(i), i as u64);
        }
        assert_eq!(store.insert(key(0), doc(0), 10), 0);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_clear() {
        let mut store = CacheStore::new(100, TTL);
        store.insert(key(1), doc(1), 0);
        store.insert(key(2), doc(2), 0);

        assert_eq!(store.clear(), 2);
        assert!(store.is_empty());
        assert!(store.keys().is_empty());
    }

    #[test]
    fn test_keys_sorted() {
        let mut store = CacheStore::new(100, TTL);
        for i in 0..5 {
            store.insert(key(i), doc(i), 0);
        }
        let keys = store.keys();
        assert_eq!(keys.len(), 5);
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
    }
}
