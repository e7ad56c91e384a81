//! Road Query Cache
//!
//! Answers "road geometry for this bounding box" from the cache when fresh,
//! from the mirrors otherwise, and from a stale entry when every mirror fails.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::cache::{element_count, BoundingBox, CacheKey, CacheStats, CacheStore, Clock, SystemClock};
use crate::config::Config;
use crate::error::{ProxyError, Result};
use crate::roads::warmup::{WarmupOutcome, WarmupReport, WarmupTarget};
use crate::upstream::{attempt, fetch_with_rotation, MirrorPool, RetryPolicy, UpstreamClient};

// == Data Source ==
/// Where a fetch result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    /// Fresh cache entry, no network
    Cache,
    /// Just fetched from a mirror
    Upstream,
    /// Expired entry served because every mirror failed
    Stale,
}

impl DataSource {
    /// Value of the `X-Cache` response header.
    pub fn as_header(&self) -> &'static str {
        match self {
            DataSource::Cache => "HIT",
            DataSource::Upstream => "MISS",
            DataSource::Stale => "STALE",
        }
    }
}

/// Result of [`RoadQueryCache::fetch`].
#[derive(Debug, Clone)]
pub struct RoadData {
    pub payload: Arc<Value>,
    pub source: DataSource,
}

/// Read-only view returned by [`RoadQueryCache::stats`].
#[derive(Debug, Clone, Serialize)]
pub struct CacheSnapshot {
    pub size: usize,
    pub ttl: u64,
    pub keys: Vec<CacheKey>,
    pub counters: CacheStats,
}

// == Road Query Cache ==
/// Caching front for the Overpass mirrors.
///
/// The store lock is never held across an upstream call. Concurrent misses
/// on one key each go upstream and the last write wins.
pub struct RoadQueryCache {
    store: RwLock<CacheStore>,
    upstream: Arc<dyn UpstreamClient>,
    mirrors: MirrorPool,
    policy: RetryPolicy,
    clock: Arc<dyn Clock>,
}

impl RoadQueryCache {
    // == Constructor ==
    pub fn new(
        store: CacheStore,
        upstream: Arc<dyn UpstreamClient>,
        mirrors: MirrorPool,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            store: RwLock::new(store),
            upstream,
            mirrors,
            policy,
            clock: Arc::new(SystemClock),
        }
    }

    /// Wires a cache from configuration.
    pub fn from_config(config: &Config, upstream: Arc<dyn UpstreamClient>) -> Result<Self> {
        let mirrors = MirrorPool::new(config.mirrors.clone())?;
        let policy = RetryPolicy {
            attempt_timeout: std::time::Duration::from_secs(config.upstream_timeout),
            rate_limit_backoff: std::time::Duration::from_millis(config.rate_limit_backoff_ms),
        };
        let store = CacheStore::new(config.max_entries, config.cache_ttl);
        Ok(Self::new(store, upstream, mirrors, policy))
    }

    /// Replaces the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    // == Fetch ==
    /// Returns road geometry for `bbox`, going upstream with `query` when the
    /// cached copy is missing or expired.
    ///
    /// Fails only with `InvalidRequest` (blank query) or `NoDataAvailable`
    /// (every mirror failed and nothing is cached for the key).
    pub async fn fetch(&self, bbox: &BoundingBox, query: &str) -> Result<RoadData> {
        if query.trim().is_empty() {
            return Err(ProxyError::InvalidRequest("bbox and query required".to_string()));
        }

        let key = bbox.cache_key();

        if let Some(payload) = self.store.read().await.get_fresh(&key, self.clock.now_ms()) {
            debug!("Roads from fresh cache: {}", key);
            return Ok(RoadData {
                payload,
                source: DataSource::Cache,
            });
        }

        info!("Fetching roads for {} from upstream", bbox);
        match fetch_with_rotation(self.upstream.as_ref(), &self.mirrors, query, &self.policy).await {
            Ok(document) => {
                let payload = Arc::new(document);
                self.store_payload(key, payload.clone()).await;
                info!("Roads loaded: {} elements", element_count(&payload));
                Ok(RoadData {
                    payload,
                    source: DataSource::Upstream,
                })
            }
            Err(cause) => match self.store.read().await.get_stale(&key) {
                Some(payload) => {
                    info!("Serving stale cache for {} ({})", key, cause);
                    Ok(RoadData {
                        payload,
                        source: DataSource::Stale,
                    })
                }
                None => {
                    warn!("No data for {}: {}", key, cause);
                    Err(ProxyError::NoDataAvailable(cause))
                }
            },
        }
    }

    async fn store_payload(&self, key: CacheKey, payload: Arc<Value>) {
        let now = self.clock.now_ms();
        let mut store = self.store.write().await;
        let evicted = store.insert(key, payload, now);
        if evicted > 0 {
            info!("Evicted {} oldest entries, {} remain", evicted, store.len());
        }
    }

    // == Stats ==
    /// Size, TTL, keys and counters. No side effects.
    pub async fn stats(&self) -> CacheSnapshot {
        let store = self.store.read().await;
        CacheSnapshot {
            size: store.len(),
            ttl: store.ttl(),
            keys: store.keys(),
            counters: store.stats(),
        }
    }

    // == Clear ==
    /// Drops every entry. Fetches in flight repopulate afterwards.
    pub async fn clear(&self) -> usize {
        let removed = self.store.write().await.clear();
        info!("Road cache cleared ({} entries)", removed);
        removed
    }

    // == Warmup ==
    /// Pre-loads each target, skipping fresh ones.
    ///
    /// Only the primary mirror is tried, once per target, to keep the total
    /// duration bounded. Failures are recorded in the report, never returned.
    pub async fn warmup(&self, targets: &[WarmupTarget]) -> WarmupReport {
        let mut report = WarmupReport::default();

        for target in targets {
            let key = target.bbox.cache_key();

            if self.store.read().await.is_fresh(&key, self.clock.now_ms()) {
                report.push(target, WarmupOutcome::Cached);
                continue;
            }

            let mirror = self.mirrors.primary();
            let outcome = match attempt(
                self.upstream.as_ref(),
                mirror,
                &target.query,
                self.policy.attempt_timeout,
            )
            .await
            {
                Ok(document) => {
                    let elements = element_count(&document);
                    self.store_payload(key, Arc::new(document)).await;
                    info!(
                        "Warmed cache for {}: {} elements",
                        target.label, elements
                    );
                    WarmupOutcome::Fetched { elements }
                }
                Err(err) => {
                    warn!("Warm-up failed for {}: {}", target.label, err);
                    WarmupOutcome::Failed(err)
                }
            };
            report.push(target, outcome);
        }

        report.cache_size = self.store.read().await.len();
        report
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use crate::error::UpstreamError;
    use crate::upstream::{TransportError, UpstreamResponse};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Gives every call the same answer, which tests may swap midway.
    struct ScriptedUpstream {
        answer: Mutex<std::result::Result<UpstreamResponse, TransportError>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedUpstream {
        fn always(answer: std::result::Result<UpstreamResponse, TransportError>) -> Arc<Self> {
            Arc::new(Self {
                answer: Mutex::new(answer),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn ok(body: Value) -> Arc<Self> {
            Self::always(Ok(UpstreamResponse::new(200, body.to_string())))
        }

        fn answer_with(&self, answer: std::result::Result<UpstreamResponse, TransportError>) {
            *self.answer.lock().unwrap() = answer;
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl UpstreamClient for ScriptedUpstream {
        async fn post_query(
            &self,
            mirror: &str,
            _query: &str,
            _timeout: Duration,
        ) -> std::result::Result<UpstreamResponse, TransportError> {
            self.calls.lock().unwrap().push(mirror.to_string());
            self.answer.lock().unwrap().clone()
        }
    }

    /// Answers after a fixed delay.
    struct SlowUpstream {
        body: String,
        delay: Duration,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl UpstreamClient for SlowUpstream {
        async fn post_query(
            &self,
            _mirror: &str,
            _query: &str,
            _timeout: Duration,
        ) -> std::result::Result<UpstreamResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(UpstreamResponse::new(200, self.body.clone()))
        }
    }

    /// While closed, each call announces itself on `started` and then waits
    /// for `release`.
    struct GatedUpstream {
        body: String,
        closed: AtomicBool,
        started: Notify,
        release: Notify,
    }

    #[async_trait]
    impl UpstreamClient for GatedUpstream {
        async fn post_query(
            &self,
            _mirror: &str,
            _query: &str,
            _timeout: Duration,
        ) -> std::result::Result<UpstreamResponse, TransportError> {
            if self.closed.load(Ordering::SeqCst) {
                self.started.notify_one();
                self.release.notified().await;
            }
            Ok(UpstreamResponse::new(200, self.body.clone()))
        }
    }

    const MIRRORS: [&str; 3] = ["https://m1", "https://m2", "https://m3"];

    fn build(upstream: Arc<dyn UpstreamClient>, clock: Arc<ManualClock>, capacity: usize) -> RoadQueryCache {
        let mirrors = MirrorPool::new(MIRRORS.iter().map(|m| m.to_string()).collect()).unwrap();
        let policy = RetryPolicy {
            attempt_timeout: Duration::from_millis(200),
            rate_limit_backoff: Duration::ZERO,
        };
        RoadQueryCache::new(CacheStore::new(capacity, 3600), upstream, mirrors, policy)
            .with_clock(clock)
    }

    fn bbox(s: &str) -> BoundingBox {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_second_fetch_served_from_cache() {
        let upstream = ScriptedUpstream::ok(json!({"elements": [1, 2]}));
        let clock = Arc::new(ManualClock::new(0));
        let cache = build(upstream.clone(), clock.clone(), 100);

        let first = cache.fetch(&bbox("55.751,37.617,55.752,37.618"), "q").await.unwrap();
        let second = cache
            .fetch(&bbox("55.7513,37.6172,55.7517,37.6178"), "q")
            .await
            .unwrap();

        assert_eq!(first.source, DataSource::Upstream);
        assert_eq!(second.source, DataSource::Cache);
        assert_eq!(first.payload, second.payload);
        assert_eq!(upstream.call_count(), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_refreshed() {
        let upstream = ScriptedUpstream::ok(json!({"elements": []}));
        let clock = Arc::new(ManualClock::new(0));
        let cache = build(upstream.clone(), clock.clone(), 100);
        let area = bbox("1,1,2,2");

        cache.fetch(&area, "q").await.unwrap();
        clock.advance_secs(3599);
        assert_eq!(cache.fetch(&area, "q").await.unwrap().source, DataSource::Cache);
        clock.advance_secs(1);
        assert_eq!(cache.fetch(&area, "q").await.unwrap().source, DataSource::Upstream);
        assert_eq!(upstream.call_count(), 2);
    }

    #[tokio::test]
    async fn test_stale_served_when_all_mirrors_fail() {
        let upstream = ScriptedUpstream::ok(json!({"elements": ["old"]}));
        let clock = Arc::new(ManualClock::new(0));
        let area = bbox("1,1,2,2");

        let cache = build(upstream.clone(), clock.clone(), 100);
        cache.fetch(&area, "q").await.unwrap();

        upstream.answer_with(Ok(UpstreamResponse::new(504, "")));
        clock.advance_secs(7200);

        let data = cache.fetch(&area, "q").await.unwrap();
        assert_eq!(data.source, DataSource::Stale);
        assert_eq!(*data.payload, json!({"elements": ["old"]}));
        assert_eq!(upstream.call_count(), 1 + MIRRORS.len());
        assert_eq!(cache.stats().await.counters.stale_hits, 1);
    }

    #[tokio::test]
    async fn test_cold_failure_reports_no_data() {
        let upstream = ScriptedUpstream::always(Err(TransportError::Timeout));
        let cache = build(upstream.clone(), Arc::new(ManualClock::new(0)), 100);

        let result = cache.fetch(&bbox("1,1,2,2"), "q").await;

        assert!(matches!(
            result,
            Err(ProxyError::NoDataAvailable(UpstreamError::Timeout(_)))
        ));
        assert_eq!(upstream.call_count(), MIRRORS.len());
    }

    #[tokio::test]
    async fn test_rejected_status_fails_fast() {
        let upstream = ScriptedUpstream::always(Ok(UpstreamResponse::new(400, "bad")));
        let cache = build(upstream.clone(), Arc::new(ManualClock::new(0)), 100);

        let result = cache.fetch(&bbox("1,1,2,2"), "q").await;

        assert!(matches!(
            result,
            Err(ProxyError::NoDataAvailable(UpstreamError::Rejected { status: 400, .. }))
        ));
        assert_eq!(upstream.call_count(), 1);
    }

    #[tokio::test]
    async fn test_blank_query_is_invalid() {
        let upstream = ScriptedUpstream::ok(json!({}));
        let cache = build(upstream.clone(), Arc::new(ManualClock::new(0)), 100);

        let result = cache.fetch(&bbox("1,1,2,2"), "   ").await;
        assert!(matches!(result, Err(ProxyError::InvalidRequest(_))));
        assert_eq!(upstream.call_count(), 0);
    }

    #[tokio::test]
    async fn test_eviction_through_fetch() {
        let upstream = ScriptedUpstream::ok(json!({"elements": []}));
        let clock = Arc::new(ManualClock::new(0));
        let cache = build(upstream, clock.clone(), 4);

        for i in 0..5 {
            clock.advance_secs(1);
            let area = BoundingBox::new(i as f64, 0.0, i as f64 + 0.1, 0.1).unwrap();
            cache.fetch(&area, "q").await.unwrap();
        }

        let stats = cache.stats().await;
        assert_eq!(stats.size, 3);
        assert_eq!(stats.counters.evictions, 2);
        let oldest = BoundingBox::new(0.0, 0.0, 0.1, 0.1).unwrap().cache_key();
        assert!(!stats.keys.contains(&oldest));
    }

    #[tokio::test]
    async fn test_clear_then_stats_is_empty() {
        let upstream = ScriptedUpstream::ok(json!({}));
        let cache = build(upstream, Arc::new(ManualClock::new(0)), 100);
        cache.fetch(&bbox("1,1,2,2"), "q").await.unwrap();
        cache.fetch(&bbox("3,3,4,4"), "q").await.unwrap();

        assert_eq!(cache.clear().await, 2);
        let stats = cache.stats().await;
        assert_eq!(stats.size, 0);
        assert!(stats.keys.is_empty());
        assert_eq!(stats.ttl, 3600);
    }

    #[tokio::test]
    async fn test_warmup_uses_primary_mirror_only() {
        let upstream = ScriptedUpstream::always(Ok(UpstreamResponse::new(429, "")));
        let cache = build(upstream.clone(), Arc::new(ManualClock::new(0)), 100);
        let targets = vec![WarmupTarget::new("Tyumen", bbox("57.0,65.4,57.3,65.7"), "q")];

        let report = cache.warmup(&targets).await;

        assert_eq!(upstream.calls(), vec![MIRRORS[0]]);
        assert!(matches!(
            report.entries[0].outcome,
            WarmupOutcome::Failed(UpstreamError::RateLimited(_))
        ));
        assert_eq!(report.cache_size, 0);
    }

    #[tokio::test]
    async fn test_warmup_skips_fresh_targets() {
        let upstream = ScriptedUpstream::ok(json!({"elements": [1, 2, 3]}));
        let cache = build(upstream.clone(), Arc::new(ManualClock::new(0)), 100);
        let targets = vec![
            WarmupTarget::new("Moscow", bbox("55.5,37.3,56.0,37.9"), "q"),
            WarmupTarget::new("Tyumen", bbox("57.0,65.4,57.3,65.7"), "q"),
        ];

        let first = cache.warmup(&targets).await;
        let second = cache.warmup(&targets).await;

        assert!(matches!(first.entries[0].outcome, WarmupOutcome::Fetched { elements: 3 }));
        assert!(second.entries.iter().all(|e| e.outcome == WarmupOutcome::Cached));
        assert_eq!(second.cache_size, 2);
        assert_eq!(upstream.call_count(), 2);
    }

    #[tokio::test]
    async fn test_warmup_reports_gateway_timeout_status() {
        let upstream = ScriptedUpstream::always(Ok(UpstreamResponse::new(504, "")));
        let cache = build(upstream.clone(), Arc::new(ManualClock::new(0)), 100);
        let targets = vec![WarmupTarget::new("Tyumen", bbox("57.0,65.4,57.3,65.7"), "q")];

        let report = cache.warmup(&targets).await;

        assert_eq!(report.lines(), vec!["Tyumen (error 504)"]);
        assert_eq!(upstream.calls(), vec![MIRRORS[0]]);
    }

    #[tokio::test]
    async fn test_concurrent_cold_fetches_agree() {
        let upstream = Arc::new(SlowUpstream {
            body: json!({"elements": [7, 8]}).to_string(),
            delay: Duration::from_millis(20),
            calls: AtomicUsize::new(0),
        });
        let cache = build(upstream.clone(), Arc::new(ManualClock::new(0)), 100);
        let area = bbox("55.751,37.617,55.752,37.618");

        let (first, second) = tokio::join!(cache.fetch(&area, "q"), cache.fetch(&area, "q"));
        let (first, second) = (first.unwrap(), second.unwrap());

        assert_eq!(first.payload, second.payload);
        assert_eq!(*first.payload, json!({"elements": [7, 8]}));
        assert_eq!(cache.stats().await.size, 1);
        // No coalescing: each cold miss may go upstream
        assert!((1..=2).contains(&upstream.calls.load(Ordering::SeqCst)));
    }

    #[tokio::test]
    async fn test_clear_during_inflight_fetch_repopulates() {
        let upstream = Arc::new(GatedUpstream {
            body: json!({"elements": [1]}).to_string(),
            closed: AtomicBool::new(false),
            started: Notify::new(),
            release: Notify::new(),
        });
        let cache = Arc::new(build(upstream.clone(), Arc::new(ManualClock::new(0)), 100));
        cache.fetch(&bbox("3,3,4,4"), "q").await.unwrap();

        upstream.closed.store(true, Ordering::SeqCst);
        let inflight = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.fetch(&bbox("1,1,2,2"), "q").await })
        };

        upstream.started.notified().await;
        assert_eq!(cache.clear().await, 1);
        upstream.release.notify_one();

        let data = inflight.await.unwrap().unwrap();
        assert_eq!(data.source, DataSource::Upstream);
        let stats = cache.stats().await;
        assert_eq!(stats.size, 1);
        assert_eq!(stats.keys, vec![bbox("1,1,2,2").cache_key()]);
    }
}
