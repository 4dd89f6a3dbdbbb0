//! TTL + LRU result caching.
//!
//! Entries expire a fixed TTL after they were stored. Expiry is checked
//! lazily on read and by an optional background sweeper; capacity pressure
//! evicts the least recently accessed entry.

mod key;

pub use key::{CacheKey, normalize_query};

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const DEFAULT_SEARCH_CAPACITY: usize = 100;
const DEFAULT_SEARCH_TTL: Duration = Duration::from_secs(15 * 60);
const DEFAULT_EMBEDDING_CAPACITY: usize = 500;
const DEFAULT_EMBEDDING_TTL: Duration = Duration::from_secs(60 * 60);
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Named cache instances owned by the search engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheType {
    Search,
    Embedding,
}

impl CacheType {
    pub const ALL: [CacheType; 2] = [CacheType::Search, CacheType::Embedding];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    pub capacity: usize,
    #[serde(rename = "ttl_ms", with = "crate::config::duration_ms")]
    pub ttl: Duration,
    #[serde(rename = "sweep_interval_ms", with = "crate::config::duration_ms")]
    pub sweep_interval: Duration,
}

impl CacheConfig {
    pub fn search() -> Self {
        Self {
            capacity: DEFAULT_SEARCH_CAPACITY,
            ttl: DEFAULT_SEARCH_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    pub fn embeddings() -> Self {
        Self {
            capacity: DEFAULT_EMBEDDING_CAPACITY,
            ttl: DEFAULT_EMBEDDING_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::search()
    }
}

/// Cache statistics snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub evictions: u64,
    pub expirations: u64,
}

/// Access metadata of a cached entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryMetadata {
    pub created_at: Instant,
    pub last_accessed_at: Instant,
    pub hit_count: u64,
    pub ttl: Duration,
}

struct CacheEntry<T> {
    data: T,
    created_at: Instant,
    last_accessed_at: Instant,
    hit_count: u64,
    ttl: Duration,
    // Breaks ties between entries touched at the same instant.
    access_seq: u64,
}

impl<T> CacheEntry<T> {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) >= self.ttl
    }

    fn recency(&self) -> (Instant, u64) {
        (self.last_accessed_at, self.access_seq)
    }
}

struct CacheState<T> {
    entries: HashMap<String, CacheEntry<T>>,
    access_seq: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
}

impl<T> CacheState<T> {
    fn next_seq(&mut self) -> u64 {
        self.access_seq += 1;
        self.access_seq
    }

    fn purge_expired(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - self.entries.len();
        self.expirations += removed as u64;
        removed
    }

    fn evict_lru(&mut self) -> Option<String> {
        let key = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.recency())
            .map(|(key, _)| key.clone())?;
        self.entries.remove(&key);
        self.evictions += 1;
        Some(key)
    }
}

/// Thread-safe TTL + LRU cache.
///
/// The internal lock is never held across an await point, so the cache can
/// be shared freely between concurrent search calls.
pub struct ResultCache<T> {
    config: CacheConfig,
    state: Mutex<CacheState<T>>,
}

impl<T: Clone + Send + 'static> ResultCache<T> {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                access_seq: 0,
                hits: 0,
                misses: 0,
                evictions: 0,
                expirations: 0,
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, CacheState<T>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Look up a key, refreshing its access time on a hit and dropping it if
    /// its TTL has elapsed.
    pub fn get(&self, key: &str) -> Option<T> {
        let now = Instant::now();
        let mut guard = self.lock();
        let state = &mut *guard;
        let seq = state.next_seq();

        if let Some(entry) = state.entries.get_mut(key) {
            if !entry.is_expired(now) {
                entry.last_accessed_at = now;
                entry.access_seq = seq;
                entry.hit_count += 1;
                let data = entry.data.clone();
                state.hits += 1;
                return Some(data);
            }
            state.entries.remove(key);
            state.expirations += 1;
        }

        state.misses += 1;
        None
    }

    pub fn set(&self, key: impl Into<String>, value: T) {
        self.set_with_ttl(key, value, self.config.ttl);
    }

    pub fn set_with_ttl(&self, key: impl Into<String>, value: T, ttl: Duration) {
        if self.config.capacity == 0 {
            return;
        }

        let key = key.into();
        let now = Instant::now();
        let mut state = self.lock();

        if !state.entries.contains_key(&key) && state.entries.len() >= self.config.capacity {
            state.purge_expired(now);
            while state.entries.len() >= self.config.capacity {
                match state.evict_lru() {
                    Some(evicted) => tracing::trace!(key = %evicted, "Evicted LRU cache entry"),
                    None => break,
                }
            }
        }

        let seq = state.next_seq();
        state.entries.insert(
            key,
            CacheEntry {
                data: value,
                created_at: now,
                last_accessed_at: now,
                hit_count: 0,
                ttl,
                access_seq: seq,
            },
        );
    }

    /// Metadata of a live entry, without counting as an access.
    pub fn entry_metadata(&self, key: &str) -> Option<EntryMetadata> {
        let now = Instant::now();
        let state = self.lock();
        state
            .entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| EntryMetadata {
                created_at: entry.created_at,
                last_accessed_at: entry.last_accessed_at,
                hit_count: entry.hit_count,
                ttl: entry.ttl,
            })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entry_metadata(key).is_some()
    }

    pub fn remove(&self, key: &str) -> Option<T> {
        self.lock().entries.remove(key).map(|entry| entry.data)
    }

    /// Remove every key matching `pattern`.
    ///
    /// `pattern` is a regular expression; when it does not compile it is
    /// matched as a plain substring.
    pub fn invalidate_matching(&self, pattern: &str) -> usize {
        let matcher: Box<dyn Fn(&str) -> bool> = match Regex::new(pattern) {
            Ok(regex) => Box::new(move |key: &str| regex.is_match(key)),
            Err(_) => {
                let needle = pattern.to_string();
                Box::new(move |key: &str| key.contains(&needle))
            }
        };

        let mut state = self.lock();
        let before = state.entries.len();
        state.entries.retain(|key, _| !matcher(key.as_str()));
        before - state.entries.len()
    }

    pub fn clear(&self) -> usize {
        let mut state = self.lock();
        let removed = state.entries.len();
        state.entries.clear();
        removed
    }

    pub fn purge_expired(&self) -> usize {
        self.lock().purge_expired(Instant::now())
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        let lookups = state.hits + state.misses;
        CacheStats {
            entries: state.entries.len(),
            capacity: self.config.capacity,
            hits: state.hits,
            misses: state.misses,
            hit_rate: if lookups == 0 {
                0.0
            } else {
                state.hits as f64 / lookups as f64
            },
            evictions: state.evictions,
            expirations: state.expirations,
        }
    }

    pub fn reset_stats(&self) {
        let mut state = self.lock();
        state.hits = 0;
        state.misses = 0;
        state.evictions = 0;
        state.expirations = 0;
    }

    /// Return the cached value for `key`, or run `operation` and cache its
    /// success. Errors propagate and leave no entry behind.
    pub async fn with_cache<F, Fut, E>(&self, key: impl Into<String>, operation: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let key = key.into();
        if let Some(hit) = self.get(&key) {
            return Ok(hit);
        }

        let value = operation().await?;
        self.set(key, value.clone());
        Ok(value)
    }
}

impl<T: Clone + Send + Sync + 'static> ResultCache<T> {
    /// Spawn a task that purges expired entries every `sweep_interval`.
    ///
    /// The task ends when `shutdown` is cancelled or the cache is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        let period = self.config.sweep_interval.max(Duration::from_millis(1));
        let cache: Weak<Self> = Arc::downgrade(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let Some(cache) = cache.upgrade() else {
                            break;
                        };
                        let purged = cache.purge_expired();
                        if purged > 0 {
                            tracing::debug!(purged, "Swept expired cache entries");
                        }
                    }
                }
            }
        })
    }
}

impl<T> std::fmt::Debug for ResultCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_cache(capacity: usize) -> ResultCache<String> {
        ResultCache::new(
            CacheConfig::search()
                .with_capacity(capacity)
                .with_ttl(Duration::from_secs(60)),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_round_trip() {
        let cache = small_cache(4);
        cache.set("a", "alpha".to_string());
        assert_eq!(cache.get("a"), Some("alpha".to_string()));
        assert_eq!(cache.get("missing"), None);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate, 0.5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry() {
        let cache = small_cache(4);
        cache.set("a", "alpha".to_string());

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(cache.get("a").is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.stats().expirations, 1);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_access_does_not_extend_ttl() {
        let cache = small_cache(4);
        cache.set("a", "alpha".to_string());

        tokio::time::advance(Duration::from_secs(40)).await;
        assert!(cache.get("a").is_some());
        tokio::time::advance(Duration::from_secs(25)).await;
        assert!(cache.get("a").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_ttl() {
        let cache = small_cache(4);
        cache.set_with_ttl("short", "s".to_string(), Duration::from_secs(1));
        cache.set("long", "l".to_string());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get("short").is_none());
        assert!(cache.get("long").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lru_evicts_least_recently_accessed() {
        let cache = small_cache(3);
        cache.set("a", "1".to_string());
        tokio::time::advance(Duration::from_millis(10)).await;
        cache.set("b", "2".to_string());
        tokio::time::advance(Duration::from_millis(10)).await;
        cache.set("c", "3".to_string());
        tokio::time::advance(Duration::from_millis(10)).await;

        // "a" is the oldest by creation but the most recently accessed.
        assert!(cache.get("a").is_some());
        tokio::time::advance(Duration::from_millis(10)).await;

        cache.set("d", "4".to_string());
        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
        assert!(cache.contains("c"));
        assert!(cache.contains("d"));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lru_ties_broken_by_access_order() {
        let cache = small_cache(2);
        cache.set("a", "1".to_string());
        cache.set("b", "2".to_string());
        cache.get("a");

        cache.set("c", "3".to_string());
        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_does_not_evict() {
        let cache = small_cache(2);
        cache.set("a", "1".to_string());
        cache.set("b", "2".to_string());
        cache.set("a", "updated".to_string());

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), Some("updated".to_string()));
        assert_eq!(cache.stats().evictions, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_cache_prefers_purging_expired() {
        let cache = small_cache(2);
        cache.set_with_ttl("stale", "s".to_string(), Duration::from_secs(1));
        cache.set("fresh", "f".to_string());
        tokio::time::advance(Duration::from_secs(2)).await;

        cache.set("new", "n".to_string());
        assert!(cache.contains("fresh"));
        assert!(cache.contains("new"));
        assert_eq!(cache.stats().evictions, 0);
        assert_eq!(cache.stats().expirations, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hit_metadata() {
        let cache = small_cache(2);
        cache.set("a", "1".to_string());
        let created = cache.entry_metadata("a").unwrap();
        assert_eq!(created.hit_count, 0);

        tokio::time::advance(Duration::from_secs(5)).await;
        cache.get("a");
        cache.get("a");

        let touched = cache.entry_metadata("a").unwrap();
        assert_eq!(touched.hit_count, 2);
        assert_eq!(touched.created_at, created.created_at);
        assert!(touched.last_accessed_at > created.last_accessed_at);
    }

    #[test]
    fn test_invalidate_matching() {
        let cache = small_cache(10);
        cache.set("search:figma:3:{}", "x".to_string());
        cache.set("search:slack:3:{}", "y".to_string());
        cache.set("embedding:figma", "z".to_string());

        assert_eq!(cache.invalidate_matching("^search:"), 2);
        assert_eq!(cache.len(), 1);

        // Invalid regex falls back to substring matching.
        cache.set("weird[key", "w".to_string());
        assert_eq!(cache.invalidate_matching("weird["), 1);
    }

    #[test]
    fn test_clear() {
        let cache = small_cache(10);
        cache.set("a", "1".to_string());
        cache.set("b", "2".to_string());
        assert_eq!(cache.clear(), 2);
        assert_eq!(cache.clear(), 0);
    }

    #[test]
    fn test_zero_capacity_disables_caching() {
        let cache = small_cache(0);
        cache.set("a", "1".to_string());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_with_cache_caches_success_only() {
        let cache = small_cache(4);

        let err: Result<String, &str> = cache.with_cache("k", || async { Err("boom") }).await;
        assert_eq!(err, Err("boom"));
        assert!(!cache.contains("k"));

        let ok: Result<String, &str> = cache
            .with_cache("k", || async { Ok("value".to_string()) })
            .await;
        assert_eq!(ok.unwrap(), "value");

        let cached: Result<String, &str> = cache
            .with_cache("k", || async { Err("not called") })
            .await;
        assert_eq!(cached.unwrap(), "value");
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_purges_expired_entries() {
        let cache = Arc::new(ResultCache::new(
            CacheConfig::search()
                .with_ttl(Duration::from_secs(10))
                .with_sweep_interval(Duration::from_secs(30)),
        ));
        cache.set("a", "1".to_string());

        let shutdown = CancellationToken::new();
        let handle = cache.spawn_sweeper(shutdown.clone());

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.stats().expirations, 1);

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_stops_when_cache_dropped() {
        let cache = Arc::new(ResultCache::<String>::new(
            CacheConfig::search().with_sweep_interval(Duration::from_secs(1)),
        ));
        let handle = cache.spawn_sweeper(CancellationToken::new());
        drop(cache);

        tokio::time::sleep(Duration::from_secs(2)).await;
        handle.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_access() {
        let cache = Arc::new(small_cache(50));
        let mut handles = Vec::new();
        for worker in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                for i in 0..100 {
                    let key = format!("k{}", (worker * 100 + i) % 75);
                    cache.set(key.clone(), key.clone());
                    cache.get(&key);
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert!(cache.len() <= 50);
    }
}
