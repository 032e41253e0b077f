//! Two-tier cache facade
//!
//! Reads go to L1 first and fall back to L2, promoting L2 hits into L1.
//! Writes go to both tiers. Every call completes against the in-memory
//! indices before returning; L2 disk I/O is queued and never awaited.
//!
//! Locks are always taken L1 then L2 and held for the whole operation, so a
//! promotion cannot overwrite a concurrent `set` with a stale value.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Instant;
use tracing::{debug, info};

use super::l2_disk::{L2CacheConfig, L2DiskCache};
use super::lru::LruStore;
use super::pattern::KeyPattern;
use super::persister::PersistHook;
use super::stats::{CacheHealth, CacheStats};
use crate::core::Result;
use crate::metrics;

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub l1_max_entries: usize,
    pub default_ttl_secs: u64,
    /// Seed the warm set at startup
    pub warmup_enabled: bool,
    /// TTL for memoized HTTP responses
    pub memoize_ttl_secs: u64,
    pub l2: L2CacheConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            l1_max_entries: 1000,
            default_ttl_secs: 300, // 5 minutes
            warmup_enabled: false,
            memoize_ttl_secs: 60,
            l2: L2CacheConfig::default(),
        }
    }
}

/// Two-tier cache: bounded LRU in memory over a larger write-behind disk tier
#[derive(Debug)]
pub struct TieredCache {
    config: CacheConfig,
    l1: Mutex<LruStore>,
    l2: Option<L2DiskCache>,
    started_at: Instant,
}

impl TieredCache {
    /// Build the cache. When L2 is enabled this must run inside a tokio runtime.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_persist_hook(config, None)
    }

    /// Build the cache with an observability hook for L2 disk operations
    pub fn with_persist_hook(config: CacheConfig, hook: Option<PersistHook>) -> Self {
        let l1 = LruStore::new(config.l1_max_entries);
        let l2 = config
            .l2
            .enabled
            .then(|| L2DiskCache::open_with_hook(config.l2.clone(), hook));

        info!(
            "Tiered cache ready: l1={} entries, l2={}, default_ttl={}s",
            l1.capacity(),
            l2.as_ref()
                .map(|l2| format!("{} entries at {:?}", l2.max_entries(), l2.directory()))
                .unwrap_or_else(|| "disabled".to_string()),
            config.default_ttl_secs
        );

        Self {
            config,
            l1: Mutex::new(l1),
            l2,
            started_at: Instant::now(),
        }
    }

    /// Look up a key in L1, then L2 (promoting hits into L1)
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let mut l1 = self.l1.lock();

        if let Some(value) = l1.get(key) {
            metrics::record_cache_op("l1", "get", "hit");
            return Some(value);
        }
        metrics::record_cache_op("l1", "get", "miss");

        let l2 = self.l2.as_ref()?;
        match l2.get(key) {
            Some(value) => {
                metrics::record_cache_op("l2", "get", "hit");
                l1.set(key, value.clone(), self.config.default_ttl_secs);
                debug!("Promoted {} from L2 to L1", key);
                Some(value)
            }
            None => {
                metrics::record_cache_op("l2", "get", "miss");
                None
            }
        }
    }

    /// Write to L1 and, when enabled, L2 with the same TTL
    pub fn set(&self, key: &str, value: Vec<u8>, ttl_secs: Option<u64>) {
        let ttl = ttl_secs.unwrap_or(self.config.default_ttl_secs);
        let mut l1 = self.l1.lock();

        match &self.l2 {
            Some(l2) => {
                l1.set(key, value.clone(), ttl);
                l2.set(key, value, ttl);
                metrics::record_cache_op("l2", "set", "ok");
            }
            None => l1.set(key, value, ttl),
        }
        metrics::record_cache_op("l1", "set", "ok");
    }

    /// Remove a key from both tiers; true if either held it
    pub fn delete(&self, key: &str) -> bool {
        let mut l1 = self.l1.lock();
        let in_l1 = l1.delete(key);
        let in_l2 = self.l2.as_ref().is_some_and(|l2| l2.delete(key));

        metrics::record_cache_op("all", "delete", if in_l1 || in_l2 { "ok" } else { "miss" });
        in_l1 || in_l2
    }

    /// Drop every entry in both tiers (including files) and reset all counters
    pub fn clear(&self) {
        let mut l1 = self.l1.lock();
        l1.clear();
        if let Some(l2) = &self.l2 {
            l2.clear();
        }
        info!("Cache cleared");
    }

    /// Delete every key in either tier matching `pattern`.
    ///
    /// Returns the number of distinct keys removed. See [`KeyPattern`] for
    /// the matching rules; an invalid pattern is returned as an error.
    pub fn delete_pattern(&self, pattern: &str) -> Result<usize> {
        let pattern = KeyPattern::parse(pattern)?;
        if pattern.is_literal() {
            return Ok(usize::from(self.delete(&pattern.to_string())));
        }

        let mut l1 = self.l1.lock();

        let mut matched: BTreeSet<String> = l1
            .keys()
            .into_iter()
            .filter(|k| pattern.matches(k))
            .collect();
        if let Some(l2) = &self.l2 {
            matched.extend(l2.keys().into_iter().filter(|k| pattern.matches(k)));
        }

        for key in &matched {
            l1.delete(key);
            if let Some(l2) = &self.l2 {
                l2.delete(key);
            }
        }

        info!("Pattern {} invalidated {} keys", pattern, matched.len());
        Ok(matched.len())
    }

    /// Sorted, deduplicated union of both tiers' keys
    pub fn keys(&self) -> Vec<String> {
        let l1 = self.l1.lock();
        let mut keys: BTreeSet<String> = l1.keys().into_iter().collect();
        if let Some(l2) = &self.l2 {
            keys.extend(l2.keys());
        }
        keys.into_iter().collect()
    }

    pub fn stats(&self) -> CacheStats {
        let l1 = self.l1.lock().stats();
        let l2 = self.l2.as_ref().map(|l2| l2.stats());

        metrics::set_entries("l1", l1.size);
        if let Some(l2) = &l2 {
            metrics::set_entries("l2", l2.size);
        }

        CacheStats::aggregate(l1, l2, self.started_at.elapsed().as_secs())
    }

    pub fn health(&self) -> CacheHealth {
        CacheHealth::evaluate(&self.stats())
    }

    /// Whether L1 currently holds a live entry for `key`
    pub fn l1_contains(&self, key: &str) -> bool {
        self.l1.lock().contains(key)
    }

    /// Whether L2 currently holds a live entry for `key`
    pub fn l2_contains(&self, key: &str) -> bool {
        self.l2.as_ref().is_some_and(|l2| l2.contains(key))
    }

    /// Direct access to the persistent tier
    pub fn l2(&self) -> Option<&L2DiskCache> {
        self.l2.as_ref()
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Wait for queued L2 disk operations (shutdown and tests)
    pub async fn flush(&self) {
        if let Some(l2) = &self.l2 {
            l2.flush().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{TempDir, tempdir};

    fn memory_only(l1: usize) -> TieredCache {
        TieredCache::new(CacheConfig {
            l1_max_entries: l1,
            l2: L2CacheConfig {
                enabled: false,
                ..Default::default()
            },
            ..Default::default()
        })
    }

    fn two_tier(l1: usize, l2: usize) -> (TieredCache, TempDir) {
        let dir = tempdir().unwrap();
        let cache = TieredCache::new(CacheConfig {
            l1_max_entries: l1,
            l2: L2CacheConfig {
                directory: dir.path().to_path_buf(),
                max_entries: l2,
                ..Default::default()
            },
            ..Default::default()
        });
        (cache, dir)
    }

    #[test]
    fn test_memory_only_lru_property() {
        let cache = memory_only(2);
        cache.set("a", vec![1], None);
        cache.set("b", vec![2], None);
        cache.set("c", vec![3], None);

        assert_eq!(cache.keys(), vec!["b", "c"]);
        assert_eq!(cache.get("a"), None);

        let stats = cache.stats();
        assert_eq!(stats.l1.evictions, 1);
        assert!(stats.l2.is_none());
    }

    #[tokio::test]
    async fn test_value_evicted_from_l1_served_by_l2() {
        let (cache, _dir) = two_tier(1, 10);
        cache.set("a", vec![1], None);
        cache.set("b", vec![2], None);

        assert!(!cache.l1_contains("a"));
        assert!(cache.l2_contains("a"));
        assert_eq!(cache.get("a"), Some(vec![1]));
        assert!(cache.l1_contains("a"), "L2 hit is promoted");

        let stats = cache.stats();
        assert_eq!(stats.l2.as_ref().unwrap().hits, 1);
    }

    #[tokio::test]
    async fn test_promotion_from_seeded_l2() {
        let (cache, _dir) = two_tier(10, 10);
        cache.l2().unwrap().set("k", b"seed".to_vec(), 60);
        assert_eq!(cache.stats().l1.size, 0);

        assert_eq!(cache.get("k"), Some(b"seed".to_vec()));
        assert_eq!(cache.stats().l1.size, 1);
        assert!(cache.l1_contains("k"));
    }

    #[tokio::test]
    async fn test_double_miss_counts_both_tiers() {
        let (cache, _dir) = two_tier(10, 10);
        assert_eq!(cache.get("nope"), None);

        let stats = cache.stats();
        assert_eq!(stats.l1.misses, 1);
        assert_eq!(stats.l2.unwrap().misses, 1);
        assert_eq!(stats.overall.misses, 2);
    }

    #[tokio::test]
    async fn test_delete_pattern_both_tiers() {
        let (cache, _dir) = two_tier(2, 10);
        cache.set("user:1", vec![1], None);
        cache.set("user:2", vec![2], None);
        cache.set("order:1", vec![3], None);

        assert_eq!(cache.delete_pattern("user:*").unwrap(), 2);
        assert_eq!(cache.keys(), vec!["order:1"]);
        assert!(!cache.l2_contains("user:1"));
        assert!(!cache.l2_contains("user:2"));
        assert!(cache.l2_contains("order:1"));
    }

    #[tokio::test]
    async fn test_delete_pattern_literal_removes_exact_key() {
        let (cache, _dir) = two_tier(1, 10);
        cache.set("order:1", vec![1], None);
        cache.set("order:10", vec![2], None);

        assert_eq!(cache.delete_pattern("order:1").unwrap(), 1);
        assert_eq!(cache.delete_pattern("order:1").unwrap(), 0);
        assert_eq!(cache.keys(), vec!["order:10"]);
    }

    #[test]
    fn test_delete_pattern_rejects_empty() {
        let cache = memory_only(4);
        assert!(cache.delete_pattern("").is_err());
    }

    #[tokio::test]
    async fn test_delete_removes_from_both() {
        let (cache, _dir) = two_tier(10, 10);
        cache.set("k", vec![1], None);

        assert!(cache.delete("k"));
        assert!(!cache.delete("k"));
        assert_eq!(cache.get("k"), None);
    }

    #[tokio::test]
    async fn test_clear_resets_everything() {
        let (cache, _dir) = two_tier(1, 10);
        cache.set("a", vec![1], None);
        cache.set("b", vec![2], None);
        cache.get("a");
        cache.get("zzz");

        cache.clear();
        let stats = cache.stats();
        assert_eq!(stats.l1.size, 0);
        assert_eq!(stats.l1.hits + stats.l1.misses + stats.l1.evictions, 0);
        let l2 = stats.l2.unwrap();
        assert_eq!(l2.size, 0);
        assert_eq!(l2.hits + l2.misses + l2.evictions, 0);
        assert!(cache.keys().is_empty());
    }

    #[tokio::test]
    async fn test_keys_union_deduplicated() {
        let (cache, _dir) = two_tier(1, 10);
        cache.set("x", vec![1], None);
        cache.set("y", vec![2], None);

        // "x" only in L2, "y" in both
        assert_eq!(cache.keys(), vec!["x", "y"]);
    }

    #[tokio::test]
    async fn test_explicit_ttl_applies_to_both_tiers() {
        let (cache, _dir) = two_tier(10, 10);
        cache.set("short", vec![1], Some(0));

        assert!(!cache.l1_contains("short"));
        assert!(!cache.l2_contains("short"));
        assert_eq!(cache.get("short"), None);
    }
}
