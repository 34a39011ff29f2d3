//! Per-template memo of parsed column aliases.
//!
//! The cache key is the template text exactly as given to
//! [`SqlAppender::new`](crate::SqlAppender::new). Entries expire a fixed time
//! after they were written and the number of distinct templates is bounded;
//! both limits come from [`AliasCacheConfig`].
//!
//! # Configuration
//!
//! Environment variables read by [`AliasCacheConfig::from_env`]:
//! - `SQL_APPENDER_CACHE_MAX_ENTRIES` (default: 1000)
//! - `SQL_APPENDER_CACHE_TTL_SECS` (default: 600)
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::alias::parse_select_aliases;

/// Parsed alias metadata of one template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasIndex {
    /// Logical aliases in select-list order.
    aliases: Vec<String>,
    /// Logical alias -> column expression, used for ORDER BY.
    columns: HashMap<String, String>,
}

impl AliasIndex {
    /// Parses `template` into an index.
    pub fn parse(template: &str) -> crate::Result<Self> {
        let entries = parse_select_aliases(template)?;
        let mut aliases = Vec::with_capacity(entries.len());
        let mut columns = HashMap::with_capacity(entries.len());
        for entry in entries {
            aliases.push(entry.alias.clone());
            columns.insert(entry.alias, entry.original);
        }
        Ok(AliasIndex { aliases, columns })
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Column expression for a logical alias.
    pub fn column(&self, alias: &str) -> Option<&str> {
        self.columns.get(alias).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

/// Configuration for the alias cache
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AliasCacheConfig {
    /// Maximum number of distinct templates kept; 0 disables caching
    pub max_entries: usize,
    /// Time after insertion at which an entry is considered absent
    #[serde(with = "ttl_secs")]
    pub ttl: Duration,
}

impl Default for AliasCacheConfig {
    fn default() -> Self {
        AliasCacheConfig {
            max_entries: 1000,
            ttl: Duration::from_secs(10 * 60),
        }
    }
}

impl AliasCacheConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let max_entries = std::env::var("SQL_APPENDER_CACHE_MAX_ENTRIES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_entries);

        let ttl = std::env::var("SQL_APPENDER_CACHE_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.ttl);

        AliasCacheConfig { max_entries, ttl }
    }
}

mod ttl_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[derive(Debug)]
struct CacheEntry {
    index: Arc<AliasIndex>,
    written_at: Instant,
}

/// Thread-safe, bounded, expiring map from template text to [`AliasIndex`].
///
/// Share one instance between all appenders with `Arc`. Two threads missing
/// on the same template may both parse it; the results are identical and the
/// later write wins.
#[derive(Debug)]
pub struct AliasCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    config: AliasCacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl Default for AliasCache {
    fn default() -> Self {
        Self::new(AliasCacheConfig::default())
    }
}

impl AliasCache {
    pub fn new(config: AliasCacheConfig) -> Self {
        AliasCache {
            entries: RwLock::new(HashMap::new()),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Create a cache from environment variables
    pub fn from_env() -> Self {
        Self::new(AliasCacheConfig::from_env())
    }

    pub fn config(&self) -> &AliasCacheConfig {
        &self.config
    }

    /// Returns the index for `template`, parsing it on a miss.
    ///
    /// # Errors
    ///
    /// Propagates parse failures; nothing is cached for a malformed template.
    pub fn resolve(&self, template: &str) -> crate::Result<Arc<AliasIndex>> {
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(entry) = entries.get(template) {
                if !self.is_expired(entry) {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Ok(Arc::clone(&entry.index));
                }
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        log::info!("fetching column aliases...");
        let index = Arc::new(AliasIndex::parse(template)?);
        log::debug!("column aliases for {} are {:?}", template, index.aliases());

        self.store(template, Arc::clone(&index));
        Ok(index)
    }

    /// Writes a freshly parsed index. A key already present (another thread
    /// missed at the same time) is overwritten without evicting anything.
    fn store(&self, template: &str, index: Arc<AliasIndex>) {
        if self.config.max_entries == 0 {
            return;
        }
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if !entries.contains_key(template) {
            self.evict(&mut entries);
        }
        entries.insert(
            template.to_owned(),
            CacheEntry {
                index,
                written_at: Instant::now(),
            },
        );
    }

    /// Drops the entry for one template.
    pub fn invalidate(&self, template: &str) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(template);
    }

    /// Clear entire cache
    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.clear();
    }

    pub fn metrics(&self) -> CacheMetrics {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        CacheMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size: entries.len(),
            max_entries: self.config.max_entries,
        }
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        entry.written_at.elapsed() >= self.config.ttl
    }

    /// Removes expired entries, then the oldest ones until there is room for
    /// one more.
    fn evict(&self, entries: &mut HashMap<String, CacheEntry>) {
        let before = entries.len();
        entries.retain(|_, entry| !self.is_expired(entry));

        while !entries.is_empty() && entries.len() >= self.config.max_entries {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.written_at)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    entries.remove(&key);
                }
                None => break,
            }
        }

        let evicted = before - entries.len();
        if evicted > 0 {
            self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
        }
    }
}

/// Cache metrics for monitoring
#[derive(Debug, Clone)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
    pub max_entries: usize,
}

impl CacheMetrics {
    /// Calculate cache hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    const TEMPLATE: &str = "select c.id as client_id, c.name ${clientName} from client c";

    #[test]
    fn test_index_order_and_columns() {
        let index = AliasIndex::parse(TEMPLATE).unwrap();
        assert_eq!(index.aliases(), ["client_id", "clientName"]);
        assert_eq!(index.column("clientName"), Some("c.name"));
        assert_eq!(index.column("client_id"), Some("c.id"));
        assert_eq!(index.column("name"), None);
    }

    #[test]
    fn test_resolve_hit_and_miss() {
        let cache = AliasCache::default();

        let first = cache.resolve(TEMPLATE).unwrap();
        assert_eq!(cache.metrics().misses, 1);

        let second = cache.resolve(TEMPLATE).unwrap();
        assert_eq!(cache.metrics().hits, 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.metrics().size, 1);
    }

    #[test]
    fn test_malformed_template_is_not_cached() {
        let cache = AliasCache::default();
        assert!(cache.resolve("delete from client").is_err());
        assert_eq!(cache.metrics().size, 0);
    }

    #[test]
    fn test_expired_entry_is_recomputed() {
        let cache = AliasCache::new(AliasCacheConfig {
            max_entries: 10,
            ttl: Duration::ZERO,
        });

        let first = cache.resolve(TEMPLATE).unwrap();
        let second = cache.resolve(TEMPLATE).unwrap();

        let metrics = cache.metrics();
        assert_eq!(metrics.misses, 2);
        assert_eq!(metrics.hits, 0);
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let cache = AliasCache::new(AliasCacheConfig {
            max_entries: 2,
            ..Default::default()
        });

        cache.resolve("select a from t1").unwrap();
        cache.resolve("select b from t2").unwrap();
        cache.resolve("select c from t3").unwrap();

        let metrics = cache.metrics();
        assert_eq!(metrics.size, 2);
        assert_eq!(metrics.evictions, 1);

        // t1 was written first, so it was the one dropped
        cache.resolve("select b from t2").unwrap();
        cache.resolve("select c from t3").unwrap();
        assert_eq!(cache.metrics().hits, 2);
        cache.resolve("select a from t1").unwrap();
        assert_eq!(cache.metrics().misses, 4);
    }

    #[test]
    fn test_rewrite_of_present_key_evicts_nothing() {
        let cache = AliasCache::new(AliasCacheConfig {
            max_entries: 2,
            ..Default::default()
        });
        cache.resolve("select a from t1").unwrap();
        cache.resolve("select b from t2").unwrap();

        let index = Arc::new(AliasIndex::parse("select a from t1").unwrap());
        cache.store("select a from t1", index);

        let metrics = cache.metrics();
        assert_eq!(metrics.size, 2);
        assert_eq!(metrics.evictions, 0);
        cache.resolve("select b from t2").unwrap();
        assert_eq!(cache.metrics().hits, 1);
    }

    #[test]
    fn test_zero_capacity_caches_nothing() {
        let cache = AliasCache::new(AliasCacheConfig {
            max_entries: 0,
            ..Default::default()
        });

        let first = cache.resolve(TEMPLATE).unwrap();
        let second = cache.resolve(TEMPLATE).unwrap();

        let metrics = cache.metrics();
        assert_eq!(metrics.size, 0);
        assert_eq!(metrics.misses, 2);
        assert_eq!(*first, *second);
    }

    #[test]
    fn test_invalidate_and_clear() {
        let cache = AliasCache::default();
        cache.resolve("select a from t1").unwrap();
        cache.resolve("select b from t2").unwrap();

        cache.invalidate("select a from t1");
        assert_eq!(cache.metrics().size, 1);

        cache.clear();
        assert_eq!(cache.metrics().size, 0);
    }

    #[test]
    fn test_concurrent_resolve_agrees() {
        let cache = Arc::new(AliasCache::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.resolve(TEMPLATE).unwrap())
            })
            .collect();

        let indexes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for index in &indexes {
            assert_eq!(**index, *indexes[0]);
        }
        assert_eq!(cache.metrics().size, 1);
    }

    #[test]
    fn test_config_deserialize() {
        let config: AliasCacheConfig =
            serde_json::from_str(r#"{"max_entries": 5, "ttl": 30}"#).unwrap();
        assert_eq!(config.max_entries, 5);
        assert_eq!(config.ttl, Duration::from_secs(30));

        let config: AliasCacheConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.max_entries, 1000);
    }
}
