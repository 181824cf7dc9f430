//! Lookup results keyed by normalized citation.

use tracing::debug;

use super::{CacheStats, SharedLru};
use crate::client::CitationMatch;

pub const DEFAULT_CITATION_CACHE_SIZE: usize = 1000;

/// A stored successful lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedLookup {
    pub matches: Vec<CitationMatch>,
}

/// Citation lookup cache.
#[derive(Debug)]
pub struct CitationCache {
    lru: SharedLru<String, CachedLookup>,
}

impl CitationCache {
    pub fn new(max_size: usize) -> Self {
        Self {
            lru: SharedLru::new(max_size),
        }
    }

    pub fn get(&self, normalized: &str) -> Option<CachedLookup> {
        let found = self.lru.get(&normalized.to_string());
        debug!(citation = %normalized, hit = found.is_some(), "Citation cache lookup");
        found
    }

    pub fn set(&self, normalized: impl Into<String>, value: CachedLookup) {
        if let Some(evicted) = self.lru.set(normalized.into(), value) {
            debug!(citation = %evicted, "Evicted citation cache entry");
        }
    }

    pub fn clear(&self) {
        self.lru.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.lru.stats()
    }
}

impl Default for CitationCache {
    fn default() -> Self {
        Self::new(DEFAULT_CITATION_CACHE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockCaseLawApi;

    fn lookup(citation: &str) -> CachedLookup {
        CachedLookup {
            matches: vec![MockCaseLawApi::not_found_match(citation)],
        }
    }

    #[test]
    fn test_round_trip_counts_hit() {
        let cache = CitationCache::default();
        cache.set("347 U.S. 483", lookup("347 U.S. 483"));

        assert_eq!(cache.get("347 U.S. 483"), Some(lookup("347 U.S. 483")));
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.size, 1);
        assert_eq!(stats.max_size, 1000);
    }

    #[test]
    fn test_absent_key_counts_miss() {
        let cache = CitationCache::new(10);
        assert_eq!(cache.get("1 U.S. 1"), None);
        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 0);
    }

    #[test]
    fn test_capacity_plus_one_evicts_oldest() {
        let cache = CitationCache::new(3);
        for page in 1..=4 {
            let key = format!("1 U.S. {}", page);
            cache.set(key.clone(), lookup(&key));
        }

        assert_eq!(cache.get("1 U.S. 1"), None);
        assert!(cache.get("1 U.S. 2").is_some());
        assert!(cache.get("1 U.S. 4").is_some());
        assert_eq!(cache.stats().size, 3);
    }

    #[test]
    fn test_stats_serialize_camel_case() {
        let cache = CitationCache::new(5);
        let value = serde_json::to_value(cache.stats()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "size": 0, "maxSize": 5, "hits": 0, "misses": 0 })
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_access_keeps_bounds_and_counts() {
        let cache = std::sync::Arc::new(CitationCache::new(16));

        let tasks: Vec<_> = (0..8)
            .map(|worker| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    for page in 0..100 {
                        let key = format!("{} U.S. {}", worker, page % 24);
                        cache.set(key.clone(), lookup(&key));
                        cache.get(&key);
                        cache.get(&format!("{} U.S. {}", (worker + 1) % 8, page % 24));
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let stats = cache.stats();
        assert!(stats.size <= stats.max_size);
        assert_eq!(stats.size, 16);
        assert_eq!(stats.hits + stats.misses, 8 * 100 * 2);
    }
}
