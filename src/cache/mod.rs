//! In-memory caches in front of the case-law database.
//!
//! Only successful upstream answers are stored. Both caches are process-wide
//! and safe to share between concurrently handled requests; the lock is never
//! held across an await.

pub mod citation;
pub mod lru;
pub mod opinion;

use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

pub use citation::{CachedLookup, CitationCache};
pub use lru::LruCache;
pub use opinion::{CachedOpinions, OpinionCache};

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    pub hits: u64,
    pub misses: u64,
}

/// An [`LruCache`] behind a mutex, returning clones.
#[derive(Debug)]
struct SharedLru<K, V> {
    inner: Mutex<LruCache<K, V>>,
}

impl<K, V> SharedLru<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<K, V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn get(&self, key: &K) -> Option<V> {
        self.lock().get(key).cloned()
    }

    fn set(&self, key: K, value: V) -> Option<K> {
        self.lock().put(key, value)
    }

    fn clear(&self) {
        self.lock().clear();
    }

    fn stats(&self) -> CacheStats {
        let cache = self.lock();
        CacheStats {
            size: cache.len(),
            max_size: cache.capacity(),
            hits: cache.hits(),
            misses: cache.misses(),
        }
    }
}
