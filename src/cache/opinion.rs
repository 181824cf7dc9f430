//! Opinion texts keyed by cluster id.

use tracing::debug;

use super::{CacheStats, SharedLru};
use crate::client::OpinionText;

pub const DEFAULT_OPINION_CACHE_SIZE: usize = 200;

/// A stored successful opinion fetch. May hold an empty list.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedOpinions {
    pub opinions: Vec<OpinionText>,
}

/// Opinion text cache.
#[derive(Debug)]
pub struct OpinionCache {
    lru: SharedLru<u64, CachedOpinions>,
}

impl OpinionCache {
    pub fn new(max_size: usize) -> Self {
        Self {
            lru: SharedLru::new(max_size),
        }
    }

    pub fn get(&self, cluster_id: u64) -> Option<CachedOpinions> {
        let found = self.lru.get(&cluster_id);
        debug!(cluster_id, hit = found.is_some(), "Opinion cache lookup");
        found
    }

    pub fn set(&self, cluster_id: u64, value: CachedOpinions) {
        if let Some(evicted) = self.lru.set(cluster_id, value) {
            debug!(cluster_id = evicted, "Evicted opinion cache entry");
        }
    }

    pub fn clear(&self) {
        self.lru.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.lru.stats()
    }
}

impl Default for OpinionCache {
    fn default() -> Self {
        Self::new(DEFAULT_OPINION_CACHE_SIZE)
    }
}
