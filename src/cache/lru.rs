//! Bounded least-recently-used map.
//!
//! A `HashMap` holds the entries and a `BTreeMap` orders them by access tick,
//! so the LRU entry is the first key of the index: O(log n) get, put and
//! eviction without scanning.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

#[derive(Debug)]
struct Slot<V> {
    value: V,
    tick: u64,
}

/// LRU map with hit/miss counters.
#[derive(Debug)]
pub struct LruCache<K, V> {
    entries: HashMap<K, Slot<V>>,
    // access tick -> key, oldest first
    recency: BTreeMap<u64, K>,
    next_tick: u64,
    capacity: usize,
    hits: u64,
    misses: u64,
}

impl<K, V> LruCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Create a cache holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            recency: BTreeMap::new(),
            next_tick: 0,
            capacity: capacity.max(1),
            hits: 0,
            misses: 0,
        }
    }

    fn tick(&mut self) -> u64 {
        let tick = self.next_tick;
        self.next_tick += 1;
        tick
    }

    /// Look up `key`, marking it most recently used. Counts a hit or a miss.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let tick = self.tick();
        match self.entries.get_mut(key) {
            Some(slot) => {
                self.hits += 1;
                self.recency.remove(&slot.tick);
                slot.tick = tick;
                self.recency.insert(tick, key.clone());
                Some(&slot.value)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Insert or replace `key`, evicting the LRU entry when over capacity.
    /// Returns the evicted key, if any.
    pub fn put(&mut self, key: K, value: V) -> Option<K> {
        let tick = self.tick();
        if let Some(old) = self.entries.insert(key.clone(), Slot { value, tick }) {
            self.recency.remove(&old.tick);
        }
        self.recency.insert(tick, key);

        if self.entries.len() > self.capacity {
            return self.evict_lru();
        }
        None
    }

    fn evict_lru(&mut self) -> Option<K> {
        let (_, key) = self.recency.pop_first()?;
        self.entries.remove(&key);
        Some(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Drop every entry and reset the counters.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
        self.hits = 0;
        self.misses = 0;
    }
}
