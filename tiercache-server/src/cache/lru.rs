//! L1 LRU Store
//!
//! Fixed-capacity in-memory cache with O(1) get/set/evict. Nodes live in an
//! arena addressed by stable slot indices; a `HashMap` maps keys to slots and
//! the `prev`/`next` links form a doubly linked list ordered from most
//! recently used (head) to least recently used (tail).
//!
//! There is no background sweep: expired entries keep occupying capacity
//! until they are read, overwritten or evicted.

use std::collections::HashMap;
use tracing::debug;

use super::stats::TierStats;
use crate::core::{CacheEntry, now_millis};

/// Arena slot holding one cached entry and its list links
#[derive(Debug)]
struct Node {
    key: String,
    entry: CacheEntry,
    prev: Option<usize>,
    next: Option<usize>,
}

/// L1 in-memory LRU cache
#[derive(Debug)]
pub struct LruStore {
    capacity: usize,
    map: HashMap<String, usize>,
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl LruStore {
    /// Create a new store holding at most `capacity` entries (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            map: HashMap::with_capacity(capacity),
            nodes: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: None,
            tail: None,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    /// Get a value, moving it to the most-recently-used position
    pub fn get(&mut self, key: &str) -> Option<Vec<u8>> {
        self.get_at(key, now_millis())
    }

    pub(crate) fn get_at(&mut self, key: &str, now: u64) -> Option<Vec<u8>> {
        let Some(&idx) = self.map.get(key) else {
            self.misses += 1;
            debug!("L1 MISS: {}", key);
            return None;
        };

        if self.node(idx).entry.is_expired(now) {
            self.remove_slot(idx);
            self.misses += 1;
            debug!("L1 EXPIRED: {}", key);
            return None;
        }

        self.move_to_front(idx);
        let node = self.node_mut(idx);
        node.entry.touch(now);
        let value = node.entry.value.clone();
        self.hits += 1;
        debug!("L1 HIT: {}", key);
        Some(value)
    }

    /// Insert or update a value with a TTL in seconds
    pub fn set(&mut self, key: &str, value: Vec<u8>, ttl_secs: u64) {
        self.set_at(key, value, ttl_secs, now_millis());
    }

    pub(crate) fn set_at(&mut self, key: &str, value: Vec<u8>, ttl_secs: u64, now: u64) {
        if let Some(&idx) = self.map.get(key) {
            self.node_mut(idx).entry.refresh(value, ttl_secs, now);
            self.move_to_front(idx);
            return;
        }

        let node = Node {
            key: key.to_string(),
            entry: CacheEntry::new(value, ttl_secs, now),
            prev: None,
            next: None,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.nodes[idx] = Some(node);
                idx
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        };
        self.push_front(idx);
        self.map.insert(key.to_string(), idx);

        if self.map.len() > self.capacity {
            self.evict_tail();
        }
    }

    /// Remove a key, returning whether it was present
    pub fn delete(&mut self, key: &str) -> bool {
        match self.map.get(key) {
            Some(&idx) => {
                self.remove_slot(idx);
                true
            }
            None => false,
        }
    }

    /// Drop every entry and reset all counters
    pub fn clear(&mut self) {
        self.map.clear();
        self.nodes.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.hits = 0;
        self.misses = 0;
        self.evictions = 0;
    }

    /// Whether a live (unexpired) entry exists, without touching LRU order or counters
    pub fn contains(&self, key: &str) -> bool {
        let now = now_millis();
        self.map
            .get(key)
            .is_some_and(|&idx| !self.node(idx).entry.is_expired(now))
    }

    /// All physically present keys (expired entries included until touched)
    pub fn keys(&self) -> Vec<String> {
        self.map.keys().cloned().collect()
    }

    /// Keys from most to least recently used
    pub fn keys_by_recency(&self) -> Vec<String> {
        let mut keys = Vec::with_capacity(self.map.len());
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            let node = self.node(idx);
            keys.push(node.key.clone());
            cursor = node.next;
        }
        keys
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> TierStats {
        TierStats::new(
            self.hits,
            self.misses,
            self.evictions,
            self.map.len(),
            self.capacity,
        )
    }

    fn evict_tail(&mut self) {
        let Some(idx) = self.tail else {
            return;
        };
        let key = self.remove_slot(idx);
        self.evictions += 1;
        debug!("L1 EVICT: {}", key);
    }

    /// Unlink a slot, drop it from the map and recycle it. Returns the key.
    fn remove_slot(&mut self, idx: usize) -> String {
        self.unlink(idx);
        let node = self.nodes[idx].take().expect("linked slot is occupied");
        self.map.remove(&node.key);
        self.free.push(idx);
        node.key
    }

    fn move_to_front(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }
        self.unlink(idx);
        self.push_front(idx);
    }

    fn push_front(&mut self, idx: usize) {
        let old_head = self.head;
        {
            let node = self.node_mut(idx);
            node.prev = None;
            node.next = old_head;
        }
        match old_head {
            Some(h) => self.node_mut(h).prev = Some(idx),
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = {
            let node = self.node(idx);
            (node.prev, node.next)
        };
        match prev {
            Some(p) => self.node_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.node_mut(n).prev = prev,
            None => self.tail = prev,
        }
        let node = self.node_mut(idx);
        node.prev = None;
        node.next = None;
    }

    #[inline]
    fn node(&self, idx: usize) -> &Node {
        self.nodes[idx].as_ref().expect("linked slot is occupied")
    }

    #[inline]
    fn node_mut(&mut self, idx: usize) -> &mut Node {
        self.nodes[idx].as_mut().expect("linked slot is occupied")
    }
}
