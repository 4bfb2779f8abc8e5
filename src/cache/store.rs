//! Key-value stores backing the cache hooks.
//!
//! Values are JSON documents behind `Arc`: a cache hit hands out the stored
//! document itself, never a copy.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, RwLock};

use lru::LruCache;
use metrics::counter;
use serde_json::Value;
use tracing::debug;

use super::error::CacheError;
use super::lock::{mutex_lock, rw_read, rw_write};

pub type CachedValue = Arc<Value>;

/// Which store operations are usable.
///
/// The hook factory refuses to build hooks over a store that lacks any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreCapabilities {
    pub get: bool,
    pub set: bool,
    pub delete: bool,
    pub keys: bool,
}

impl StoreCapabilities {
    pub const ALL: Self = Self {
        get: true,
        set: true,
        delete: true,
        keys: true,
    };

    pub fn is_complete(&self) -> bool {
        self.get && self.set && self.delete && self.keys
    }

    /// Names of the unsupported operations.
    pub fn missing(&self) -> Vec<&'static str> {
        [
            ("get", self.get),
            ("set", self.set),
            ("delete", self.delete),
            ("keys", self.keys),
        ]
        .into_iter()
        .filter_map(|(name, supported)| (!supported).then_some(name))
        .collect()
    }
}

/// Shared string-keyed document store.
///
/// Each operation is atomic on its own; nothing groups several operations
/// into a transaction.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Option<CachedValue>;

    /// Insert or overwrite the entry for `key`.
    fn set(&self, key: &str, value: CachedValue) -> Result<(), CacheError>;

    /// Remove the entry for `key`; removing a missing key is not an error.
    fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Snapshot of every key currently stored.
    fn keys(&self) -> Vec<String>;

    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities::ALL
    }

    fn len(&self) -> usize {
        self.keys().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Unbounded store
// ============================================================================

const MEMORY_SOURCE: &str = "cache::store::memory";

/// Unbounded in-process store. Entries live until invalidated.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, CachedValue>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&self) {
        rw_write(&self.entries, MEMORY_SOURCE, "clear").clear();
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &str) -> Option<CachedValue> {
        rw_read(&self.entries, MEMORY_SOURCE, "get").get(key).cloned()
    }

    fn set(&self, key: &str, value: CachedValue) -> Result<(), CacheError> {
        rw_write(&self.entries, MEMORY_SOURCE, "set").insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        rw_write(&self.entries, MEMORY_SOURCE, "delete").remove(key);
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        rw_read(&self.entries, MEMORY_SOURCE, "keys")
            .keys()
            .cloned()
            .collect()
    }

    fn len(&self) -> usize {
        rw_read(&self.entries, MEMORY_SOURCE, "len").len()
    }
}

// ============================================================================
// Bounded store
// ============================================================================

const LRU_SOURCE: &str = "cache::store::lru";

/// Capacity-bounded store evicting the least recently used entry.
///
/// Reads count as use, so a hot entry survives a stream of one-off misses.
pub struct LruStore {
    entries: Mutex<LruCache<String, CachedValue>>,
}

impl LruStore {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn capacity(&self) -> NonZeroUsize {
        mutex_lock(&self.entries, LRU_SOURCE, "capacity").cap()
    }

    pub fn clear(&self) {
        mutex_lock(&self.entries, LRU_SOURCE, "clear").clear();
    }
}

impl CacheStore for LruStore {
    fn get(&self, key: &str) -> Option<CachedValue> {
        mutex_lock(&self.entries, LRU_SOURCE, "get").get(key).cloned()
    }

    fn set(&self, key: &str, value: CachedValue) -> Result<(), CacheError> {
        let displaced = mutex_lock(&self.entries, LRU_SOURCE, "set").push(key.to_string(), value);
        if let Some((evicted, _)) = displaced.filter(|(displaced_key, _)| displaced_key != key) {
            counter!("hookcache_evict_total").increment(1);
            debug!(cache = "hooks", key = %evicted, "evicted least recently used entry");
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        mutex_lock(&self.entries, LRU_SOURCE, "delete").pop(key);
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        mutex_lock(&self.entries, LRU_SOURCE, "keys")
            .iter()
            .map(|(key, _)| key.clone())
            .collect()
    }

    fn len(&self) -> usize {
        mutex_lock(&self.entries, LRU_SOURCE, "len").len()
    }
}
