//! Cache configuration.
//!
//! Controls the store behind the hooks via the `[cache]` section of
//! `hookcache.toml`.

use std::num::NonZeroUsize;
use std::sync::Arc;

use serde::Deserialize;

use super::hooks::{CacheHooks, CacheOptions};
use super::keys::QueryEncoding;
use super::store::{CacheStore, LruStore, MemoryStore};

const DEFAULT_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Build hooks at all.
    pub enabled: bool,
    /// Maximum cached results; 0 keeps every entry until invalidated.
    pub capacity: usize,
    /// Log every cache hit at info level.
    pub log_hits: bool,
    /// Sort query object keys before building cache keys.
    pub sort_query_keys: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: DEFAULT_CAPACITY,
            log_hits: false,
            sort_query_keys: false,
        }
    }
}

impl CacheConfig {
    /// Capacity bound, or `None` for an unbounded store.
    pub fn capacity_bound(&self) -> Option<NonZeroUsize> {
        NonZeroUsize::new(self.capacity)
    }

    pub fn options(&self) -> CacheOptions {
        CacheOptions {
            logging: self.log_hits,
            query_encoding: if self.sort_query_keys {
                QueryEncoding::Canonical
            } else {
                QueryEncoding::AsReceived
            },
        }
    }

    pub fn build_store(&self) -> Arc<dyn CacheStore> {
        match self.capacity_bound() {
            Some(capacity) => Arc::new(LruStore::new(capacity)),
            None => Arc::new(MemoryStore::new()),
        }
    }

    /// Hooks over `store`, or none when caching is disabled.
    pub fn build_hooks(&self, store: Arc<dyn CacheStore>) -> CacheHooks {
        if !self.enabled {
            return CacheHooks::empty();
        }
        CacheHooks::new(store, self.options())
    }
}
