//! Read-through cache hooks for service pipelines.
//!
//! Reads (`get`, `find`) are answered from a shared store keyed by
//! `<id or <find>>::<query>`. Mutations drop the entries of the mutated id and
//! every collection-level (`<find>`) entry.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! capacity = 1000   # 0 = unbounded
//! log_hits = false
//! sort_query_keys = false
//! ```

mod config;
mod error;
mod hooks;
mod keys;
pub(crate) mod lock;
mod store;

pub use config::CacheConfig;
pub use error::CacheError;
pub use hooks::{CacheHooks, CacheOptions, ClearCacheAfterModified, SaveToCache, SendFromCache};
pub use keys::{
    ABSENT_QUERY, CacheKey, QueryEncoding, SEPARATOR, WILDCARD, is_affected_by, selector_of,
};
pub use store::{CacheStore, CachedValue, LruStore, MemoryStore, StoreCapabilities};
