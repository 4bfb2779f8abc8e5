//! Read-through cache hooks.
//!
//! - `sendFromCache` (before `get`/`find`): answers from the store on a hit.
//! - `saveToCache` (after `get`/`find`): stores a deep copy of a fresh result.
//! - `clearCacheAfterModified` (after mutations): drops the mutated id's
//!   entries and every wildcard entry.

use std::sync::Arc;

use metrics::counter;
use serde_json::Value;
use tracing::{debug, info};

use crate::pipeline::{Hook, HookContext, HookError, Service, ServicePipeline};

use super::error::CacheError;
use super::keys::{CacheKey, QueryEncoding, is_affected_by};
use super::store::CacheStore;

/// Options shared by the three hooks.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheOptions {
    /// Emit an `info` event on every cache hit.
    pub logging: bool,
    pub query_encoding: QueryEncoding,
}

#[derive(Clone)]
pub struct SendFromCache {
    store: Arc<dyn CacheStore>,
    options: CacheOptions,
}

impl Hook for SendFromCache {
    fn name(&self) -> &'static str {
        "sendFromCache"
    }

    fn call(&self, ctx: &mut HookContext) -> Result<(), HookError> {
        if !ctx.method.is_read() {
            return Ok(());
        }

        let key = CacheKey::for_context(ctx, self.options.query_encoding);
        match self.store.get(key.as_str()) {
            Some(cached) => {
                counter!("hookcache_hit_total", "method" => ctx.method.as_str()).increment(1);
                if self.options.logging {
                    info!(cache = "hooks", outcome = "hit", key = %key, "Result is sent from cache");
                } else {
                    debug!(cache = "hooks", outcome = "hit", key = %key);
                }
                ctx.result = Some(cached);
                ctx.result_from_cache = true;
            }
            None => {
                counter!("hookcache_miss_total", "method" => ctx.method.as_str()).increment(1);
                debug!(cache = "hooks", outcome = "miss", key = %key);
            }
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct SaveToCache {
    store: Arc<dyn CacheStore>,
    options: CacheOptions,
}

impl Hook for SaveToCache {
    fn name(&self) -> &'static str {
        "saveToCache"
    }

    fn call(&self, ctx: &mut HookContext) -> Result<(), HookError> {
        if !ctx.method.is_read() || ctx.result_from_cache {
            return Ok(());
        }
        let Some(result) = ctx.result.as_deref() else {
            return Ok(());
        };

        let key = CacheKey::for_context(ctx, self.options.query_encoding);
        let copy = deep_copy(result)?;
        self.store.set(key.as_str(), Arc::new(copy))?;

        counter!("hookcache_store_total", "method" => ctx.method.as_str()).increment(1);
        debug!(cache = "hooks", outcome = "stored", key = %key);
        Ok(())
    }
}

#[derive(Clone)]
pub struct ClearCacheAfterModified {
    store: Arc<dyn CacheStore>,
}

impl ClearCacheAfterModified {
    /// Delete every key for `mutated_id` and every wildcard key.
    ///
    /// Stops at the first failing delete; keys already deleted stay deleted.
    pub fn invalidate(&self, mutated_id: &str) -> Result<usize, CacheError> {
        let mut removed = 0;
        for key in self.store.keys() {
            if is_affected_by(&key, mutated_id) {
                self.store.delete(&key)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

impl Hook for ClearCacheAfterModified {
    fn name(&self) -> &'static str {
        "clearCacheAfterModified"
    }

    fn call(&self, ctx: &mut HookContext) -> Result<(), HookError> {
        if !ctx.method.is_mutation() {
            return Ok(());
        }

        // Collection-wide mutations carry no id; only wildcard entries match then.
        let mutated_id = ctx.id.as_ref().map_or("", |id| id.as_str());
        let removed = self.invalidate(mutated_id)?;

        counter!("hookcache_invalidated_total", "method" => ctx.method.as_str())
            .increment(removed as u64);
        debug!(
            cache = "hooks",
            outcome = "invalidated",
            method = %ctx.method,
            id = mutated_id,
            removed,
        );
        Ok(())
    }
}

/// The hooks built over one store.
///
/// Empty when the store cannot support caching; callers check before wiring.
#[derive(Clone, Default)]
pub struct CacheHooks {
    pub send_from_cache: Option<SendFromCache>,
    pub save_to_cache: Option<SaveToCache>,
    pub clear_cache_after_modified: Option<ClearCacheAfterModified>,
}

impl CacheHooks {
    /// Build the hook set, or an empty one if the store lacks an operation.
    pub fn new(store: Arc<dyn CacheStore>, options: CacheOptions) -> Self {
        let capabilities = store.capabilities();
        if !capabilities.is_complete() {
            debug!(
                cache = "hooks",
                missing = ?capabilities.missing(),
                "store lacks required operations, caching disabled"
            );
            return Self::empty();
        }

        Self {
            send_from_cache: Some(SendFromCache {
                store: Arc::clone(&store),
                options,
            }),
            save_to_cache: Some(SaveToCache {
                store: Arc::clone(&store),
                options,
            }),
            clear_cache_after_modified: Some(ClearCacheAfterModified { store }),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.send_from_cache.is_none()
            && self.save_to_cache.is_none()
            && self.clear_cache_after_modified.is_none()
    }

    /// Wire the hooks into a pipeline: the reader first in the before chain,
    /// then the writer and the invalidator in the after chain.
    ///
    /// Returns false, leaving the pipeline untouched, when the set is empty.
    pub fn wire<S: Service>(&self, pipeline: &mut ServicePipeline<S>) -> bool {
        if self.is_empty() {
            return false;
        }
        if let Some(hook) = &self.send_from_cache {
            pipeline.before(Arc::new(hook.clone()));
        }
        if let Some(hook) = &self.save_to_cache {
            pipeline.after(Arc::new(hook.clone()));
        }
        if let Some(hook) = &self.clear_cache_after_modified {
            pipeline.after(Arc::new(hook.clone()));
        }
        true
    }
}

/// Independent copy through a JSON text round trip.
fn deep_copy(value: &Value) -> Result<Value, CacheError> {
    let text = serde_json::to_vec(value)?;
    Ok(serde_json::from_slice(&text)?)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::cache::store::{CachedValue, MemoryStore, StoreCapabilities};
    use crate::pipeline::Method;

    fn hooks_over(store: &Arc<MemoryStore>) -> CacheHooks {
        let shared: Arc<dyn CacheStore> = store.clone();
        CacheHooks::new(shared, CacheOptions::default())
    }

    fn reader(hooks: &CacheHooks) -> &SendFromCache {
        hooks.send_from_cache.as_ref().expect("reader hook")
    }

    fn writer(hooks: &CacheHooks) -> &SaveToCache {
        hooks.save_to_cache.as_ref().expect("writer hook")
    }

    fn invalidator(hooks: &CacheHooks) -> &ClearCacheAfterModified {
        hooks
            .clear_cache_after_modified
            .as_ref()
            .expect("invalidator hook")
    }

    fn with_result(mut ctx: HookContext, result: Value) -> HookContext {
        ctx.result = Some(Arc::new(result));
        ctx
    }

    #[test]
    fn miss_leaves_context_untouched() {
        let store = Arc::new(MemoryStore::new());
        let hooks = hooks_over(&store);

        let mut ctx = HookContext::get("42", Some(json!({})));
        reader(&hooks).call(&mut ctx).unwrap();

        assert!(ctx.result.is_none());
        assert!(!ctx.result_from_cache);
    }

    #[test]
    fn write_then_hit_serves_cached_value() {
        let store = Arc::new(MemoryStore::new());
        let hooks = hooks_over(&store);

        let mut ctx = with_result(HookContext::get("42", Some(json!({}))), json!({ "_id": "42" }));
        writer(&hooks).call(&mut ctx).unwrap();
        assert_eq!(store.keys(), ["42::{}"]);

        let mut ctx = HookContext::get("42", Some(json!({})));
        reader(&hooks).call(&mut ctx).unwrap();
        assert!(ctx.result_from_cache);
        assert_eq!(ctx.result_value(), Some(&json!({ "_id": "42" })));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn hit_shares_the_stored_value() {
        let store = Arc::new(MemoryStore::new());
        let hooks = hooks_over(&store);
        store.set("7::undefined", Arc::new(json!("cached"))).unwrap();

        let mut ctx = HookContext::get("7", None);
        reader(&hooks).call(&mut ctx).unwrap();

        let stored: CachedValue = store.get("7::undefined").expect("stored");
        assert!(Arc::ptr_eq(ctx.result.as_ref().expect("result"), &stored));
    }

    #[test]
    fn writer_stores_an_independent_copy() {
        let store = Arc::new(MemoryStore::new());
        let hooks = hooks_over(&store);

        let mut ctx = with_result(HookContext::find(None), json!({ "data": [1] }));
        writer(&hooks).call(&mut ctx).unwrap();

        let live = ctx.result.as_ref().expect("result");
        let stored = store.get("<find>::undefined").expect("stored");
        assert!(!Arc::ptr_eq(live, &stored));
        assert_eq!(**live, *stored);
    }

    #[test]
    fn writer_skips_results_served_from_cache() {
        let store = Arc::new(MemoryStore::new());
        let hooks = hooks_over(&store);

        let mut ctx = with_result(HookContext::find(None), json!([]));
        ctx.result_from_cache = true;
        writer(&hooks).call(&mut ctx).unwrap();

        assert!(store.is_empty());
    }

    #[test]
    fn reader_and_writer_ignore_mutations() {
        let store = Arc::new(MemoryStore::new());
        let hooks = hooks_over(&store);
        store.set("1::undefined", Arc::new(json!(1))).unwrap();

        let mut ctx = with_result(HookContext::remove("1"), json!({ "_id": "1" }));
        reader(&hooks).call(&mut ctx).unwrap();
        writer(&hooks).call(&mut ctx).unwrap();

        assert!(!ctx.result_from_cache);
        assert_eq!(store.keys(), ["1::undefined"]);
    }

    #[test]
    fn invalidator_ignores_reads() {
        let store = Arc::new(MemoryStore::new());
        let hooks = hooks_over(&store);
        store.set("<find>::{}", Arc::new(json!([]))).unwrap();

        let mut ctx = HookContext::find(Some(json!({})));
        invalidator(&hooks).call(&mut ctx).unwrap();

        assert_eq!(store.len(), 1);
    }

    #[test]
    fn invalidation_is_scoped_to_id_and_wildcard() {
        let store = Arc::new(MemoryStore::new());
        let hooks = hooks_over(&store);
        for key in ["a::{}", "a::{\"x\":1}", "b::{}", "<find>::{}", "<find>::undefined"] {
            store.set(key, Arc::new(json!(key))).unwrap();
        }

        let mut ctx = HookContext::patch("a", json!({ "x": 2 }));
        invalidator(&hooks).call(&mut ctx).unwrap();

        assert_eq!(store.keys(), ["b::{}"]);
    }

    #[test]
    fn mutation_without_id_clears_only_wildcards() {
        let store = Arc::new(MemoryStore::new());
        let hooks = hooks_over(&store);
        store.set("a::{}", Arc::new(json!(1))).unwrap();
        store.set("<find>::{}", Arc::new(json!(2))).unwrap();

        let removed = invalidator(&hooks).invalidate("").unwrap();
        assert_eq!(removed, 1);

        let mut ctx = HookContext::new(Method::Create);
        invalidator(&hooks).call(&mut ctx).unwrap();
        assert_eq!(store.keys(), ["a::{}"]);
    }

    #[test]
    fn invalidating_empty_store_is_a_no_op() {
        let store = Arc::new(MemoryStore::new());
        let hooks = hooks_over(&store);
        assert_eq!(invalidator(&hooks).invalidate("a").unwrap(), 0);
    }

    struct NoKeysStore(MemoryStore);

    impl CacheStore for NoKeysStore {
        fn get(&self, key: &str) -> Option<CachedValue> {
            self.0.get(key)
        }

        fn set(&self, key: &str, value: CachedValue) -> Result<(), CacheError> {
            self.0.set(key, value)
        }

        fn delete(&self, key: &str) -> Result<(), CacheError> {
            self.0.delete(key)
        }

        fn keys(&self) -> Vec<String> {
            Vec::new()
        }

        fn capabilities(&self) -> StoreCapabilities {
            StoreCapabilities {
                keys: false,
                ..StoreCapabilities::ALL
            }
        }
    }

    #[test]
    fn incomplete_store_yields_no_hooks() {
        let hooks = CacheHooks::new(
            Arc::new(NoKeysStore(MemoryStore::new())),
            CacheOptions::default(),
        );
        assert!(hooks.is_empty());
        assert!(hooks.send_from_cache.is_none());
        assert!(hooks.save_to_cache.is_none());
        assert!(hooks.clear_cache_after_modified.is_none());
    }

    struct FailingDeleteStore {
        inner: MemoryStore,
        poisoned_key: &'static str,
    }

    impl CacheStore for FailingDeleteStore {
        fn get(&self, key: &str) -> Option<CachedValue> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: CachedValue) -> Result<(), CacheError> {
            self.inner.set(key, value)
        }

        fn delete(&self, key: &str) -> Result<(), CacheError> {
            if key == self.poisoned_key {
                return Err(CacheError::backend("failing", "delete refused"));
            }
            self.inner.delete(key)
        }

        fn keys(&self) -> Vec<String> {
            let mut keys = self.inner.keys();
            keys.sort();
            keys
        }
    }

    #[test]
    fn failed_delete_aborts_but_keeps_earlier_deletions() {
        let store = Arc::new(FailingDeleteStore {
            inner: MemoryStore::new(),
            poisoned_key: "a::{\"z\":1}",
        });
        // Sorted order: the wildcard entry goes first, then the delete fails.
        store.set("<find>::{}", Arc::new(json!(1))).unwrap();
        store.set("a::{}", Arc::new(json!(2))).unwrap();
        store.set("a::{\"z\":1}", Arc::new(json!(3))).unwrap();

        let hooks = CacheHooks::new(store.clone(), CacheOptions::default());
        let mut ctx = HookContext::remove("a");
        let err = invalidator(&hooks).call(&mut ctx).unwrap_err();

        assert!(matches!(err, HookError::Cache(CacheError::Backend { .. })));
        assert_eq!(store.keys(), ["a::{\"z\":1}", "a::{}"]);
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0
                .lock()
                .expect("log buffer lock")
                .extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn logs_of_cache_hit(logging: bool) -> String {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let store = Arc::new(MemoryStore::new());
        store.set("42::{}", Arc::new(json!({ "_id": "42" }))).unwrap();
        let shared: Arc<dyn CacheStore> = store;
        let hooks = CacheHooks::new(
            shared,
            CacheOptions {
                logging,
                ..CacheOptions::default()
            },
        );

        tracing::subscriber::with_default(subscriber, || {
            let mut ctx = HookContext::get("42", Some(json!({})));
            reader(&hooks).call(&mut ctx).unwrap();
            assert!(ctx.result_from_cache);
        });

        let bytes = logs.0.lock().expect("log buffer lock").clone();
        String::from_utf8(bytes).expect("utf-8 logs")
    }

    #[test]
    fn hit_is_logged_at_info_when_logging_enabled() {
        let output = logs_of_cache_hit(true);
        assert!(output.contains("INFO"), "{output}");
        assert!(output.contains("Result is sent from cache"), "{output}");
        assert!(output.contains("42::{}"), "{output}");
    }

    #[test]
    fn hit_stays_at_debug_when_logging_disabled() {
        let output = logs_of_cache_hit(false);
        assert!(output.contains("DEBUG"), "{output}");
        assert!(output.contains("outcome=\"hit\""), "{output}");
        assert!(!output.contains("INFO"), "{output}");
        assert!(!output.contains("Result is sent from cache"), "{output}");
    }

    #[test]
    fn falsy_cached_values_are_hits() {
        let store = Arc::new(MemoryStore::new());
        let hooks = hooks_over(&store);

        for cached in [json!(null), json!(false), json!(0), json!("")] {
            store.set("42::{}", Arc::new(cached.clone())).unwrap();
            let mut ctx = HookContext::get("42", Some(json!({})));
            reader(&hooks).call(&mut ctx).unwrap();
            assert!(ctx.result_from_cache, "{cached} should be a hit");
            assert_eq!(ctx.result_value(), Some(&cached));
        }
    }

    #[test]
    fn update_invalidates_replaced_id_and_wildcards() {
        let store = Arc::new(MemoryStore::new());
        for key in ["<find>::{}", "a::{}", "b::{}"] {
            store.set(key, Arc::new(json!(key))).unwrap();
        }
        let hooks = hooks_over(&store);

        let mut ctx = HookContext::update("a", json!({ "title": "Algebra" }));
        assert_eq!(ctx.method, Method::Update);
        invalidator(&hooks).call(&mut ctx).unwrap();

        assert_eq!(store.keys(), ["b::{}"]);
    }
}
