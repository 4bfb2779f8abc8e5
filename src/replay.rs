//! Replays recorded service calls through a cached in-memory service.
//!
//! Input is a JSON object:
//!
//! ```json
//! {
//!   "documents": [{ "_id": "a", "status": "open" }],
//!   "requests": [
//!     { "method": "find", "query": { "status": "open" } },
//!     { "method": "patch", "id": "a", "data": { "status": "closed" } }
//!   ]
//! }
//! ```
//!
//! Each request yields one outcome; a failing request is reported in its
//! outcome and does not stop the replay.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::cache::{CacheConfig, CacheKey, CacheStore};
use crate::pipeline::{
    EntityId, HookContext, MemoryService, Method, Params, ServiceError, ServicePipeline,
};

#[derive(Debug, Deserialize)]
pub struct ReplayInput {
    #[serde(default)]
    pub documents: Vec<Value>,
    pub requests: Vec<ReplayRequest>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplayRequest {
    pub method: Method,
    #[serde(default)]
    pub id: Option<EntityId>,
    /// An explicit `null` stays `Some(Value::Null)`; only a missing field is absent.
    #[serde(default, deserialize_with = "present_value")]
    pub query: Option<Value>,
    #[serde(default)]
    pub data: Option<Value>,
}

fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl From<ReplayRequest> for HookContext {
    fn from(request: ReplayRequest) -> Self {
        let mut ctx = HookContext::new(request.method);
        ctx.id = request.id;
        ctx.params = Params {
            query: request.query,
        };
        ctx.data = request.data;
        ctx
    }
}

#[derive(Debug, Serialize)]
pub struct ReplayOutcome {
    pub method: Method,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    /// Cache key for reads; mutations are not cached.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub from_cache: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct Replay {
    pipeline: ServicePipeline<MemoryService>,
    store: Arc<dyn CacheStore>,
    config: CacheConfig,
    caching: bool,
}

impl Replay {
    pub fn new(config: &CacheConfig, documents: Vec<Value>) -> Result<Self, ServiceError> {
        let store = config.build_store();
        let hooks = config.build_hooks(Arc::clone(&store));

        let mut pipeline = ServicePipeline::new(MemoryService::with_documents(documents)?);
        let caching = hooks.wire(&mut pipeline);
        if !caching {
            warn!(cache = "hooks", "caching unavailable, replaying without cache");
        }

        Ok(Self {
            pipeline,
            store,
            config: config.clone(),
            caching,
        })
    }

    pub fn is_caching(&self) -> bool {
        self.caching
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Service calls that reached the in-memory backend.
    pub fn backend_calls(&self) -> usize {
        self.pipeline.service().backend_calls()
    }

    pub fn run(&self, request: ReplayRequest) -> ReplayOutcome {
        let ctx = HookContext::from(request);
        let method = ctx.method;
        let id = ctx.id.clone();
        let key = (self.caching && method.is_read()).then(|| {
            CacheKey::for_context(&ctx, self.config.options().query_encoding).into_string()
        });

        match self.pipeline.call(ctx) {
            Ok(done) => ReplayOutcome {
                method,
                id,
                key,
                from_cache: done.result_from_cache,
                result: done.result.as_deref().cloned(),
                error: None,
            },
            Err(err) => {
                warn!(%method, error = %err, "replayed request failed");
                ReplayOutcome {
                    method,
                    id,
                    key,
                    from_cache: false,
                    result: None,
                    error: Some(err.to_string()),
                }
            }
        }
    }

    pub fn run_all(
        &self,
        requests: impl IntoIterator<Item = ReplayRequest>,
    ) -> Vec<ReplayOutcome> {
        let outcomes: Vec<_> = requests.into_iter().map(|request| self.run(request)).collect();
        info!(
            requests = outcomes.len(),
            cache_hits = outcomes.iter().filter(|outcome| outcome.from_cache).count(),
            backend_calls = self.backend_calls(),
            cached_entries = self.store.len(),
            "replay finished"
        );
        outcomes
    }
}
