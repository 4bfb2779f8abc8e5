//! Read-through cache hooks with scoped invalidation for CRUD service
//! pipelines.
//!
//! ```
//! use std::sync::Arc;
//!
//! use hookcache::cache::{CacheHooks, CacheOptions, MemoryStore};
//! use hookcache::pipeline::{HookContext, MemoryService, ServicePipeline};
//! use serde_json::json;
//!
//! let hooks = CacheHooks::new(Arc::new(MemoryStore::new()), CacheOptions::default());
//! let service = MemoryService::with_documents([json!({ "_id": "42" })]).unwrap();
//! let mut pipeline = ServicePipeline::new(service);
//! assert!(hooks.wire(&mut pipeline));
//!
//! pipeline.call(HookContext::get("42", Some(json!({})))).unwrap();
//! let second = pipeline.call(HookContext::get("42", Some(json!({})))).unwrap();
//! assert!(second.result_from_cache);
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod replay;
pub mod telemetry;
