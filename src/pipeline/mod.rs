//! Minimal service pipeline with before/after hook chains.
//!
//! Every call runs the before chain, then the service method unless a before
//! hook already supplied a result, then the after chain. The first error stops
//! the call.

mod context;
mod error;
mod memory;
mod service;

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument};

pub use context::{EntityId, HookContext, Method, Params};
pub use error::{HookError, PipelineError, ServiceError};
pub use memory::{ID_FIELD, MemoryService};
pub use service::Service;

/// A function run before or after a service method.
pub trait Hook: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> &'static str;

    fn call(&self, ctx: &mut HookContext) -> Result<(), HookError>;
}

/// A service wrapped with its hook chains.
pub struct ServicePipeline<S> {
    service: S,
    before: Vec<Arc<dyn Hook>>,
    after: Vec<Arc<dyn Hook>>,
}

impl<S: Service> ServicePipeline<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            before: Vec::new(),
            after: Vec::new(),
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Append a hook to the before chain.
    pub fn before(&mut self, hook: Arc<dyn Hook>) -> &mut Self {
        self.before.push(hook);
        self
    }

    /// Append a hook to the after chain.
    pub fn after(&mut self, hook: Arc<dyn Hook>) -> &mut Self {
        self.after.push(hook);
        self
    }

    pub fn before_hooks(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.before.iter().map(|hook| hook.name())
    }

    pub fn after_hooks(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.after.iter().map(|hook| hook.name())
    }

    #[instrument(skip_all, fields(method = %ctx.method, id = ?ctx.id))]
    pub fn call(&self, mut ctx: HookContext) -> Result<HookContext, PipelineError> {
        run_chain("before", &self.before, &mut ctx)?;

        if ctx.result.is_none() {
            let result = self.dispatch(&ctx).map_err(|source| PipelineError::Service {
                method: ctx.method,
                source,
            })?;
            ctx.result = Some(Arc::new(result));
        } else {
            debug!(
                from_cache = ctx.result_from_cache,
                "result supplied by before hook, skipping service"
            );
        }

        run_chain("after", &self.after, &mut ctx)?;
        Ok(ctx)
    }

    fn dispatch(&self, ctx: &HookContext) -> Result<Value, ServiceError> {
        let params = &ctx.params;
        let data = || ctx.data.clone().unwrap_or(Value::Null);
        let id = || {
            ctx.id
                .as_ref()
                .ok_or(ServiceError::MissingId { method: ctx.method })
        };

        match ctx.method {
            Method::Find => self.service.find(params),
            Method::Get => self.service.get(id()?, params),
            Method::Create => self.service.create(data(), params),
            Method::Update => self.service.update(id()?, data(), params),
            Method::Patch => self.service.patch(id()?, data(), params),
            Method::Remove => self.service.remove(id()?, params),
        }
    }
}

fn run_chain(
    stage: &'static str,
    hooks: &[Arc<dyn Hook>],
    ctx: &mut HookContext,
) -> Result<(), PipelineError> {
    for hook in hooks {
        hook.call(ctx).map_err(|source| PipelineError::Hook {
            stage,
            hook: hook.name(),
            source,
        })?;
    }
    Ok(())
}
