use thiserror::Error;

use crate::cache::CacheError;

use super::context::Method;

/// Failure raised by a service method.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("no record found for id `{id}`")]
    NotFound { id: String },
    #[error("`{method}` requires an id")]
    MissingId { method: Method },
    #[error("invalid data: {message}")]
    InvalidData { message: String },
}

impl ServiceError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }
}

/// Failure raised by a hook.
#[derive(Debug, Error)]
pub enum HookError {
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("{0}")]
    Rejected(String),
}

impl HookError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }
}

/// Failure of a whole pipeline call. The first failing stage stops the chain.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{stage} hook `{hook}` failed: {source}")]
    Hook {
        stage: &'static str,
        hook: &'static str,
        #[source]
        source: HookError,
    },
    #[error("service `{method}` failed: {source}")]
    Service {
        method: Method,
        #[source]
        source: ServiceError,
    },
}

impl PipelineError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Service {
                source: ServiceError::NotFound { .. },
                ..
            }
        )
    }
}
