use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to copy result for caching: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("cache store `{store}` failed: {message}")]
    Backend {
        store: &'static str,
        message: String,
    },
}

impl CacheError {
    pub fn backend(store: &'static str, message: impl Into<String>) -> Self {
        Self::Backend {
            store,
            message: message.into(),
        }
    }
}
