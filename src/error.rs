use std::path::PathBuf;

use thiserror::Error;

use crate::config::LoadError;
use crate::pipeline::ServiceError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] LoadError),
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid replay input {path}: {source}")]
    Input {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to seed documents: {0}")]
    Seed(#[from] ServiceError),
    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

impl AppError {
    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn input(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Input {
            path: path.into(),
            source,
        }
    }
}
