// Error taxonomy for generation, export, and persistence.
//
// Configuration problems are detected eagerly by `GeneratorConfig::validate`
// and by the enum parsers, before any random draw happens. Nothing here is
// retryable: every core operation is a pure function of its inputs, so a
// failure always points at the configuration or the environment.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChordError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("missing external dependency: {0} (rebuild with the `midi` feature)")]
    MissingExternalDependency(&'static str),
    #[error("preset not found: {}", .0.display())]
    PresetNotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ChordError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        ChordError::InvalidConfiguration(message.into())
    }
}

pub type Result<T> = std::result::Result<T, ChordError>;
