//! Error types for the datalink store.

use thiserror::Error;

/// Errors that can occur while resolving, reading or writing datalinks.
#[derive(Error, Debug)]
pub enum DatalinkError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown datalink: {0}")]
    UnknownDatalink(String),

    #[error("Corrupt datalink store {path}: {reason}")]
    Store { path: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DatalinkError {
    pub(crate) fn store(path: &std::path::Path, reason: impl Into<String>) -> Self {
        DatalinkError::Store {
            path: path.display().to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for datalink operations.
pub type DatalinkResult<T> = Result<T, DatalinkError>;
