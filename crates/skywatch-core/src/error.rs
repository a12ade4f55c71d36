//! Core error type shared across the workspace.

use thiserror::Error;

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types.
#[derive(Debug, Error)]
pub enum Error {
    /// Storage/persistence error.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Resource not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid input.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Transport/communication error.
    #[error("Communication error: {0}")]
    Communication(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
