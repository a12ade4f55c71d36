//! Error types for the ingestion pipeline.
//!
//! Topic, action and decode failures are non-fatal: the message is dropped
//! and logged, never retried. Storage failures on the reading write
//! propagate to the message handler; everywhere else they stay inside the
//! task that hit them.

use thiserror::Error;

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Ingestion error types.
#[derive(Debug, Error)]
pub enum Error {
    /// Topic does not match the expected grammar.
    #[error("Invalid topic format: {0}")]
    Topic(String),

    /// Action segment names no known message kind.
    #[error("Unsupported action: {0}")]
    UnsupportedAction(String),

    /// Payload bytes are not valid for the action's schema.
    #[error("Failed to decode payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// Persistence collaborator failed.
    #[error("Storage error: {0}")]
    Storage(#[from] skywatch_storage::Error),
}
