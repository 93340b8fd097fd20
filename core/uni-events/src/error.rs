//! Error types for the events layer.

use thiserror::Error;

/// Result type for store operations.
pub type EventsResult<T> = Result<T, EventsError>;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum EventsError {
    /// Reading or writing the backing file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
