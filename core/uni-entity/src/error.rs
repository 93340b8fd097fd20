//! Error types for entity binding.

use serde_json::Value;
use thiserror::Error;
use uni_types::ApiError;

/// Result type for entity operations.
pub type EntityResult<T> = Result<T, EntityError>;

/// Errors raised inside the binder before they are turned into notifications.
#[derive(Debug, Error)]
pub enum EntityError {
    /// The remote call failed.
    #[error("remote error: {0}")]
    Api(#[from] ApiError),

    /// The record could not be converted to or from its JSON form.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The record does not serialize to a JSON object, so it has no fields to diff.
    #[error("record is not a JSON object")]
    NotAnObject,
}

impl EntityError {
    /// The value shown to the user. Remote errors surface their envelope
    /// `detail` unchanged.
    pub fn detail(&self) -> Value {
        match self {
            EntityError::Api(e) => match &e.detail {
                Value::Null => Value::String(e.text.clone()),
                detail => detail.clone(),
            },
            other => Value::String(other.to_string()),
        }
    }
}
