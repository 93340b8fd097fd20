//! The error envelope returned by the Uni back-end.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Error envelope `{status, text, detail}`.
///
/// Every failed request, including transport failures that never reached the
/// server, is normalized into this shape before it leaves the client.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{status} {text}: {detail}")]
pub struct ApiError {
    pub status: u16,
    pub text: String,
    pub detail: Value,
}

impl ApiError {
    pub fn new(status: u16, text: impl Into<String>, detail: impl Into<Value>) -> Self {
        Self {
            status,
            text: text.into(),
            detail: detail.into(),
        }
    }

    /// The envelope used when nothing better is known (server down, CORS, ...).
    pub fn unknown() -> Self {
        Self::new(500, "error", "unknown server error")
    }

    /// A response arrived but its body could not be decoded.
    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::new(500, "decode error", err.to_string())
    }

    /// `detail` as user-facing text. Strings are shown verbatim, anything
    /// else is rendered as JSON.
    pub fn detail_message(&self) -> String {
        match &self.detail {
            Value::String(s) => s.clone(),
            Value::Null => self.text.clone(),
            other => other.to_string(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}
