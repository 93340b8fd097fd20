//! Record metadata stamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who touched a record and when.
///
/// The back-end stamps `created`, `updated` and `accessed` with this shape.
/// `timestamp` is in milliseconds since the Unix epoch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelMeta {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl ModelMeta {
    /// Creates a stamp for the given user at the given millisecond timestamp.
    #[must_use]
    pub fn new(user_id: impl Into<String>, timestamp: i64) -> Self {
        Self {
            user_id: Some(user_id.into()),
            timestamp: Some(timestamp),
        }
    }

    /// Creates a stamp with no user at the given millisecond timestamp.
    #[must_use]
    pub fn at(timestamp: i64) -> Self {
        Self {
            user_id: None,
            timestamp: Some(timestamp),
        }
    }

    /// Returns the stamp as a UTC datetime, if it carries a valid timestamp.
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        self.timestamp.and_then(DateTime::from_timestamp_millis)
    }
}
