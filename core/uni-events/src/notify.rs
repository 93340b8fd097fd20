//! Transient user-facing notifications.

use crate::store::KvStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

/// Store key the toaster writes the current notification to.
pub const TOASTER_STORAGE_KEY: &str = "uni.toaster.message";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
    Success,
}

/// A single toast/snackbar message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub severity: Severity,
}

impl Notification {
    pub fn new(title: impl Into<String>, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            severity,
        }
    }

    /// Builds a notification from an arbitrary detail value. Strings are
    /// used verbatim, anything else is rendered as JSON.
    pub fn from_detail(title: impl Into<String>, detail: &Value, severity: Severity) -> Self {
        let message = match detail {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Self::new(title, message, severity)
    }
}

/// Sink for user-facing notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);

    fn error(&self, title: &str, message: &str) {
        self.notify(Notification::new(title, message, Severity::Error));
    }

    fn warning(&self, title: &str, message: &str) {
        self.notify(Notification::new(title, message, Severity::Warning));
    }

    fn info(&self, title: &str, message: &str) {
        self.notify(Notification::new(title, message, Severity::Info));
    }

    fn success(&self, title: &str, message: &str) {
        self.notify(Notification::new(title, message, Severity::Success));
    }
}

/// Notifier that publishes through the key/value store.
///
/// Only the latest notification is kept; a UI follows
/// [`TOASTER_STORAGE_KEY`] on the bus and clears it once shown.
pub struct Toaster {
    store: Arc<KvStore>,
    key: String,
}

impl Toaster {
    pub fn new(store: Arc<KvStore>) -> Self {
        Self::with_key(store, TOASTER_STORAGE_KEY)
    }

    pub fn with_key(store: Arc<KvStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The notification currently on display, if any.
    pub fn current(&self) -> Option<Notification> {
        self.store.get_as(&self.key).ok().flatten()
    }

    /// Dismisses the current notification.
    pub fn clear(&self) {
        if let Err(e) = self.store.delete(&self.key) {
            warn!("Failed to clear notification: {}", e);
        }
    }
}

impl Notifier for Toaster {
    fn notify(&self, notification: Notification) {
        debug!(
            "Toast [{:?}] {}: {}",
            notification.severity, notification.title, notification.message
        );
        if let Err(e) = self.store.set(&self.key, &notification) {
            warn!("Failed to publish notification: {}", e);
        }
    }
}

/// Notifier that keeps every notification in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    entries: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last(&self) -> Option<Notification> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    /// Number of recorded notifications with the given severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|n| n.severity == severity)
            .count()
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
    }
}
