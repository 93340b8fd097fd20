//! Publish/subscribe channel for client-side events.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::warn;

/// Default number of events buffered per subscriber before it lags.
pub const DEFAULT_CAPACITY: usize = 256;

/// Events carried on the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UniEvent {
    /// A store key was written.
    StorageUpdate { key: String, value: Value },
    /// A store key was removed.
    StorageDelete { key: String },
    /// A record was deleted through an entity endpoint.
    EntityDeleted { endpoint: String, id: String },
}

impl UniEvent {
    /// Stable event name, matching the names the web front-end dispatches.
    pub fn name(&self) -> &'static str {
        match self {
            UniEvent::StorageUpdate { .. } => "uni.event.storage.update",
            UniEvent::StorageDelete { .. } => "uni.event.storage.delete",
            UniEvent::EntityDeleted { .. } => "uni.event.entity.deleted",
        }
    }

    /// The store key this event concerns, if it is a storage event.
    pub fn storage_key(&self) -> Option<&str> {
        match self {
            UniEvent::StorageUpdate { key, .. } | UniEvent::StorageDelete { key } => Some(key),
            UniEvent::EntityDeleted { .. } => None,
        }
    }
}

/// Cloneable handle to a broadcast channel of [`UniEvent`]s.
///
/// Clones share the same channel. Events published while nobody is
/// subscribed are dropped.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<UniEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event. Returns how many subscribers will see it.
    pub fn publish(&self, event: UniEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Subscribes to every event published from now on.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
            key: None,
        }
    }

    /// Subscribes to storage events for a single key.
    pub fn subscribe_key(&self, key: impl Into<String>) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
            key: Some(key.into()),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving end of an [`EventBus`], optionally filtered to one store key.
pub struct Subscription {
    receiver: broadcast::Receiver<UniEvent>,
    key: Option<String>,
}

impl Subscription {
    /// Waits for the next matching event. Returns `None` once every bus
    /// handle has been dropped.
    pub async fn recv(&mut self) -> Option<UniEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.matches(&event) => return Some(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Event subscriber lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Returns the next matching event if one is already queued.
    pub fn try_recv(&mut self) -> Option<UniEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.matches(&event) => return Some(event),
                Ok(_) => continue,
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!("Event subscriber lagged, skipped {} events", skipped);
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    fn matches(&self, event: &UniEvent) -> bool {
        match &self.key {
            None => true,
            Some(key) => event.storage_key() == Some(key.as_str()),
        }
    }
}
