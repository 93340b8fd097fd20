//! Key/value store with change events.
//!
//! Values are arbitrary JSON. Every `set` and `delete` publishes a storage
//! event on the bus, including writes that do not change the stored value.
//! The file backend rewrites the whole file after each mutation, going
//! through a temporary file and a rename so a crash never leaves it torn.

use crate::bus::{EventBus, UniEvent};
use crate::error::EventsResult;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// JSON key/value store that announces its mutations on an [`EventBus`].
#[derive(Debug)]
pub struct KvStore {
    entries: Mutex<BTreeMap<String, Value>>,
    path: Option<PathBuf>,
    bus: EventBus,
}

impl KvStore {
    /// Creates a store that lives only as long as the process.
    pub fn in_memory(bus: EventBus) -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            path: None,
            bus,
        }
    }

    /// Opens a store backed by a JSON file, creating it on first write.
    pub fn open(path: impl AsRef<Path>, bus: EventBus) -> EventsResult<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let raw = fs::read(&path)?;
            if raw.is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_slice(&raw)?
            }
        } else {
            BTreeMap::new()
        };
        debug!("Opened store {:?} with {} keys", path, entries.len());

        Ok(Self {
            entries: Mutex::new(entries),
            path: Some(path),
            bus,
        })
    }

    /// The bus this store publishes on.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.lock().get(key).cloned()
    }

    /// Reads a key and decodes it. A missing key or a stored `null` is `None`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> EventsResult<Option<T>> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    /// Stores a value and publishes [`UniEvent::StorageUpdate`].
    /// If the file cannot be written the store is left as it was and no
    /// event is published.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> EventsResult<()> {
        let value = serde_json::to_value(value)?;
        {
            let mut entries = self.lock();
            let previous = entries.insert(key.to_string(), value.clone());
            if let Err(e) = self.persist(&entries) {
                match previous {
                    Some(previous) => entries.insert(key.to_string(), previous),
                    None => entries.remove(key),
                };
                return Err(e);
            }
        }
        self.bus.publish(UniEvent::StorageUpdate {
            key: key.to_string(),
            value,
        });
        Ok(())
    }

    /// Removes a key and publishes [`UniEvent::StorageDelete`].
    /// Returns the removed value.
    pub fn delete(&self, key: &str) -> EventsResult<Option<Value>> {
        let removed = {
            let mut entries = self.lock();
            let removed = entries.remove(key);
            if let Some(value) = &removed {
                if let Err(e) = self.persist(&entries) {
                    entries.insert(key.to_string(), value.clone());
                    return Err(e);
                }
            }
            removed
        };
        self.bus.publish(UniEvent::StorageDelete {
            key: key.to_string(),
        });
        Ok(removed)
    }

    fn persist(&self, entries: &BTreeMap<String, Value>) -> EventsResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Value>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
