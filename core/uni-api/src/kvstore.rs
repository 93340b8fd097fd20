//! Client for the back-end's own key/value store (`/kvstore/*`).
//!
//! Unlike [`uni_events::KvStore`], which keeps values on this machine,
//! entries here live on the server and follow the logged-in user.

use crate::client::{decode, ApiResult, RemoteClient};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};
use uni_events::Notifier;
use uni_types::{ApiError, KvEntry};

pub const KV_GET_ENDPOINT: &str = "/kvstore/get";
pub const KV_SET_ENDPOINT: &str = "/kvstore/set";
pub const KV_DELETE_ENDPOINT: &str = "/kvstore/delete";

/// Server-side key/value store. Failures raise an error notification and
/// are also returned to the caller.
#[derive(Clone)]
pub struct RemoteKvStore {
    client: Arc<dyn RemoteClient>,
    notifier: Arc<dyn Notifier>,
}

impl RemoteKvStore {
    pub fn new(client: Arc<dyn RemoteClient>, notifier: Arc<dyn Notifier>) -> Self {
        Self { client, notifier }
    }

    /// Reads `key`. A key that was never set yields `None`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> ApiResult<Option<T>> {
        let endpoint = format!("{}?key={}", KV_GET_ENDPOINT, urlencoding::encode(key));
        let result = self
            .client
            .post(&endpoint, json!({}))
            .await
            .and_then(decode::<KvEntry>)
            .and_then(|entry| match entry.value {
                Value::Null => Ok(None),
                value => decode(value).map(Some),
            });
        self.report(result, key, "Failed to get value from KV store")
    }

    /// Stores `value` under `key` and returns the id of the stored entry.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> ApiResult<String> {
        let result = match serde_json::to_value(value) {
            Ok(value) => self
                .client
                .post(KV_SET_ENDPOINT, json!({"key": key, "value": value}))
                .await
                .and_then(decode::<String>),
            Err(e) => Err(ApiError::decode(e)),
        };
        self.report(result, key, "Failed to set value in KV store")
    }

    pub async fn delete(&self, key: &str) -> ApiResult<()> {
        let endpoint = format!("{}?key={}", KV_DELETE_ENDPOINT, urlencoding::encode(key));
        let result = self.client.post(&endpoint, json!({})).await.map(|_| ());
        self.report(result, key, "Failed to delete value from KV store")
    }

    fn report<T>(&self, result: ApiResult<T>, key: &str, message: &str) -> ApiResult<T> {
        match &result {
            Ok(_) => debug!("KV store {} ok", key),
            Err(e) => {
                warn!("KV store {} failed: {}", key, e);
                self.notifier.error("error", message);
            }
        }
        result
    }
}
