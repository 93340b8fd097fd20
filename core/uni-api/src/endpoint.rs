//! Typed helpers over the CRUD endpoints every entity module exposes.

use crate::client::{decode, ApiResult, RemoteClient};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;
use uni_events::{EventBus, UniEvent};
use uni_types::{ApiError, FindQuery};

/// One entity module on the back-end, e.g. `/user`.
#[derive(Clone)]
pub struct EntityEndpoint {
    client: Arc<dyn RemoteClient>,
    path: String,
    bus: Option<EventBus>,
}

impl EntityEndpoint {
    pub fn new(client: Arc<dyn RemoteClient>, path: impl Into<String>) -> Self {
        Self {
            client,
            path: path.into(),
            bus: None,
        }
    }

    /// Announces deletions on `bus` as [`UniEvent::EntityDeleted`].
    pub fn with_bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn client(&self) -> &Arc<dyn RemoteClient> {
        &self.client
    }

    /// `{path}/get?entity_id={id}`
    pub fn get_path(&self, id: &str) -> String {
        format!("{}/get?entity_id={}", self.path, urlencoding::encode(id))
    }

    /// `{path}/update`
    pub fn update_path(&self) -> String {
        format!("{}/update", self.path)
    }

    /// Fetches one record as raw JSON.
    pub async fn get_raw(&self, id: &str) -> ApiResult<Value> {
        self.client.post(&self.get_path(id), json!({})).await
    }

    pub async fn get<T: DeserializeOwned>(&self, id: &str) -> ApiResult<T> {
        decode(self.get_raw(id).await?)
    }

    /// Sends a partial update. `body` must carry the record `id`.
    pub async fn update(&self, body: Value) -> ApiResult<Value> {
        self.client.post(&self.update_path(), body).await
    }

    pub async fn create<T: Serialize>(&self, record: &T) -> ApiResult<Value> {
        let body = serde_json::to_value(record).map_err(ApiError::decode)?;
        self.client.post(&format!("{}/create", self.path), body).await
    }

    pub async fn delete(&self, id: &str) -> ApiResult<()> {
        let endpoint = format!("{}/delete?entity_id={}", self.path, urlencoding::encode(id));
        self.client.post(&endpoint, json!({})).await?;
        debug!("Deleted {} from {}", id, self.path);

        if let Some(bus) = &self.bus {
            bus.publish(UniEvent::EntityDeleted {
                endpoint: self.path.clone(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    pub async fn find<T: DeserializeOwned>(&self, query: &FindQuery) -> ApiResult<Vec<T>> {
        let body = serde_json::to_value(query).map_err(ApiError::decode)?;
        decode(self.client.post(&format!("{}/find", self.path), body).await?)
    }

    pub async fn count(&self, query: &FindQuery) -> ApiResult<u64> {
        let body = serde_json::to_value(query).map_err(ApiError::decode)?;
        decode(self.client.post(&format!("{}/count", self.path), body).await?)
    }
}
