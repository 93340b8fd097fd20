#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uni_api::{ApiResult, EntityEndpoint, RemoteClient};
use uni_entity::{BinderConfig, EntityBinder};
use uni_events::RecordingNotifier;
use uni_types::ApiError;

/// In-memory back-end speaking the entity endpoint protocol.
///
/// `update` merges the sent fields into the stored record and moves its
/// `updated.timestamp` forward, like the real back-end does.
#[derive(Default)]
pub struct FakeRemote {
    records: Mutex<BTreeMap<String, Value>>,
    calls: Mutex<Vec<(String, Value)>>,
    failing: Mutex<HashSet<&'static str>>,
    delays: Mutex<HashMap<String, Duration>>,
}

impl FakeRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn put(&self, id: &str, record: Value) {
        self.records.lock().unwrap().insert(id.to_string(), record);
    }

    pub fn record(&self, id: &str) -> Option<Value> {
        self.records.lock().unwrap().get(id).cloned()
    }

    /// Makes every call of `op` (`get`, `update`, `count`, `find`) fail.
    pub fn fail(&self, op: &'static str) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn recover(&self, op: &'static str) {
        self.failing.lock().unwrap().remove(op);
    }

    /// Delays `op`, or a `get` of one specific id (`get:<id>`).
    pub fn delay(&self, key: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(key.to_string(), delay);
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    /// Bodies of the calls whose endpoint contains `op`.
    pub fn calls_to(&self, op: &str) -> Vec<Value> {
        self.calls()
            .into_iter()
            .filter(|(endpoint, _)| endpoint.contains(op))
            .map(|(_, body)| body)
            .collect()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn failing(&self, op: &str) -> bool {
        self.failing.lock().unwrap().contains(op)
    }

    fn delay_for(&self, key: &str) -> Option<Duration> {
        self.delays.lock().unwrap().get(key).copied()
    }
}

#[async_trait]
impl RemoteClient for FakeRemote {
    async fn get(&self, endpoint: &str, _params: &[(&str, &str)]) -> ApiResult<Value> {
        self.calls
            .lock()
            .unwrap()
            .push((endpoint.to_string(), Value::Null));
        Err(ApiError::new(405, "Method Not Allowed", "GET not supported"))
    }

    async fn post(&self, endpoint: &str, body: Value) -> ApiResult<Value> {
        self.calls
            .lock()
            .unwrap()
            .push((endpoint.to_string(), body.clone()));

        let (path, query) = endpoint.split_once('?').unwrap_or((endpoint, ""));
        let op = path.rsplit('/').next().unwrap_or_default();

        if let Some(delay) = self.delay_for(op) {
            tokio::time::sleep(delay).await;
        }

        match op {
            "get" => {
                let id = query.strip_prefix("entity_id=").unwrap_or_default();
                if let Some(delay) = self.delay_for(&format!("get:{id}")) {
                    tokio::time::sleep(delay).await;
                }
                if self.failing("get") {
                    return Err(ApiError::new(503, "Service Unavailable", "backend down"));
                }
                self.record(id)
                    .ok_or_else(|| ApiError::new(404, "Not Found", "record not found"))
            }
            "update" => {
                if self.failing("update") {
                    return Err(ApiError::new(422, "Unprocessable Entity", "update rejected"));
                }
                let id = body["id"].as_str().unwrap_or_default().to_string();
                let mut records = self.records.lock().unwrap();
                let record = records
                    .get_mut(&id)
                    .ok_or_else(|| ApiError::new(404, "Not Found", "record not found"))?;
                let fields = record.as_object_mut().unwrap();
                for (key, value) in body.as_object().unwrap() {
                    fields.insert(key.clone(), value.clone());
                }
                let timestamp = fields
                    .get("updated")
                    .and_then(|u| u["timestamp"].as_i64())
                    .unwrap_or(0);
                fields.insert(
                    "updated".into(),
                    json!({"user_id": "me", "timestamp": timestamp + 1}),
                );
                Ok(Value::Bool(true))
            }
            "count" => {
                if self.failing("count") {
                    return Err(ApiError::new(500, "Internal Server Error", "count failed"));
                }
                Ok(json!(self.records.lock().unwrap().len()))
            }
            "find" => {
                if self.failing("find") {
                    return Err(ApiError::new(500, "Internal Server Error", "find failed"));
                }
                let records: Vec<Value> = self.records.lock().unwrap().values().cloned().collect();
                Ok(Value::Array(records))
            }
            other => Err(ApiError::new(404, "Not Found", format!("no such operation: {other}"))),
        }
    }
}

pub fn endpoint(remote: &Arc<FakeRemote>) -> EntityEndpoint {
    EntityEndpoint::new(remote.clone(), "/note")
}

/// A binder over `remote` with default config, not yet loaded.
pub fn binder(
    remote: &Arc<FakeRemote>,
    id: &str,
) -> (Arc<EntityBinder<Value>>, Arc<RecordingNotifier>) {
    binder_with(remote, id, BinderConfig::default())
}

pub fn binder_with(
    remote: &Arc<FakeRemote>,
    id: &str,
    config: BinderConfig,
) -> (Arc<EntityBinder<Value>>, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::new());
    let binder = Arc::new(EntityBinder::with_config(
        endpoint(remote),
        id,
        notifier.clone(),
        config,
    ));
    (binder, notifier)
}

pub fn note(id: &str, note: &str, timestamp: i64) -> Value {
    json!({
        "id": id,
        "note": note,
        "enabled": true,
        "updated": {"user_id": "someone", "timestamp": timestamp}
    })
}
