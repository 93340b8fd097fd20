//! HTTP API and notification sink for the Uni record watcher.

use axum::{extract::State, response::Json, routing::get, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};
use uni_entity::{EntityBinder, EntitySnapshot, EntityStatus};
use uni_events::{Notification, Notifier, Severity};

/// The binder the watcher serves.
pub type WatchedEntity = EntityBinder<Value>;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HealthResponse {
    pub endpoint: String,
    pub id: String,
    pub status: EntityStatus,
    pub loaded: bool,
    pub loading: bool,
    pub closed: bool,
}

async fn entity_handler(State(binder): State<Arc<WatchedEntity>>) -> Json<EntitySnapshot<Value>> {
    Json(binder.snapshot().await)
}

async fn health_handler(State(binder): State<Arc<WatchedEntity>>) -> Json<HealthResponse> {
    let snapshot = binder.snapshot().await;
    Json(HealthResponse {
        endpoint: binder.endpoint().path().to_string(),
        id: snapshot.id,
        status: snapshot.status,
        loaded: snapshot.canonical.is_some(),
        loading: snapshot.loading,
        closed: binder.is_closed(),
    })
}

/// Build the HTTP API router over the watched binder.
pub fn build_router(binder: Arc<WatchedEntity>) -> Router {
    Router::new()
        .route("/api/v1/entity", get(entity_handler))
        .route("/api/v1/health", get(health_handler))
        .with_state(binder)
}

/// Notifier that writes every notification to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        let Notification {
            title,
            message,
            severity,
        } = notification;
        match severity {
            Severity::Error => error!("[{}] {}", title, message),
            Severity::Warning => warn!("[{}] {}", title, message),
            Severity::Info | Severity::Success => info!("[{}] {}", title, message),
        }
    }
}
