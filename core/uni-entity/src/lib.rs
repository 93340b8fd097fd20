//! Editable working copies of remote Uni records.
//!
//! - [`EntityBinder`] binds one record: canonical copy, edit buffer,
//!   partial-field saves and remote-change detection.
//! - [`EntityList`] binds the result of a find query.
//! - [`structural_eq`] and [`diff_fields`] are the comparison primitives
//!   both are built on.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use serde_json::{json, Value};
//! use uni_api::{ApiConfig, EntityEndpoint, HttpClient};
//! use uni_entity::{BinderConfig, EntityBinder};
//! use uni_events::{EventBus, KvStore, Toaster};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(KvStore::in_memory(EventBus::new()));
//! let client = Arc::new(HttpClient::new(ApiConfig::default(), store.clone())?);
//! let endpoint = EntityEndpoint::new(client, "/user");
//!
//! let binder = EntityBinder::<Value>::bind(
//!     endpoint,
//!     "42",
//!     Arc::new(Toaster::new(store)),
//!     BinderConfig::default(),
//! )
//! .await;
//!
//! binder.handle_form(json!("hello"), "note").await;
//! binder.save().await;
//! # Ok(())
//! # }
//! ```

mod binder;
mod error;
mod list;
mod pending;
mod value;

pub use binder::{
    BinderConfig, EntityBinder, EntitySnapshot, EntityStatus, LoadOutcome, SaveOutcome, SavePolicy,
};
pub use error::{EntityError, EntityResult};
pub use list::{EntityList, ListConfig, ListOutcome};
pub use value::{diff_fields, structural_eq};
