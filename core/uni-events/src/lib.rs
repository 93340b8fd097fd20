//! Event bus, key/value store and notification sink for the Uni client.
//!
//! The three pieces stack:
//! - [`EventBus`] is an injected publish/subscribe channel. Nothing here is
//!   process-global; every component that needs events is handed a bus.
//! - [`KvStore`] keeps JSON values by key and publishes a storage event on
//!   every mutation, so other components can follow a key.
//! - [`Toaster`] is a [`Notifier`] that writes the latest notification into
//!   the store, where a UI layer subscribes to it.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use uni_events::{EventBus, KvStore, Notifier, Toaster};
//!
//! let bus = EventBus::new();
//! let store = Arc::new(KvStore::in_memory(bus.clone()));
//! let toaster = Toaster::new(store);
//!
//! toaster.success("success", "Saved");
//! assert_eq!(toaster.current().unwrap().message, "Saved");
//! ```

mod bus;
mod error;
mod notify;
mod store;

pub use bus::{EventBus, Subscription, UniEvent, DEFAULT_CAPACITY};
pub use error::{EventsError, EventsResult};
pub use notify::{Notification, Notifier, RecordingNotifier, Severity, Toaster, TOASTER_STORAGE_KEY};
pub use store::KvStore;
