//! Binding of one remote record to an editable working copy.
//!
//! An [`EntityBinder`] holds two copies of a record: the *canonical* copy as
//! last fetched from the back-end, and the *buffer* the user edits. Saving
//! sends only the fields that differ between the two, then reloads so both
//! copies agree with the authoritative post-save state.
//!
//! Background reloads never touch a buffer that already exists. When a
//! reload shows that someone else changed the record (its `updated` stamp
//! moved) and the buffer does not already match the new copy, the binder
//! raises the `modified` flag instead.
//!
//! Every failure ends up as a notification. The binder stays usable after
//! any error and every operation can simply be retried.

use crate::error::{EntityError, EntityResult};
use crate::pending::Pending;
use crate::value::{diff_fields, structural_eq, updated_stamp};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::{debug, info, warn};
use uni_api::EntityEndpoint;
use uni_events::{Notification, Notifier, Severity};
use uni_scheduler::ScheduledTask;

/// What to do when `save` is called while another save is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SavePolicy {
    /// Refuse the second save with a warning notification.
    #[default]
    Reject,
    /// Wait for the running save to finish, then diff again.
    Queue,
}

/// Binder configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BinderConfig {
    pub save_policy: SavePolicy,
}

/// Result of a [`EntityBinder::load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The id is empty; canonical and buffer were cleared.
    Cleared,
    Loaded,
    /// The fetch failed and an error notification was raised.
    Failed,
    /// The response arrived for an id that is no longer bound, or after close.
    Discarded,
    /// `set_id` was called with the id already bound.
    Unchanged,
}

/// Result of a [`EntityBinder::save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Buffer and canonical already agree; no request was sent.
    NothingToSave,
    Saved,
    Failed,
    /// Another save was running and the policy is [`SavePolicy::Reject`].
    Rejected,
    /// No canonical copy to diff against.
    NotLoaded,
    /// The binder was closed.
    Discarded,
}

/// Short status derived from the binder flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityStatus {
    /// The record changed remotely while the buffer was being edited.
    Modified,
    /// The buffer holds edits that were not saved.
    Unsaved,
    Saved,
}

impl fmt::Display for EntityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityStatus::Modified => "modified remotely",
            EntityStatus::Unsaved => "unsaved changes",
            EntityStatus::Saved => "saved",
        })
    }
}

/// Point-in-time view of a binder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitySnapshot<T> {
    pub id: String,
    pub canonical: Option<T>,
    pub buffer: Option<T>,
    pub modified: bool,
    pub saved: bool,
    pub loading: bool,
    pub status: EntityStatus,
}

/// A record together with its JSON form. All comparisons use the JSON form.
#[derive(Debug, Clone)]
struct Tracked<T> {
    record: T,
    json: Value,
}

impl<T: Serialize + DeserializeOwned> Tracked<T> {
    fn from_record(record: T) -> EntityResult<Self> {
        let json = serde_json::to_value(&record)?;
        Ok(Self { record, json })
    }

    fn from_json(json: Value) -> EntityResult<Self> {
        Self::from_record(serde_json::from_value(json)?)
    }
}

struct BinderState<T> {
    id: String,
    /// Bumped on every id change. Responses tagged with an older
    /// generation are dropped.
    generation: u64,
    canonical: Option<Tracked<T>>,
    previous: Option<Tracked<T>>,
    buffer: Option<Tracked<T>>,
    modified: bool,
    saved: bool,
}

impl<T> BinderState<T> {
    fn new(id: String) -> Self {
        Self {
            id,
            generation: 0,
            canonical: None,
            previous: None,
            buffer: None,
            modified: false,
            saved: true,
        }
    }

    fn reset(&mut self) {
        self.canonical = None;
        self.previous = None;
        self.buffer = None;
        self.modified = false;
        self.saved = true;
    }

    fn refresh_saved(&mut self) {
        self.saved = match (&self.buffer, &self.canonical) {
            (Some(buffer), Some(canonical)) => structural_eq(&buffer.json, &canonical.json),
            (None, None) => true,
            _ => false,
        };
    }

    fn status(&self) -> EntityStatus {
        if self.modified {
            EntityStatus::Modified
        } else if !self.saved {
            EntityStatus::Unsaved
        } else {
            EntityStatus::Saved
        }
    }
}

/// Keeps one remote record and its working copy consistent.
pub struct EntityBinder<T> {
    endpoint: EntityEndpoint,
    notifier: Arc<dyn Notifier>,
    config: BinderConfig,
    state: RwLock<BinderState<T>>,
    pending: Pending,
    closed: AtomicBool,
    save_lock: Mutex<()>,
}

impl<T> EntityBinder<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Creates an unloaded binder. Call [`load`](Self::load) to fetch.
    pub fn new(
        endpoint: EntityEndpoint,
        id: impl Into<String>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self::with_config(endpoint, id, notifier, BinderConfig::default())
    }

    pub fn with_config(
        endpoint: EntityEndpoint,
        id: impl Into<String>,
        notifier: Arc<dyn Notifier>,
        config: BinderConfig,
    ) -> Self {
        Self {
            endpoint,
            notifier,
            config,
            state: RwLock::new(BinderState::new(id.into())),
            pending: Pending::default(),
            closed: AtomicBool::new(false),
            save_lock: Mutex::new(()),
        }
    }

    /// Creates a binder for `(endpoint, id)` and runs the initial load.
    pub async fn bind(
        endpoint: EntityEndpoint,
        id: impl Into<String>,
        notifier: Arc<dyn Notifier>,
        config: BinderConfig,
    ) -> Arc<Self> {
        let binder = Arc::new(Self::with_config(endpoint, id, notifier, config));
        binder.load(false).await;
        binder
    }

    pub fn endpoint(&self) -> &EntityEndpoint {
        &self.endpoint
    }

    pub fn config(&self) -> &BinderConfig {
        &self.config
    }

    // ── Loading ─────────────────────────────────────────────────

    /// Rebinds to another id: resets every copy and flag, then loads.
    pub async fn set_id(&self, id: impl Into<String>) -> LoadOutcome {
        let id = id.into();
        {
            let mut state = self.state.write().await;
            if state.id == id {
                return LoadOutcome::Unchanged;
            }
            debug!("Rebinding {} from {:?} to {:?}", self.endpoint.path(), state.id, id);
            state.id = id;
            state.generation += 1;
            state.reset();
        }
        self.load(false).await
    }

    /// Fetches the record and stores it as the canonical copy.
    ///
    /// The buffer is overwritten only when it is absent or `replace_buffer`
    /// is set; otherwise the staleness check decides whether to raise
    /// `modified`. A failed fetch leaves both copies untouched.
    pub async fn load(&self, replace_buffer: bool) -> LoadOutcome {
        if self.is_closed() {
            return LoadOutcome::Discarded;
        }

        let (id, generation) = {
            let state = self.state.read().await;
            (state.id.clone(), state.generation)
        };

        if id.is_empty() {
            let mut state = self.state.write().await;
            if state.generation != generation {
                return LoadOutcome::Discarded;
            }
            state.reset();
            return LoadOutcome::Cleared;
        }

        let _pending = self.pending.begin();
        debug!("Loading {} {}", self.endpoint.path(), id);
        let result = self.fetch(&id).await;

        if self.is_closed() {
            debug!("Binder closed, dropping response for {}", id);
            return LoadOutcome::Discarded;
        }

        let mut state = self.state.write().await;
        if state.generation != generation {
            debug!("Dropping stale response for {}", id);
            return LoadOutcome::Discarded;
        }

        match result {
            Ok(fetched) => {
                Self::apply(&mut state, fetched, replace_buffer, self.endpoint.path());
                LoadOutcome::Loaded
            }
            Err(e) => {
                drop(state);
                warn!("Failed to load {} {}: {}", self.endpoint.path(), id, e);
                self.notify_error(&e);
                LoadOutcome::Failed
            }
        }
    }

    async fn fetch(&self, id: &str) -> EntityResult<Tracked<T>> {
        let json = self.endpoint.get_raw(id).await?;
        Tracked::from_json(json)
    }

    fn apply(state: &mut BinderState<T>, fetched: Tracked<T>, replace_buffer: bool, path: &str) {
        state.previous = state.canonical.replace(fetched.clone());

        if replace_buffer || state.buffer.is_none() {
            state.buffer = Some(fetched);
            state.modified = false;
        } else if let (Some(previous), Some(buffer)) = (&state.previous, &state.buffer) {
            let stamp_moved =
                !structural_eq(updated_stamp(&previous.json), updated_stamp(&fetched.json));
            if stamp_moved && !structural_eq(&buffer.json, &fetched.json) {
                if !state.modified {
                    info!("{} {} was modified remotely", path, state.id);
                }
                state.modified = true;
            }
        }

        state.refresh_saved();
    }

    // ── Editing ─────────────────────────────────────────────────

    /// Replaces the buffer. With `save` set, saves exactly `value`.
    pub async fn update_buffer(&self, value: T, save: bool) -> Option<SaveOutcome> {
        let tracked = match Tracked::from_record(value) {
            Ok(tracked) => tracked,
            Err(e) => {
                self.notify_error(&e);
                return save.then_some(SaveOutcome::Failed);
            }
        };
        let captured = tracked.json.clone();

        {
            let mut state = self.state.write().await;
            state.buffer = Some(tracked);
            state.refresh_saved();
        }

        if save {
            Some(self.save_value(Some(captured)).await)
        } else {
            None
        }
    }

    /// Sets one field of the buffer. Does nothing when no buffer exists.
    pub async fn handle_form(&self, value: impl Serialize, field: &str) {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                self.notify_error(&EntityError::from(e));
                return;
            }
        };

        let mut state = self.state.write().await;
        let Some(buffer) = &state.buffer else {
            debug!("No buffer to set {} on", field);
            return;
        };

        let mut json = buffer.json.clone();
        let merged = match json.as_object_mut() {
            Some(fields) => {
                fields.insert(field.to_string(), value);
                Tracked::from_json(json)
            }
            None => Err(EntityError::NotAnObject),
        };

        match merged {
            Ok(tracked) => {
                state.buffer = Some(tracked);
                state.refresh_saved();
            }
            Err(e) => {
                drop(state);
                self.notify_error(&e);
            }
        }
    }

    /// Acknowledges a remote modification without reloading.
    pub async fn clear_modified(&self) {
        self.state.write().await.modified = false;
    }

    // ── Saving ──────────────────────────────────────────────────

    /// Sends the fields of the buffer that differ from the canonical copy.
    ///
    /// The edits are taken when `save` is called. Under
    /// [`SavePolicy::Queue`] they are sent once the running save finishes,
    /// minus any field the fresh canonical copy already holds.
    pub async fn save(&self) -> SaveOutcome {
        self.save_value(None).await
    }

    async fn save_value(&self, captured: Option<Value>) -> SaveOutcome {
        if self.is_closed() {
            return SaveOutcome::Discarded;
        }
        let (id, generation, edits) = match self.pending_edits(captured).await {
            Ok(pending) => pending,
            Err(outcome) => return outcome,
        };

        let Some(_lock) = self.acquire_save().await else {
            return SaveOutcome::Rejected;
        };
        if self.is_closed() {
            return SaveOutcome::Discarded;
        }

        let mut diff = {
            let state = self.state.read().await;
            if state.generation != generation {
                debug!("Id changed while {} waited to save, dropping edits", id);
                return SaveOutcome::Discarded;
            }
            let Some(canonical) = &state.canonical else {
                return SaveOutcome::NotLoaded;
            };
            edits
                .into_iter()
                .filter(|(field, value)| {
                    !canonical
                        .json
                        .get(field)
                        .is_some_and(|stored| structural_eq(value, stored))
                })
                .collect::<Map<String, Value>>()
        };

        if diff.is_empty() {
            debug!("{} {} has no changes left", self.endpoint.path(), id);
            self.notifier.info("info", "Nothing to save");
            return SaveOutcome::NothingToSave;
        }

        let _pending = self.pending.begin();
        info!("Saving {} field(s) of {} {}", diff.len(), self.endpoint.path(), id);
        diff.insert("id".to_string(), Value::String(id.clone()));

        let result = self.endpoint.update(Value::Object(diff)).await;
        if self.is_closed() {
            debug!("Binder closed during save of {}", id);
            return match result {
                Ok(_) => SaveOutcome::Saved,
                Err(_) => SaveOutcome::Failed,
            };
        }
        if let Err(e) = &result {
            warn!("Failed to save {} {}: {}", self.endpoint.path(), id, e);
            self.notify_error(&EntityError::Api(e.clone()));
        }

        if self.state.read().await.generation == generation {
            self.load(true).await;
        } else {
            debug!("Id changed during save of {}, skipping reload", id);
        }

        match result {
            Ok(_) if self.is_closed() => SaveOutcome::Saved,
            Ok(_) => {
                self.notifier.success("success", "Saved");
                SaveOutcome::Saved
            }
            Err(_) => SaveOutcome::Failed,
        }
    }

    /// Diffs `captured` (or the current buffer) against the current
    /// canonical copy. `Err` carries the outcome to return right away.
    async fn pending_edits(
        &self,
        captured: Option<Value>,
    ) -> Result<(String, u64, Map<String, Value>), SaveOutcome> {
        let state = self.state.read().await;
        let Some(canonical) = &state.canonical else {
            debug!("Nothing loaded for {} {}, not saving", self.endpoint.path(), state.id);
            return Err(SaveOutcome::NotLoaded);
        };
        let Some(buffer) = captured
            .as_ref()
            .or_else(|| state.buffer.as_ref().map(|b| &b.json))
        else {
            self.notifier.info("info", "Nothing to save");
            return Err(SaveOutcome::NothingToSave);
        };

        let edits = match diff_fields(buffer, &canonical.json) {
            Ok(edits) => edits,
            Err(e) => {
                self.notify_error(&e);
                return Err(SaveOutcome::Failed);
            }
        };
        if edits.is_empty() {
            debug!("{} {} has no changes", self.endpoint.path(), state.id);
            self.notifier.info("info", "Nothing to save");
            return Err(SaveOutcome::NothingToSave);
        }
        Ok((state.id.clone(), state.generation, edits))
    }

    async fn acquire_save(&self) -> Option<MutexGuard<'_, ()>> {
        match self.config.save_policy {
            SavePolicy::Queue => Some(self.save_lock.lock().await),
            SavePolicy::Reject => match self.save_lock.try_lock() {
                Ok(guard) => Some(guard),
                Err(_) => {
                    warn!("Save of {} already in progress", self.endpoint.path());
                    self.notifier.warning("warning", "Save already in progress");
                    None
                }
            },
        }
    }

    // ── Polling ─────────────────────────────────────────────────

    /// Reloads the record every `interval` until the returned task is
    /// stopped, the binder is closed, or the last binder handle is dropped.
    pub fn poll(self: &Arc<Self>, interval: Duration) -> ScheduledTask {
        let binder: Weak<Self> = Arc::downgrade(self);
        ScheduledTask::start(interval, move || {
            let binder = binder.clone();
            async move {
                if let Some(binder) = binder.upgrade() {
                    if !binder.is_closed() {
                        binder.load(false).await;
                    }
                }
            }
        })
    }

    // ── State ───────────────────────────────────────────────────

    pub async fn id(&self) -> String {
        self.state.read().await.id.clone()
    }

    pub async fn canonical(&self) -> Option<T> {
        self.state.read().await.canonical.as_ref().map(|c| c.record.clone())
    }

    /// The canonical copy before the most recent load.
    pub async fn previous(&self) -> Option<T> {
        self.state.read().await.previous.as_ref().map(|c| c.record.clone())
    }

    pub async fn buffer(&self) -> Option<T> {
        self.state.read().await.buffer.as_ref().map(|b| b.record.clone())
    }

    pub async fn is_modified(&self) -> bool {
        self.state.read().await.modified
    }

    pub async fn is_saved(&self) -> bool {
        self.state.read().await.saved
    }

    /// True while a load or save exchange is outstanding.
    pub fn is_loading(&self) -> bool {
        self.pending.is_active()
    }

    pub async fn status(&self) -> EntityStatus {
        self.state.read().await.status()
    }

    pub async fn snapshot(&self) -> EntitySnapshot<T> {
        let state = self.state.read().await;
        EntitySnapshot {
            id: state.id.clone(),
            canonical: state.canonical.as_ref().map(|c| c.record.clone()),
            buffer: state.buffer.as_ref().map(|b| b.record.clone()),
            modified: state.modified,
            saved: state.saved,
            loading: self.is_loading(),
            status: state.status(),
        }
    }

    /// Stops applying results. Requests already in flight are not
    /// cancelled but their responses are dropped.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!("Closed binder for {}", self.endpoint.path());
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn notify_error(&self, error: &EntityError) {
        self.notifier
            .notify(Notification::from_detail("error", &error.detail(), Severity::Error));
    }
}
