//! In-flight request tracking.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// Identifier of one tracked request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessId(Uuid);

/// Set of requests currently in flight. Clones share the same set.
#[derive(Debug, Clone, Default)]
pub struct ProcessTracker {
    running: Arc<Mutex<HashSet<ProcessId>>>,
}

impl ProcessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new process. It stays running until the guard is dropped.
    #[must_use = "the process ends as soon as the guard is dropped"]
    pub fn start(&self) -> ProcessGuard {
        let id = ProcessId(Uuid::new_v4());
        self.lock().insert(id);
        ProcessGuard {
            tracker: self.clone(),
            id,
        }
    }

    pub fn is_running(&self) -> bool {
        !self.lock().is_empty()
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<ProcessId>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Marks one process finished when dropped, including when the request
/// future it belongs to is cancelled.
#[derive(Debug)]
pub struct ProcessGuard {
    tracker: ProcessTracker,
    id: ProcessId,
}

impl ProcessGuard {
    pub fn id(&self) -> ProcessId {
        self.id
    }
}

impl Drop for ProcessGuard {
    fn drop(&mut self) {
        self.tracker.lock().remove(&self.id);
    }
}
