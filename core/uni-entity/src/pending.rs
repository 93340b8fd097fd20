use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts outstanding network exchanges. A value is "loading" while any
/// guard handed out by [`Pending::begin`] is alive.
#[derive(Debug, Default)]
pub(crate) struct Pending(AtomicUsize);

impl Pending {
    pub(crate) fn begin(&self) -> PendingGuard<'_> {
        self.0.fetch_add(1, Ordering::SeqCst);
        PendingGuard(&self.0)
    }

    pub(crate) fn is_active(&self) -> bool {
        self.0.load(Ordering::SeqCst) > 0
    }
}

pub(crate) struct PendingGuard<'a>(&'a AtomicUsize);

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
