//! Cancellable periodic tasks.
//!
//! A [`ScheduledTask`] runs an async closure every `interval` on the tokio
//! runtime until it is stopped or dropped. The first run happens one full
//! interval after the task is started. Runs never overlap: a slow run pushes
//! the next tick back instead of queueing a burst.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use uni_scheduler::ScheduledTask;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let task = ScheduledTask::start(Duration::from_secs(5), || async {
//!     // reload something
//! });
//! assert!(task.is_running());
//! task.stop();
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

/// Default polling interval.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(5000);

/// Scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Interval between runs in milliseconds. Zero disables the task.
    pub interval_ms: u64,
    /// Start with runs suspended.
    pub start_suspended: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL.as_millis() as u64,
            start_suspended: false,
        }
    }
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Handle to a running periodic task. Dropping it stops the task.
pub struct ScheduledTask {
    interval: Duration,
    stop_tx: watch::Sender<bool>,
    stopped: Arc<AtomicBool>,
    suspended: Arc<AtomicBool>,
    runs: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl ScheduledTask {
    /// Starts `task` every `interval`. Must be called inside a tokio runtime.
    /// A zero interval yields a task that never runs.
    pub fn start<F, Fut>(interval: Duration, task: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::spawn(interval, false, task)
    }

    /// Starts a task from a [`SchedulerConfig`].
    pub fn with_config<F, Fut>(config: &SchedulerConfig, task: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::spawn(config.interval(), config.start_suspended, task)
    }

    fn spawn<F, Fut>(interval: Duration, suspended: bool, mut task: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let stopped = Arc::new(AtomicBool::new(false));
        let suspended = Arc::new(AtomicBool::new(suspended));
        let runs = Arc::new(AtomicU64::new(0));

        let handle = if interval.is_zero() {
            debug!("Zero interval, task will not run");
            None
        } else {
            let suspended = suspended.clone();
            let runs = runs.clone();
            Some(tokio::spawn(async move {
                let mut ticker = interval_at(Instant::now() + interval, interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            if suspended.load(Ordering::SeqCst) {
                                continue;
                            }
                            task().await;
                            runs.fetch_add(1, Ordering::SeqCst);
                        }
                        changed = stop_rx.changed() => {
                            if changed.is_err() || *stop_rx.borrow() {
                                break;
                            }
                        }
                    }
                }
                debug!("Scheduled task stopped");
            }))
        };

        Self {
            interval,
            stop_tx,
            stopped,
            suspended,
            runs,
            handle,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Stops the task. A run already in progress finishes first.
    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            let _ = self.stop_tx.send(true);
        }
    }

    pub fn is_running(&self) -> bool {
        !self.stopped.load(Ordering::SeqCst)
            && self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Pauses or resumes runs without tearing the task down.
    pub fn suspend(&self, suspended: bool) {
        self.suspended.store(suspended, Ordering::SeqCst);
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::SeqCst)
    }

    /// Number of completed runs.
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::SeqCst)
    }

    /// Stops the task and waits for it to wind down.
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.stop();
    }
}
