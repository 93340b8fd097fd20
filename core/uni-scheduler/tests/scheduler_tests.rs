use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use uni_scheduler::{ScheduledTask, SchedulerConfig, DEFAULT_INTERVAL};

fn counting_task(interval: Duration) -> (ScheduledTask, Arc<AtomicU32>) {
    let counter = Arc::new(AtomicU32::new(0));
    let c = counter.clone();
    let task = ScheduledTask::start(interval, move || {
        let c = c.clone();
        async move {
            c.fetch_add(1, Ordering::SeqCst);
        }
    });
    (task, counter)
}

// ── Config ──────────────────────────────────────────────────────

#[test]
fn scheduler_config_default() {
    let cfg = SchedulerConfig::default();
    assert_eq!(cfg.interval_ms, 5000);
    assert_eq!(cfg.interval(), DEFAULT_INTERVAL);
    assert!(!cfg.start_suspended);
}

#[test]
fn scheduler_config_from_json() {
    let cfg: SchedulerConfig =
        serde_json::from_str(r#"{"interval_ms": 250, "start_suspended": true}"#).unwrap();
    assert_eq!(cfg.interval(), Duration::from_millis(250));
    assert!(cfg.start_suspended);
}

// ── Running ─────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn runs_once_per_interval() {
    let (task, counter) = counting_task(Duration::from_secs(1));
    assert_eq!(task.interval(), Duration::from_secs(1));

    sleep(Duration::from_millis(3500)).await;

    assert_eq!(counter.load(Ordering::SeqCst), 3);
    assert_eq!(task.runs(), 3);
    assert!(task.is_running());
}

#[tokio::test(start_paused = true)]
async fn first_run_waits_one_interval() {
    let (_task, counter) = counting_task(Duration::from_secs(1));
    sleep(Duration::from_millis(900)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn zero_interval_never_runs() {
    let (task, counter) = counting_task(Duration::ZERO);
    sleep(Duration::from_secs(10)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 0);
    assert!(!task.is_running());
}

// ── Lifecycle ───────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn stop_halts_further_runs() {
    let (task, counter) = counting_task(Duration::from_secs(1));
    sleep(Duration::from_millis(1500)).await;
    task.stop();
    assert!(!task.is_running());

    sleep(Duration::from_secs(5)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn dropping_handle_stops_task() {
    let (task, counter) = counting_task(Duration::from_secs(1));
    drop(task);
    sleep(Duration::from_secs(5)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn suspend_skips_runs_until_resumed() {
    let (task, counter) = counting_task(Duration::from_secs(1));
    task.suspend(true);
    assert!(task.is_suspended());

    sleep(Duration::from_millis(2500)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 0);

    task.suspend(false);
    sleep(Duration::from_secs(1)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn config_can_start_suspended() {
    let counter = Arc::new(AtomicU32::new(0));
    let c = counter.clone();
    let config = SchedulerConfig {
        interval_ms: 100,
        start_suspended: true,
    };
    let task = ScheduledTask::with_config(&config, move || {
        let c = c.clone();
        async move {
            c.fetch_add(1, Ordering::SeqCst);
        }
    });

    sleep(Duration::from_secs(1)).await;
    assert!(task.is_suspended());
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn shutdown_waits_for_task() {
    let (task, counter) = counting_task(Duration::from_secs(1));
    sleep(Duration::from_millis(2500)).await;
    task.shutdown().await;
    sleep(Duration::from_secs(3)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}
