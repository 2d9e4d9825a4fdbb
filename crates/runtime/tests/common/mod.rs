#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use bot_core::{Action, ActionType};
use bot_runtime::{ActionScheduler, PacingConfig, RetryConfig, SchedulerConfig};
use parking_lot::Mutex;
use tokio::time::Instant;

pub type Log = Arc<Mutex<Vec<(String, Instant)>>>;

pub fn config() -> SchedulerConfig {
    SchedulerConfig {
        pacing: PacingConfig {
            seed: Some(42),
            ..PacingConfig::default()
        },
        event_buffer_size: 1024,
        ..SchedulerConfig::default()
    }
}

pub fn config_with_retry(retry: RetryConfig) -> SchedulerConfig {
    SchedulerConfig {
        retry,
        ..config()
    }
}

pub fn started(config: SchedulerConfig) -> ActionScheduler {
    let scheduler = ActionScheduler::new(config);
    scheduler.start().expect("scheduler should start inside a tokio runtime");
    scheduler
}

pub fn log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn labels(log: &Log) -> Vec<String> {
    log.lock().iter().map(|(label, _)| label.clone()).collect()
}

/// An action that records `label` and the execution time, then succeeds.
pub fn recording(kind: ActionType, module: &str, label: &str, log: &Log) -> Action {
    let log = Arc::clone(log);
    let label = label.to_owned();
    Action::new(kind, module, move || {
        log.lock().push((label.clone(), Instant::now()));
        Ok(true)
    })
}

/// An action that counts attempts and always reports failure.
pub fn always_failing(kind: ActionType, module: &str, attempts: &Arc<AtomicUsize>) -> Action {
    let attempts = Arc::clone(attempts);
    Action::new(kind, module, move || {
        attempts.fetch_add(1, Ordering::SeqCst);
        Ok(false)
    })
}

/// Movement flag wired into the scheduler as its movement check.
pub fn movement(scheduler: &ActionScheduler, initially_moving: bool) -> Arc<AtomicBool> {
    let moving = Arc::new(AtomicBool::new(initially_moving));
    let flag = Arc::clone(&moving);
    scheduler.set_movement_checker(move || flag.load(Ordering::SeqCst));
    moving
}

/// Polls `condition` every 5ms until it holds, panicking after `limit`.
pub async fn wait_until(limit: Duration, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + limit;
    while !condition() {
        assert!(
            Instant::now() < deadline,
            "condition not reached within {limit:?}"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
