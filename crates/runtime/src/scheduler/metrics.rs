//! Scheduler statistics.
//!
//! Counters are atomics so recording never contends with the queue locks.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters tracked by the scheduler and its executor worker.
#[derive(Debug, Default)]
pub struct SchedulerMetrics {
    /// Actions accepted into the pending queue
    submitted: AtomicU64,

    /// Executions that reported success
    executed: AtomicU64,

    /// Executions that returned `false`, an error, or panicked
    failed: AtomicU64,

    /// Actions dropped past their deadline or their retry allowance
    expired: AtomicU64,

    /// Deferrals into the blocked-retry queue
    blocked: AtomicU64,

    /// Actions rejected by late validation
    invalid: AtomicU64,

    /// Privileged actions executed outside the queue
    immediate: AtomicU64,
}

impl SchedulerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_execution(&self, success: bool) {
        if success {
            self.executed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_expired(&self) {
        self.expired.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_blocked(&self) {
        self.blocked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalid(&self) {
        self.invalid.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_immediate(&self) {
        self.immediate.fetch_add(1, Ordering::Relaxed);
    }

    /// Creates a snapshot of all counters.
    ///
    /// Individual fields are read atomically; the snapshot as a whole may be
    /// inconsistent if the executor is recording concurrently.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            executed: self.executed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            blocked: self.blocked.load(Ordering::Relaxed),
            invalid: self.invalid.load(Ordering::Relaxed),
            immediate: self.immediate.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of scheduler counters at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct StatsSnapshot {
    pub submitted: u64,
    pub executed: u64,
    pub failed: u64,
    pub expired: u64,
    pub blocked: u64,
    pub invalid: u64,
    pub immediate: u64,
}

impl StatsSnapshot {
    /// Counter map keyed by name, for tooling that expects a flat mapping.
    pub fn as_map(&self) -> BTreeMap<&'static str, u64> {
        BTreeMap::from([
            ("submitted", self.submitted),
            ("executed", self.executed),
            ("failed", self.failed),
            ("expired", self.expired),
            ("blocked", self.blocked),
            ("invalid", self.invalid),
            ("immediate", self.immediate),
        ])
    }

    /// Share of executions that succeeded, as a percentage (0-100).
    pub fn success_rate(&self) -> f64 {
        let total = self.executed + self.failed;
        if total == 0 {
            100.0
        } else {
            (self.executed as f64 / total as f64) * 100.0
        }
    }
}
