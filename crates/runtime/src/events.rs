//! Scheduler events for observability tooling.
//!
//! Every terminal disposition of an action (and every deferral) is published
//! on a broadcast channel. Publishing is best-effort: with no subscribers the
//! event is dropped.

use bot_core::ActionSummary;
use serde::Serialize;
use tokio::sync::broadcast;

/// Why an action was dropped without being executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardReason {
    /// Deadline passed while queued.
    Expired,
    /// Deferred too many times.
    RetriesExhausted,
    /// Blocked for longer than the blocked timeout.
    BlockedTimeout,
    /// Pushed out of the bounded blocked-retry queue by newer entries.
    Overflow,
}

impl DiscardReason {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Expired => "expired",
            Self::RetriesExhausted => "retries_exhausted",
            Self::BlockedTimeout => "blocked_timeout",
            Self::Overflow => "overflow",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SchedulerEvent {
    Queued { action: ActionSummary, sequence: u64 },
    Executed { action: ActionSummary, success: bool },
    Invalid { action: ActionSummary },
    /// A capability gate or the movement state refused the action.
    Denied { action: ActionSummary },
    Deferred { action: ActionSummary, retry_count: u32 },
    Discarded { action: ActionSummary, reason: DiscardReason },
}

#[derive(Debug, Clone)]
pub(crate) struct EventPublisher {
    tx: broadcast::Sender<SchedulerEvent>,
}

impl EventPublisher {
    pub(crate) fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub(crate) fn publish(&self, event: SchedulerEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!(target: "bot_runtime::events", "No subscribers for scheduler event");
        }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<SchedulerEvent> {
        self.tx.subscribe()
    }
}
