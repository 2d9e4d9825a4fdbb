//! Bounded FIFO of mouse actions waiting for the character to stop moving.

use std::collections::VecDeque;

use bot_core::Action;
use tokio::time::Instant;

use crate::config::RetryConfig;
use crate::events::DiscardReason;

/// Result of trying to put an action (back) into the blocked-retry queue.
#[derive(Debug)]
pub enum Deferral {
    /// Appended to the tail. `evicted` is the oldest entry if the bound was hit.
    Queued {
        retry_count: u32,
        evicted: Option<Action>,
    },
    /// Refused by one of the retry guards.
    Discarded { action: Action, reason: DiscardReason },
}

#[derive(Debug)]
pub struct BlockedQueue {
    entries: VecDeque<Action>,
    policy: RetryConfig,
}

impl BlockedQueue {
    /// A capacity of zero is raised to one; the queue must hold the entry it just took.
    pub fn new(mut policy: RetryConfig) -> Self {
        policy.max_blocked = policy.max_blocked.max(1);
        Self {
            entries: VecDeque::with_capacity(policy.max_blocked),
            policy,
        }
    }

    /// Applies the retry guards, then appends.
    ///
    /// The retry-count ceiling and the wall-clock timeout are checked
    /// independently; either one discards the action.
    pub fn defer(&mut self, mut action: Action, now: Instant) -> Deferral {
        let retries = action.context().retry_count;
        let blocked_for = action.context().blocked_for(now);

        if retries >= self.policy.max_blocked_retries {
            return Deferral::Discarded {
                action,
                reason: DiscardReason::RetriesExhausted,
            };
        }
        if blocked_for > self.policy.blocked_timeout {
            return Deferral::Discarded {
                action,
                reason: DiscardReason::BlockedTimeout,
            };
        }

        action.context_mut().mark_blocked(now);
        let retry_count = action.context().retry_count;
        self.entries.push_back(action);

        let evicted = if self.entries.len() > self.policy.max_blocked {
            self.entries.pop_front()
        } else {
            None
        };

        Deferral::Queued {
            retry_count,
            evicted,
        }
    }

    pub fn pop_front(&mut self) -> Option<Action> {
        self.entries.pop_front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        removed
    }

    pub fn remove_module(&mut self, module: &str) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|action| action.source_module() != module);
        before - self.entries.len()
    }
}
