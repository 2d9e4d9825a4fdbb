//! Executor worker: the loop that drains the scheduler's queues.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use bot_core::Action;
use tracing::{debug, error, info};

use super::{Dispatch, Shared};
use crate::events::DiscardReason;

pub(crate) struct ExecutorWorker {
    shared: Arc<Shared>,
}

impl ExecutorWorker {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Main worker loop. Exits once the scheduler stops running.
    pub(crate) async fn run(self) {
        info!(target: "bot_runtime::executor", "Executor worker started");
        let _crash_guard = CrashGuard {
            shared: &self.shared,
        };
        let idle_interval = self.shared.config.idle_interval;

        while self.shared.running.load(Ordering::Acquire) {
            let Some(action) = self.next_action() else {
                tokio::select! {
                    _ = tokio::time::sleep(idle_interval) => {}
                    _ = self.shared.shutdown.notified() => {}
                }
                continue;
            };

            tokio::select! {
                _ = self.shared.pacer.pace() => {}
                _ = self.shared.shutdown.notified() => {
                    debug!(
                        target: "bot_runtime::executor",
                        action = %action.action_type(),
                        "Shutdown during pacing, dropping popped action"
                    );
                    break;
                }
            }

            self.process(action).await;
        }

        info!(target: "bot_runtime::executor", "Executor worker stopped");
    }

    /// Picks the next candidate.
    ///
    /// When the character is settled, the oldest blocked action gets first
    /// refusal. Otherwise the pending heap is popped, dropping expired
    /// entries and parking mouse actions that cannot run while moving.
    fn next_action(&self) -> Option<Action> {
        let moving = self.shared.state.read().is_moving();

        if !moving {
            let blocked = self.shared.blocked.lock().pop_front();
            if let Some(action) = blocked {
                if !action.is_expired() {
                    return Some(action);
                }
                self.shared.discard(action, DiscardReason::Expired);
            }
        }

        loop {
            let entry = self.shared.pending.lock().pop()?;
            let action = entry.action;

            if action.is_expired() {
                self.shared.discard(action, DiscardReason::Expired);
                continue;
            }
            if moving && action.is_mouse_action() {
                self.shared.defer(action);
                continue;
            }
            return Some(action);
        }
    }

    async fn process(&self, mut action: Action) {
        match self.shared.dispatch(&mut action).await {
            Dispatch::Executed { success: true } | Dispatch::Invalid => {}
            Dispatch::Executed { success: false } | Dispatch::Denied => {
                if action.is_mouse_action() {
                    self.shared.defer(action);
                } else {
                    debug!(
                        target: "bot_runtime::executor",
                        action = %action.action_type(),
                        module = action.source_module(),
                        "Action did not run, not retryable"
                    );
                }
            }
        }
    }
}

/// Marks the scheduler stopped if the worker unwinds, so submits are refused
/// instead of piling up behind a dead executor.
struct CrashGuard<'a> {
    shared: &'a Shared,
}

impl Drop for CrashGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.shared.running.store(false, Ordering::Release);
            error!(
                target: "bot_runtime::executor",
                "Executor worker panicked, scheduler no longer accepts actions"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;
    use crate::config::SchedulerConfig;
    use crate::scheduler::ActionScheduler;

    fn running_scheduler() -> ActionScheduler {
        let scheduler = ActionScheduler::new(SchedulerConfig::default());
        scheduler.shared.running.store(true, Ordering::Release);
        scheduler
    }

    #[test]
    fn unwinding_worker_stops_the_scheduler() {
        let scheduler = running_scheduler();

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let _guard = CrashGuard {
                shared: &scheduler.shared,
            };
            panic!("pacer failure");
        }));

        assert!(outcome.is_err());
        assert!(!scheduler.is_running());
    }

    #[test]
    fn orderly_exit_leaves_state_alone() {
        let scheduler = running_scheduler();
        drop(CrashGuard {
            shared: &scheduler.shared,
        });
        assert!(scheduler.is_running());
    }
}
