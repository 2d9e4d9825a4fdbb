//! Action scheduler: the single authority that orders, gates and dispatches
//! actions submitted by every producer module.
//!
//! Producers call [`ActionScheduler::submit`]; one executor worker per
//! scheduler pops the most urgent ready action, re-validates it, checks the
//! movement and capability gates, waits a humanized delay and executes it.
//! The worker is the only place that calls an action's execution closure for
//! queued actions, and a dispatch lock keeps at most one action in flight
//! even when a privileged action bypasses the queue.
//!
//! The pending heap, the blocked-retry queue and the statistics are guarded
//! independently and their locks are never nested.

mod blocked;
mod executor;
mod gate;
mod metrics;
mod queue;

pub use blocked::{BlockedQueue, Deferral};
pub use gate::{Predicate, StateChecker};
pub use metrics::{SchedulerMetrics, StatsSnapshot};
pub use queue::{PendingQueue, PrioritizedAction};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bot_core::{Action, ActionError, ActionSummary};
use parking_lot::{Mutex, RwLock};
use tokio::sync::{Mutex as AsyncMutex, Notify, broadcast};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::api::{Result, RuntimeError, SubmitError};
use crate::config::SchedulerConfig;
use crate::events::{DiscardReason, EventPublisher, SchedulerEvent};
use crate::pacing::HumanizedPacer;

use executor::ExecutorWorker;

/// Outcome of one dispatch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dispatch {
    Executed { success: bool },
    Invalid,
    Denied,
}

/// State shared between the public handle and the executor worker.
pub(crate) struct Shared {
    config: SchedulerConfig,
    pending: Mutex<PendingQueue>,
    blocked: Mutex<BlockedQueue>,
    metrics: SchedulerMetrics,
    state: RwLock<StateChecker>,
    pacer: HumanizedPacer,
    events: EventPublisher,
    running: AtomicBool,
    shutdown: Notify,
    in_flight: AsyncMutex<()>,
}

impl Shared {
    /// Validates, gates and executes one action.
    ///
    /// Closure errors and panics are contained here and reported as a failed
    /// execution. The queued and immediate paths pace independently, so the
    /// pacing floor is enforced again once the dispatch lock is held.
    async fn dispatch(&self, action: &mut Action) -> Dispatch {
        let _in_flight = self.in_flight.lock().await;
        self.pacer.settle().await;

        if !action.is_valid() {
            self.metrics.record_invalid();
            debug!(
                target: "bot_runtime::executor",
                action = %action.action_type(),
                module = action.source_module(),
                "Action failed late validation, dropping"
            );
            self.events.publish(SchedulerEvent::Invalid {
                action: action.summary(),
            });
            return Dispatch::Invalid;
        }

        if !self.state.read().permits(action.category()) {
            debug!(
                target: "bot_runtime::executor",
                action = %action.action_type(),
                category = %action.category(),
                "Action denied by state gate"
            );
            self.events.publish(SchedulerEvent::Denied {
                action: action.summary(),
            });
            return Dispatch::Denied;
        }

        let started = Instant::now();
        let result = action.execute();
        self.pacer.mark_executed(started);

        let success = match result {
            Ok(success) => success,
            Err(ActionError::Panicked { message }) => {
                error!(
                    target: "bot_runtime::executor",
                    action = %action.action_type(),
                    module = action.source_module(),
                    panic = %message,
                    "Action closure panicked"
                );
                false
            }
            Err(err) => {
                warn!(
                    target: "bot_runtime::executor",
                    action = %action.action_type(),
                    module = action.source_module(),
                    error = %err,
                    "Action execution failed"
                );
                false
            }
        };

        self.metrics.record_execution(success);
        self.events.publish(SchedulerEvent::Executed {
            action: action.summary(),
            success,
        });
        Dispatch::Executed { success }
    }

    /// Routes an action into the blocked-retry queue, or discards it if a
    /// retry guard refuses it.
    fn defer(&self, action: Action) {
        let summary = action.summary();
        let deferral = self.blocked.lock().defer(action, Instant::now());

        match deferral {
            Deferral::Queued {
                retry_count,
                evicted,
            } => {
                self.metrics.record_blocked();
                debug!(
                    target: "bot_runtime::executor",
                    action = %summary.action_type,
                    retry = retry_count,
                    "Mouse action deferred until movement settles"
                );
                self.events.publish(SchedulerEvent::Deferred {
                    action: ActionSummary {
                        retry_count,
                        ..summary
                    },
                    retry_count,
                });
                if let Some(oldest) = evicted {
                    self.discard(oldest, DiscardReason::Overflow);
                }
            }
            Deferral::Discarded { action, reason } => self.discard(action, reason),
        }
    }

    /// Drops an action without executing it. Every discard counts as expired.
    fn discard(&self, action: Action, reason: DiscardReason) {
        self.metrics.record_expired();

        if reason == DiscardReason::Expired {
            debug!(
                target: "bot_runtime::executor",
                action = %action.action_type(),
                module = action.source_module(),
                "Action expired before execution"
            );
        } else {
            warn!(
                target: "bot_runtime::executor",
                action = %action.action_type(),
                module = action.source_module(),
                retries = action.context().retry_count,
                reason = reason.as_str(),
                "Blocked action discarded"
            );
        }

        self.events.publish(SchedulerEvent::Discarded {
            action: action.summary(),
            reason,
        });
    }

    fn clear(&self) -> usize {
        let pending = self.pending.lock().clear();
        let blocked = self.blocked.lock().clear();
        pending + blocked
    }
}

/// Cloneable handle to an action scheduler and its executor worker.
#[derive(Clone)]
pub struct ActionScheduler {
    shared: Arc<Shared>,
    worker: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl Default for ActionScheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl ActionScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let shared = Shared {
            pending: Mutex::new(PendingQueue::new()),
            blocked: Mutex::new(BlockedQueue::new(config.retry.clone())),
            metrics: SchedulerMetrics::new(),
            state: RwLock::new(StateChecker::default()),
            pacer: HumanizedPacer::new(config.pacing.clone()),
            events: EventPublisher::new(config.event_buffer_size),
            running: AtomicBool::new(false),
            shutdown: Notify::new(),
            in_flight: AsyncMutex::new(()),
            config,
        };

        Self {
            shared: Arc::new(shared),
            worker: Arc::new(Mutex::new(None)),
        }
    }

    /// Spawns the executor worker. Calling it on a running scheduler is a no-op.
    pub fn start(&self) -> Result<()> {
        if self.shared.running.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(err) => {
                self.shared.running.store(false, Ordering::Release);
                return Err(RuntimeError::NoAsyncRuntime(err));
            }
        };

        let worker = ExecutorWorker::new(Arc::clone(&self.shared));
        *self.worker.lock() = Some(runtime.spawn(worker.run()));

        info!(target: "bot_runtime::scheduler", "Action scheduler started");
        Ok(())
    }

    /// Stops the executor worker (bounded wait) and clears both queues.
    ///
    /// If the worker does not finish within the configured stop timeout it is
    /// aborted; either way no worker is left running when this returns.
    pub async fn stop(&self) -> Result<()> {
        let was_running = self.shared.running.swap(false, Ordering::AcqRel);
        self.shared.shutdown.notify_waiters();

        let handle = self.worker.lock().take();
        let result = match handle {
            Some(mut handle) => {
                let timeout = self.shared.config.stop_timeout;
                match tokio::time::timeout(timeout, &mut handle).await {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(err)) if err.is_cancelled() => Ok(()),
                    Ok(Err(err)) => Err(RuntimeError::WorkerJoin(err)),
                    Err(_) => {
                        handle.abort();
                        Err(RuntimeError::StopTimeout {
                            timeout_ms: timeout.as_millis() as u64,
                        })
                    }
                }
            }
            None => Ok(()),
        };

        let dropped = self.shared.clear();
        if was_running {
            info!(
                target: "bot_runtime::scheduler",
                dropped,
                "Action scheduler stopped"
            );
        }
        result
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Queues an action, or executes it right away if its type is privileged.
    ///
    /// Returns `false` if the scheduler is not running, or if a privileged
    /// action did not succeed.
    pub async fn submit(&self, action: Action) -> bool {
        self.try_submit(action).await.is_ok()
    }

    /// Like [`Self::submit`], reporting why the action was not accepted.
    pub async fn try_submit(&self, action: Action) -> std::result::Result<(), SubmitError> {
        if !self.is_running() {
            debug!(
                target: "bot_runtime::scheduler",
                action = %action.action_type(),
                module = action.source_module(),
                "Submit rejected, scheduler not running"
            );
            return Err(SubmitError::NotRunning);
        }

        if action.is_immediate() {
            return self.run_immediate(action).await;
        }

        let summary = action.summary();
        let sequence = self.shared.pending.lock().push(action);
        self.shared.metrics.record_submitted();
        self.shared.events.publish(SchedulerEvent::Queued {
            action: summary,
            sequence,
        });
        Ok(())
    }

    /// Executes an action on the caller's task, bypassing the queue.
    ///
    /// Still paced, validated and gated like any other action.
    pub async fn submit_immediate(&self, action: Action) -> bool {
        if !self.is_running() {
            return false;
        }
        self.run_immediate(action).await.is_ok()
    }

    async fn run_immediate(&self, mut action: Action) -> std::result::Result<(), SubmitError> {
        let action_type = action.action_type();
        self.shared.pacer.pace().await;
        self.shared.metrics.record_immediate();

        info!(
            target: "bot_runtime::scheduler",
            action = %action_type,
            module = action.source_module(),
            "Executing immediate action"
        );

        match self.shared.dispatch(&mut action).await {
            Dispatch::Executed { success: true } => Ok(()),
            _ => Err(SubmitError::ImmediateFailed {
                action: action_type,
            }),
        }
    }

    /// Empties the pending heap and the blocked-retry queue.
    pub fn clear_queue(&self) -> usize {
        let removed = self.shared.clear();
        debug!(target: "bot_runtime::scheduler", removed, "Cleared action queues");
        removed
    }

    /// Removes every pending and blocked action submitted by `module`.
    pub fn clear_module_actions(&self, module: &str) -> usize {
        let pending = self.shared.pending.lock().remove_module(module);
        let blocked = self.shared.blocked.lock().remove_module(module);
        debug!(
            target: "bot_runtime::scheduler",
            module,
            pending,
            blocked,
            "Cleared module actions"
        );
        pending + blocked
    }

    /// The action the executor would pop next from the pending heap.
    pub fn peek_next(&self) -> Option<ActionSummary> {
        self.shared.pending.lock().peek()
    }

    pub fn get_queue_size(&self) -> usize {
        self.shared.pending.lock().len()
    }

    pub fn get_blocked_count(&self) -> usize {
        self.shared.blocked.lock().len()
    }

    pub fn get_stats(&self) -> StatsSnapshot {
        self.shared.metrics.snapshot()
    }

    /// Injects the capability gates consulted at execution time.
    pub fn set_state_checker<M, K>(&self, can_send_mouse: M, can_send_keyboard: K)
    where
        M: Fn() -> bool + Send + Sync + 'static,
        K: Fn() -> bool + Send + Sync + 'static,
    {
        self.shared
            .state
            .write()
            .set_capabilities(Arc::new(can_send_mouse), Arc::new(can_send_keyboard));
    }

    /// Injects the "character is mid-step" check.
    pub fn set_movement_checker<F>(&self, is_moving: F)
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.shared.state.write().set_movement(Arc::new(is_moving));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SchedulerEvent> {
        self.shared.events.subscribe()
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.shared.config
    }
}
