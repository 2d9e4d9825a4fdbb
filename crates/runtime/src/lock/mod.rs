//! Cross-module lock.
//!
//! Some modules must emit several packets as one uninterrupted burst (open a
//! backpack, move a stack, close it). [`ModuleLock`] gives one module at a
//! time the exclusive right to do so. It is independent of the action
//! scheduler and is passed explicitly to every module that needs it.
//!
//! Three refinements over a plain mutex:
//! - a cooldown between a release and the next acquisition by an unrelated
//!   module, waived for modules of the same group;
//! - scoped acquisition ([`ModuleLock::lock`]) that borrows a lock already
//!   held by a same-group module instead of waiting for it;
//! - a priority per acquisition: a free lock is left to the most urgent
//!   waiter (lower value wins).

mod groups;
mod guard;

pub use groups::{ModuleGroups, SOLO_GROUP};
pub use guard::{ModuleGuard, OwnedLease};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::api::LockError;
use crate::config::ModuleLockConfig;

/// Default acquisition priority.
pub const DEFAULT_LOCK_PRIORITY: u32 = 100;

#[derive(Debug, Clone)]
struct Holder {
    module: String,
    priority: u32,
    acquired_at: Instant,
    /// Identifies this acquisition, so a stale lease cannot free a later one.
    lease: u64,
}

#[derive(Debug, Default)]
struct LockState {
    holder: Option<Holder>,
    next_lease: u64,
    last_holder: Option<String>,
    last_release: Option<Instant>,
}

#[derive(Debug)]
struct Waiter {
    ticket: u64,
    module: String,
    priority: u32,
}

#[derive(Debug, Default)]
struct WaitQueue {
    next_ticket: u64,
    waiters: Vec<Waiter>,
}

struct Inner {
    config: ModuleLockConfig,
    state: Mutex<LockState>,
    waiting: Mutex<WaitQueue>,
}

enum Attempt {
    Acquired(u64),
    Busy,
    Cooldown(Duration),
}

/// Diagnostic view of the lock.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LockStatus {
    pub holder: Option<String>,
    pub holder_priority: Option<u32>,
    pub held_for: Option<Duration>,
    pub waiting: Vec<String>,
    pub last_holder: Option<String>,
    pub since_release: Option<Duration>,
}

/// Cloneable handle to one cross-module lock.
#[derive(Clone)]
pub struct ModuleLock {
    inner: Arc<Inner>,
}

impl Default for ModuleLock {
    fn default() -> Self {
        Self::new(ModuleLockConfig::default())
    }
}

impl fmt::Debug for ModuleLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleLock")
            .field("holder", &self.holder())
            .finish_non_exhaustive()
    }
}

impl ModuleLock {
    pub fn new(config: ModuleLockConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(LockState::default()),
                waiting: Mutex::new(WaitQueue::default()),
            }),
        }
    }

    pub fn groups(&self) -> &ModuleGroups {
        &self.inner.config.groups
    }

    /// Acquires the lock for `module`, waiting up to `timeout`.
    ///
    /// Returns `false` on timeout so the caller can skip its operation this cycle.
    pub async fn acquire(&self, module: &str, priority: u32, timeout: Duration) -> bool {
        self.try_acquire(module, priority, timeout).await.is_ok()
    }

    /// Like [`Self::acquire`], reporting how long the caller waited on timeout.
    pub async fn try_acquire(
        &self,
        module: &str,
        priority: u32,
        timeout: Duration,
    ) -> Result<(), LockError> {
        self.acquire_lease(module, priority, timeout).await.map(|_| ())
    }

    async fn acquire_lease(
        &self,
        module: &str,
        priority: u32,
        timeout: Duration,
    ) -> Result<u64, LockError> {
        let started = Instant::now();
        let deadline = started + timeout;
        let ticket = WaitTicket::register(&self.inner, module, priority);

        loop {
            let attempt = if ticket.outranked() {
                Attempt::Busy
            } else {
                self.attempt(module, priority)
            };

            match attempt {
                Attempt::Acquired(lease) => {
                    debug!(
                        target: "bot_runtime::module_lock",
                        module,
                        priority,
                        lease,
                        waited_ms = started.elapsed().as_millis() as u64,
                        "Module lock acquired"
                    );
                    return Ok(lease);
                }
                Attempt::Cooldown(remaining) => {
                    // Cooldown is bounded by the inter-module delay, not by the caller's timeout.
                    tokio::time::sleep(remaining).await;
                }
                Attempt::Busy => {
                    let now = Instant::now();
                    if now >= deadline {
                        let waited_ms = now.duration_since(started).as_millis() as u64;
                        debug!(
                            target: "bot_runtime::module_lock",
                            module,
                            waited_ms,
                            holder = ?self.holder(),
                            "Module lock acquisition timed out"
                        );
                        return Err(LockError::Timeout {
                            module: module.to_owned(),
                            waited_ms,
                        });
                    }
                    let poll = self.inner.config.poll_interval.min(deadline - now);
                    tokio::time::sleep(poll).await;
                }
            }
        }
    }

    /// Scoped acquisition.
    ///
    /// If a module of the caller's group holds the lock, returns
    /// [`ModuleGuard::Borrowed`] immediately. Otherwise acquires the lock and
    /// returns [`ModuleGuard::Owned`], which releases it on drop.
    pub async fn lock(
        &self,
        module: &str,
        priority: u32,
        timeout: Duration,
    ) -> Result<ModuleGuard, LockError> {
        if let Some(holder) = self.holder()
            && self.groups().same_group(&holder, module)
        {
            debug!(
                target: "bot_runtime::module_lock",
                module,
                holder = %holder,
                "Reusing module lock held by same-group module"
            );
            return Ok(ModuleGuard::Borrowed {
                module: module.to_owned(),
                holder,
            });
        }

        let lease = self.acquire_lease(module, priority, timeout).await?;
        Ok(ModuleGuard::Owned(OwnedLease::new(
            self.clone(),
            module.to_owned(),
            lease,
        )))
    }

    /// Releases the lock if `module` holds it. Returns `false` otherwise.
    pub fn release(&self, module: &str) -> bool {
        self.try_release(module).is_ok()
    }

    pub fn try_release(&self, module: &str) -> Result<(), LockError> {
        self.release_matching(module, None)
    }

    /// Releases only the acquisition identified by `lease`.
    ///
    /// Used by [`OwnedLease`]: after a `force_release` the same module may
    /// hold a newer acquisition, which the stale lease must leave alone.
    pub(crate) fn release_lease(&self, module: &str, lease: u64) -> bool {
        self.release_matching(module, Some(lease)).is_ok()
    }

    fn release_matching(&self, module: &str, lease: Option<u64>) -> Result<(), LockError> {
        let mut state = self.inner.state.lock();

        let is_holder = state.holder.as_ref().is_some_and(|holder| {
            holder.module == module && lease.is_none_or(|lease| holder.lease == lease)
        });
        if !is_holder {
            let holder = state.holder.as_ref().map(|h| h.module.clone());
            drop(state);

            warn!(
                target: "bot_runtime::module_lock",
                module,
                holder = ?holder,
                "Release attempted by a module that does not hold the lock"
            );
            return Err(LockError::NotHolder {
                module: module.to_owned(),
                holder,
            });
        }

        let held_for = state.holder.take().map(|h| h.acquired_at.elapsed());
        state.last_holder = Some(module.to_owned());
        state.last_release = Some(Instant::now());
        drop(state);

        debug!(
            target: "bot_runtime::module_lock",
            module,
            held_ms = held_for.unwrap_or_default().as_millis() as u64,
            "Module lock released"
        );
        Ok(())
    }

    /// Clears the holder unconditionally (disconnect, reset).
    ///
    /// Returns the module that held the lock, if any.
    pub fn force_release(&self) -> Option<String> {
        let mut state = self.inner.state.lock();
        let holder = state.holder.take()?;
        state.last_holder = Some(holder.module.clone());
        state.last_release = Some(Instant::now());
        drop(state);

        warn!(
            target: "bot_runtime::module_lock",
            module = %holder.module,
            "Module lock force-released"
        );
        Some(holder.module)
    }

    pub fn holder(&self) -> Option<String> {
        self.inner
            .state
            .lock()
            .holder
            .as_ref()
            .map(|h| h.module.clone())
    }

    pub fn is_held_by(&self, module: &str) -> bool {
        self.inner
            .state
            .lock()
            .holder
            .as_ref()
            .is_some_and(|h| h.module == module)
    }

    pub fn get_status(&self) -> LockStatus {
        let now = Instant::now();
        let (holder, holder_priority, held_for, last_holder, since_release) = {
            let state = self.inner.state.lock();
            (
                state.holder.as_ref().map(|h| h.module.clone()),
                state.holder.as_ref().map(|h| h.priority),
                state
                    .holder
                    .as_ref()
                    .map(|h| now.saturating_duration_since(h.acquired_at)),
                state.last_holder.clone(),
                state
                    .last_release
                    .map(|at| now.saturating_duration_since(at)),
            )
        };

        let waiting = self
            .inner
            .waiting
            .lock()
            .waiters
            .iter()
            .map(|w| w.module.clone())
            .collect();

        LockStatus {
            holder,
            holder_priority,
            held_for,
            waiting,
            last_holder,
            since_release,
        }
    }

    fn attempt(&self, module: &str, priority: u32) -> Attempt {
        let mut state = self.inner.state.lock();
        if state.holder.is_some() {
            return Attempt::Busy;
        }

        if let Some(released_at) = state.last_release {
            let related = state
                .last_holder
                .as_deref()
                .is_some_and(|last| self.groups().same_group(last, module));
            let elapsed = Instant::now().saturating_duration_since(released_at);
            let delay = self.inner.config.inter_module_delay;

            if !related && elapsed < delay {
                return Attempt::Cooldown(delay - elapsed);
            }
        }

        let lease = state.next_lease;
        state.next_lease += 1;
        state.holder = Some(Holder {
            module: module.to_owned(),
            priority,
            acquired_at: Instant::now(),
            lease,
        });
        Attempt::Acquired(lease)
    }
}

/// Registration in the wait queue for the duration of one acquisition.
///
/// Removed on drop, so a cancelled `acquire` future leaves no stale waiter.
struct WaitTicket<'a> {
    inner: &'a Inner,
    ticket: u64,
    priority: u32,
}

impl<'a> WaitTicket<'a> {
    fn register(inner: &'a Inner, module: &str, priority: u32) -> Self {
        let mut queue = inner.waiting.lock();
        let ticket = queue.next_ticket;
        queue.next_ticket += 1;
        queue.waiters.push(Waiter {
            ticket,
            module: module.to_owned(),
            priority,
        });

        Self {
            inner,
            ticket,
            priority,
        }
    }

    /// True if another waiter is strictly more urgent.
    fn outranked(&self) -> bool {
        self.inner
            .waiting
            .lock()
            .waiters
            .iter()
            .any(|w| w.ticket != self.ticket && w.priority < self.priority)
    }
}

impl Drop for WaitTicket<'_> {
    fn drop(&mut self) {
        self.inner
            .waiting
            .lock()
            .waiters
            .retain(|w| w.ticket != self.ticket);
    }
}
