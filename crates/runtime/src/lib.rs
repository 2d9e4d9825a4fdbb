//! Action scheduling and execution engine.
//!
//! Every behavioral module (targeting, looting, navigation, fishing, chat
//! response, ...) wants to drive the same input channel. This crate makes
//! that safe: modules hand [`bot_core::Action`]s to one [`ActionScheduler`],
//! which orders them, re-validates them right before execution, holds back
//! pointer actions while the character is mid-step, retries those that were
//! transiently blocked, and paces execution with humanized timing.
//!
//! Modules that must emit a multi-packet burst without interleaving use the
//! [`ModuleLock`], which is independent of the scheduler.
//!
//! Modules are organized by responsibility:
//! - [`scheduler`] hosts the queues, the executor worker and statistics
//! - [`lock`] provides the cross-module lock and its group table
//! - [`pacing`] computes humanized inter-action delays
//! - [`events`] publishes per-action dispositions for observability
//! - [`config`] and [`api`] hold configuration and error types
pub mod api;
pub mod config;
pub mod events;
pub mod lock;
pub mod pacing;
pub mod scheduler;

pub use api::{LockError, Result, RuntimeError, SubmitError};
pub use config::{
    MAX_BLOCKED_RETRIES, ModuleLockConfig, PacingConfig, RetryConfig, SchedulerConfig,
};
pub use events::{DiscardReason, SchedulerEvent};
pub use lock::{
    DEFAULT_LOCK_PRIORITY, LockStatus, ModuleGroups, ModuleGuard, ModuleLock, OwnedLease,
    SOLO_GROUP,
};
pub use pacing::HumanizedPacer;
pub use scheduler::{ActionScheduler, Predicate, StatsSnapshot};
