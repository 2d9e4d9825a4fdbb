//! Error types surfaced by the runtime API.
//!
//! Failures of individual actions never show up here: expiry, invalidation
//! and execution failure are recovered inside the executor and only reach
//! callers as statistics and events.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("scheduler must be started from within a tokio runtime")]
    NoAsyncRuntime(#[source] tokio::runtime::TryCurrentError),

    #[error("executor worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),

    #[error("executor worker did not stop within {timeout_ms}ms and was aborted")]
    StopTimeout { timeout_ms: u64 },
}

/// Why an action was not accepted by [`crate::ActionScheduler::try_submit`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("scheduler is not running")]
    NotRunning,

    #[error("immediate {action} action did not succeed")]
    ImmediateFailed { action: bot_core::ActionType },
}

/// Failures of the cross-module lock.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LockError {
    #[error("module `{module}` timed out after {waited_ms}ms waiting for the module lock")]
    Timeout { module: String, waited_ms: u64 },

    #[error("module `{module}` does not hold the module lock (holder: {holder:?})")]
    NotHolder {
        module: String,
        holder: Option<String>,
    },
}
