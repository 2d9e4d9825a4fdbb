//! Action domain.
//!
//! An [`Action`] is one requested game operation. Producer modules build it
//! with an execution closure and, optionally, a late validator that is
//! re-evaluated right before execution, because the game state the producer
//! saw when it decided may be stale by the time the action is dispatched.
//!
//! # Module Structure
//!
//! - `kind`: [`ActionType`] with default priorities and [`ActionCategory`]
//! - `context`: retry bookkeeping and opaque caller payload
//! - `error`: failure kinds reported by closures

mod context;
mod error;
mod kind;

pub use context::ActionContext;
pub use error::{ActionError, ActionResult};
pub use kind::{ActionCategory, ActionType};

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use tokio::time::Instant;

/// Execution closure: `Ok(true)` on success, `Ok(false)` or `Err` on failure.
pub type ExecuteFn = Box<dyn FnMut() -> ActionResult<bool> + Send>;

/// Late validation closure: anything but `Ok(true)` marks the action invalid.
pub type ValidateFn = Box<dyn Fn() -> ActionResult<bool> + Send>;

/// A queued intent to perform one game operation.
pub struct Action {
    action_type: ActionType,
    category: ActionCategory,
    execute: ExecuteFn,
    validate: Option<ValidateFn>,
    source_module: String,
    priority: Option<u32>,
    created_at: Instant,
    expires_at: Option<Instant>,
    context: ActionContext,
}

impl Action {
    /// Creates an action that never expires and is always valid.
    pub fn new<F>(action_type: ActionType, source_module: impl Into<String>, execute: F) -> Self
    where
        F: FnMut() -> ActionResult<bool> + Send + 'static,
    {
        Self {
            action_type,
            category: action_type.category(),
            execute: Box::new(execute),
            validate: None,
            source_module: source_module.into(),
            priority: None,
            created_at: Instant::now(),
            expires_at: None,
            context: ActionContext::default(),
        }
    }

    pub fn with_validator<V>(mut self, validate: V) -> Self
    where
        V: Fn() -> ActionResult<bool> + Send + 'static,
    {
        self.validate = Some(Box::new(validate));
        self
    }

    /// Overrides the type's default priority.
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn expires_at(mut self, deadline: Instant) -> Self {
        self.expires_at = Some(deadline);
        self
    }

    pub fn expires_in(self, ttl: Duration) -> Self {
        let deadline = self.created_at + ttl;
        self.expires_at(deadline)
    }

    pub fn with_payload<T: Any + Send>(mut self, payload: T) -> Self {
        self.context.set_payload(payload);
        self
    }

    pub fn action_type(&self) -> ActionType {
        self.action_type
    }

    pub fn category(&self) -> ActionCategory {
        self.category
    }

    pub fn source_module(&self) -> &str {
        &self.source_module
    }

    /// Effective priority: the override if present, otherwise the type default.
    pub fn priority(&self) -> u32 {
        self.priority.unwrap_or_else(|| self.action_type.priority())
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.expires_at
    }

    pub fn context(&self) -> &ActionContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut ActionContext {
        &mut self.context
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|deadline| Instant::now() > deadline)
    }

    /// Not expired and the validator accepts it.
    ///
    /// Validator errors and panics count as "invalid".
    pub fn is_valid(&self) -> bool {
        if self.is_expired() {
            return false;
        }
        let Some(validate) = &self.validate else {
            return true;
        };
        matches!(catch_unwind(AssertUnwindSafe(|| validate())), Ok(Ok(true)))
    }

    pub fn is_immediate(&self) -> bool {
        self.action_type.is_immediate()
    }

    pub fn is_mouse_action(&self) -> bool {
        self.category == ActionCategory::Mouse
    }

    /// Runs the execution closure, converting a panic into [`ActionError::Panicked`].
    pub fn execute(&mut self) -> ActionResult<bool> {
        catch_unwind(AssertUnwindSafe(|| (self.execute)()))
            .unwrap_or_else(|panic| Err(ActionError::from_panic(panic)))
    }

    /// Lightweight, cloneable description for diagnostics and events.
    pub fn summary(&self) -> ActionSummary {
        ActionSummary {
            action_type: self.action_type,
            category: self.category,
            priority: self.priority(),
            source_module: self.source_module.clone(),
            retry_count: self.context.retry_count,
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("action_type", &self.action_type)
            .field("category", &self.category)
            .field("source_module", &self.source_module)
            .field("priority", &self.priority())
            .field("expires_at", &self.expires_at)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

/// Snapshot of an action's identifying fields.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionSummary {
    pub action_type: ActionType,
    pub category: ActionCategory,
    pub priority: u32,
    pub source_module: String,
    pub retry_count: u32,
}
