//! Action data model shared by producer modules and the scheduler.
//!
//! `bot-core` defines what a queued game operation *is*: its [`ActionType`],
//! the input restriction class ([`ActionCategory`]) derived from it, and the
//! [`Action`] value that carries the execution and validation closures.
//! Deciding *when* an action runs lives in `bot-runtime`.
pub mod action;

pub use action::{
    Action, ActionCategory, ActionContext, ActionError, ActionResult, ActionSummary, ActionType,
    ExecuteFn, ValidateFn,
};
