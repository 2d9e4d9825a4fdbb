//! Public error surface of the runtime crate.

pub mod errors;

pub use errors::{LockError, Result, RuntimeError, SubmitError};
