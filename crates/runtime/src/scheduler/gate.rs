//! Movement and capability predicates consulted right before execution.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use bot_core::ActionCategory;

/// Zero-argument boolean query supplied by the game-state layer.
pub type Predicate = Arc<dyn Fn() -> bool + Send + Sync>;

/// The three predicates the executor depends on.
///
/// Defaults make the scheduler usable standalone: never moving, both input
/// channels allowed.
#[derive(Clone)]
pub struct StateChecker {
    is_moving: Predicate,
    can_send_mouse: Predicate,
    can_send_keyboard: Predicate,
}

impl Default for StateChecker {
    fn default() -> Self {
        Self {
            is_moving: Arc::new(|| false),
            can_send_mouse: Arc::new(|| true),
            can_send_keyboard: Arc::new(|| true),
        }
    }
}

impl StateChecker {
    pub fn set_movement(&mut self, is_moving: Predicate) {
        self.is_moving = is_moving;
    }

    pub fn set_capabilities(&mut self, can_send_mouse: Predicate, can_send_keyboard: Predicate) {
        self.can_send_mouse = can_send_mouse;
        self.can_send_keyboard = can_send_keyboard;
    }

    pub fn is_moving(&self) -> bool {
        call_or_false(&self.is_moving)
    }

    /// Category gate: mouse needs the mouse capability and a settled
    /// character, keyboard needs the keyboard capability, `Any` always passes.
    pub fn permits(&self, category: ActionCategory) -> bool {
        match category {
            ActionCategory::Mouse => call_or_false(&self.can_send_mouse) && !self.is_moving(),
            ActionCategory::Keyboard => call_or_false(&self.can_send_keyboard),
            ActionCategory::Any => true,
        }
    }
}

/// A panicking predicate reads as `false`.
fn call_or_false(predicate: &Predicate) -> bool {
    match catch_unwind(AssertUnwindSafe(|| predicate())) {
        Ok(value) => value,
        Err(_) => {
            tracing::error!(target: "bot_runtime::executor", "State predicate panicked, treating as false");
            false
        }
    }
}
