use std::any::Any;
use std::fmt;

use tokio::time::Instant;

/// Per-action bookkeeping.
///
/// The scheduler owns `retry_count` and `blocked_since`; `payload` is opaque
/// caller data, typically read back by the action's own validator.
#[derive(Default)]
pub struct ActionContext {
    /// Number of times the action was deferred into the blocked-retry queue.
    /// Only ever increases.
    pub retry_count: u32,
    /// Time of the first deferral. Set once.
    pub blocked_since: Option<Instant>,
    payload: Option<Box<dyn Any + Send>>,
}

impl ActionContext {
    pub fn with_payload<T: Any + Send>(payload: T) -> Self {
        Self {
            payload: Some(Box::new(payload)),
            ..Self::default()
        }
    }

    pub fn set_payload<T: Any + Send>(&mut self, payload: T) {
        self.payload = Some(Box::new(payload));
    }

    /// Returns the payload if one is set and it has type `T`.
    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.payload.as_ref()?.downcast_ref::<T>()
    }

    /// Records one more deferral, stamping `blocked_since` on the first.
    pub fn mark_blocked(&mut self, now: Instant) {
        self.retry_count += 1;
        if self.blocked_since.is_none() {
            self.blocked_since = Some(now);
        }
    }

    /// Time spent since the first deferral, or zero if never blocked.
    pub fn blocked_for(&self, now: Instant) -> std::time::Duration {
        self.blocked_since
            .map(|since| now.saturating_duration_since(since))
            .unwrap_or_default()
    }
}

impl fmt::Debug for ActionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionContext")
            .field("retry_count", &self.retry_count)
            .field("blocked_since", &self.blocked_since)
            .field("has_payload", &self.payload.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[derive(Debug, PartialEq)]
    struct CreatureId(u32);

    #[test]
    fn payload_is_typed() {
        let ctx = ActionContext::with_payload(CreatureId(42));
        assert_eq!(ctx.payload::<CreatureId>(), Some(&CreatureId(42)));
        assert!(ctx.payload::<u32>().is_none());
    }

    #[test]
    fn blocked_since_is_stamped_once() {
        let mut ctx = ActionContext::default();
        let first = Instant::now();
        ctx.mark_blocked(first);
        ctx.mark_blocked(first + Duration::from_millis(100));

        assert_eq!(ctx.retry_count, 2);
        assert_eq!(ctx.blocked_since, Some(first));
        assert_eq!(
            ctx.blocked_for(first + Duration::from_millis(250)),
            Duration::from_millis(250)
        );
    }
}
