use thiserror::Error;

/// Failure reported by an action's execution or validation closure.
#[derive(Debug, Error)]
pub enum ActionError {
    /// The game (or the packet layer) refused the operation.
    #[error("action rejected: {reason}")]
    Rejected { reason: String },

    /// A collaborator the closure depends on is not available right now.
    #[error("{what} unavailable")]
    Unavailable { what: String },

    /// The closure panicked; the panic was contained.
    #[error("action closure panicked: {message}")]
    Panicked { message: String },
}

impl ActionError {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }

    pub fn unavailable(what: impl Into<String>) -> Self {
        Self::Unavailable { what: what.into() }
    }

    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_owned());
        Self::Panicked { message }
    }
}

pub type ActionResult<T> = std::result::Result<T, ActionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_cause() {
        assert_eq!(
            ActionError::rejected("target out of range").to_string(),
            "action rejected: target out of range"
        );
        assert_eq!(ActionError::unavailable("corpse").to_string(), "corpse unavailable");
    }

    #[test]
    fn panic_payloads_are_classified() {
        let from_str = ActionError::from_panic(Box::new("boom"));
        let from_string = ActionError::from_panic(Box::new(String::from("bang")));
        let opaque = ActionError::from_panic(Box::new(7_u8));

        assert!(matches!(from_str, ActionError::Panicked { message } if message == "boom"));
        assert!(matches!(from_string, ActionError::Panicked { message } if message == "bang"));
        assert!(matches!(opaque, ActionError::Panicked { message } if message == "non-string panic payload"));
    }
}
