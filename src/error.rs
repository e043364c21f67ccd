//! Error taxonomy for the agent core.
//!
//! Every failure a turn can produce falls into one of four kinds, and the
//! kind decides the retry policy:
//!
//! - `Validation` — the code validator rejected a script before execution.
//!   Retried like an execution error (the model gets the reason and may
//!   rewrite the script).
//! - `Execution` — the worker failed: runtime fault, timeout, output
//!   contract violation, or an unknown action tag. Retried with the error
//!   re-injected into the next prompt, up to `MAX_RETRIES`.
//! - `Model` — the completion call itself failed (transport, timeout).
//!   Retried; the exhausted-retry message points at connectivity or
//!   configuration rather than the user's request.
//! - `Operational` — undo on an empty stack, export I/O failure. Reported
//!   as the turn message, never retried.
//!
//! The error is serializable because it lives in the persisted
//! `AgentState` between retry iterations.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum AgentError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("LLM error: {0}")]
    Model(String),

    #[error("{0}")]
    Operational(String),
}

impl AgentError {
    /// True for the kinds that re-enter the execute loop with the error
    /// attached to the next prompt.
    pub fn is_retriable(&self) -> bool {
        !matches!(self, AgentError::Operational(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retriable_kinds() {
        assert!(AgentError::Validation("x".into()).is_retriable());
        assert!(AgentError::Execution("x".into()).is_retriable());
        assert!(AgentError::Model("x".into()).is_retriable());
        assert!(!AgentError::Operational("x".into()).is_retriable());
    }

    #[test]
    fn test_display_includes_message() {
        let e = AgentError::Execution("NameError: foo".into());
        assert_eq!(e.to_string(), "Execution error: NameError: foo");
    }

    #[test]
    fn test_serde_round_trip() {
        let e = AgentError::Validation("OS module access is not allowed".into());
        let json = serde_json::to_string(&e).unwrap();
        let back: AgentError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }
}
