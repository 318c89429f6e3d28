//! Core error types.

use crate::processor::HookFailure;
use crate::types::{Event, State};
use thiserror::Error;

/// Errors from the state machine engine.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown state {state} in machine '{machine}'")]
    UnknownState { machine: String, state: State },

    #[error("state {state} is terminal in machine '{machine}', no further transitions")]
    AlreadyTerminal { machine: String, state: State },

    #[error("no transition from state {state} on event '{event}' in machine '{machine}'")]
    NoTransition {
        machine: String,
        state: State,
        event: Event,
    },

    #[error("{} hook(s) failed during transition to {to} in machine '{machine}'", .failures.len())]
    HooksFailed {
        machine: String,
        to: State,
        failures: Vec<HookFailure>,
    },

    #[error("invalid machine definition: {reason}")]
    InvalidDefinition { reason: String },

    #[error("machine not found: {machine}")]
    MachineNotFound { machine: String },

    #[error("machine already registered: {machine}")]
    MachineExists { machine: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Returns whether this error indicates the operation can be retried.
    ///
    /// None of the engine's failures depend on timing, so repeating the same call
    /// yields the same outcome.
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Returns a stable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::UnknownState { .. } => "UNKNOWN_STATE",
            CoreError::AlreadyTerminal { .. } => "ALREADY_TERMINAL",
            CoreError::NoTransition { .. } => "NO_TRANSITION",
            CoreError::HooksFailed { .. } => "HOOKS_FAILED",
            CoreError::InvalidDefinition { .. } => "BAD_REQUEST",
            CoreError::MachineNotFound { .. } => "MACHINE_NOT_FOUND",
            CoreError::MachineExists { .. } => "MACHINE_EXISTS",
            CoreError::Json(_) => "BAD_REQUEST",
        }
    }

    /// Returns the state the entity moved to, if the transition was applied despite the error.
    pub fn applied_state(&self) -> Option<State> {
        match self {
            CoreError::HooksFailed { to, .. } => Some(*to),
            _ => None,
        }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        CoreError::InvalidDefinition {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::HookStage;

    #[test]
    fn test_error_codes_are_distinct_for_run_failures() {
        let unknown = CoreError::UnknownState {
            machine: "m".into(),
            state: State(9),
        };
        let terminal = CoreError::AlreadyTerminal {
            machine: "m".into(),
            state: State(1),
        };
        let missing = CoreError::NoTransition {
            machine: "m".into(),
            state: State(0),
            event: Event::from("go"),
        };

        assert_eq!(unknown.error_code(), "UNKNOWN_STATE");
        assert_eq!(terminal.error_code(), "ALREADY_TERMINAL");
        assert_eq!(missing.error_code(), "NO_TRANSITION");
        assert!(!unknown.is_retryable());
    }

    #[test]
    fn test_hooks_failed_reports_applied_state() {
        let err = CoreError::HooksFailed {
            machine: "m".into(),
            to: State(2),
            failures: vec![HookFailure {
                stage: HookStage::Action,
                error: "boom".into(),
            }],
        };

        assert_eq!(err.applied_state(), Some(State(2)));
        assert_eq!(
            err.to_string(),
            "1 hook(s) failed during transition to 2 in machine 'm'"
        );
    }
}
