//! Hook capability invoked around every transition.
//!
//! A machine owns one default processor; a transition may carry its own. The two are not an
//! override pair: for each phase the machine-level processor runs first, then the transition's.

use crate::types::{Event, State};
use std::fmt;

/// Error type returned by hooks and actions.
pub type HookError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result of a single hook or action invocation.
pub type HookResult = Result<(), HookError>;

/// Callbacks run immediately before leaving the old state and immediately after
/// entering the new one.
///
/// Implementations must not call `run` on the machine that invoked them; the machine lock
/// is held for the whole hook sequence and is not reentrant.
pub trait EventProcessor: Send + Sync {
    fn exit_old_state(&self, from: State, to: State) -> HookResult;

    fn enter_new_state(&self, to: State, event: &Event) -> HookResult;
}

/// Processor that does nothing. Used when a machine is built without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProcessor;

impl EventProcessor for NoopProcessor {
    fn exit_old_state(&self, _from: State, _to: State) -> HookResult {
        Ok(())
    }

    fn enter_new_state(&self, _to: State, _event: &Event) -> HookResult {
        Ok(())
    }
}

/// Processor that logs each hook at debug level.
#[derive(Debug, Clone, Default)]
pub struct TracingProcessor {
    machine: String,
}

impl TracingProcessor {
    pub fn new(machine: impl Into<String>) -> Self {
        Self {
            machine: machine.into(),
        }
    }
}

impl EventProcessor for TracingProcessor {
    fn exit_old_state(&self, from: State, to: State) -> HookResult {
        tracing::debug!(machine = %self.machine, %from, %to, "exiting old state");
        Ok(())
    }

    fn enter_new_state(&self, to: State, event: &Event) -> HookResult {
        tracing::debug!(machine = %self.machine, %to, %event, "entered new state");
        Ok(())
    }
}

/// Step of the hook sequence, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookStage {
    DefaultExit,
    TransitionExit,
    Action,
    DefaultEnter,
    TransitionEnter,
}

impl HookStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookStage::DefaultExit => "default_exit",
            HookStage::TransitionExit => "transition_exit",
            HookStage::Action => "action",
            HookStage::DefaultEnter => "default_enter",
            HookStage::TransitionEnter => "transition_enter",
        }
    }
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A hook or action that returned an error during a transition.
#[derive(Debug)]
pub struct HookFailure {
    pub stage: HookStage,
    pub error: HookError,
}

impl fmt::Display for HookFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.stage, self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_processor_succeeds() {
        let p = NoopProcessor;
        assert!(p.exit_old_state(State(0), State(1)).is_ok());
        assert!(p.enter_new_state(State(1), &Event::from("go")).is_ok());
    }

    #[test]
    fn test_hook_failure_display() {
        let failure = HookFailure {
            stage: HookStage::Action,
            error: "boom".into(),
        };
        assert_eq!(failure.to_string(), "action: boom");
    }
}
