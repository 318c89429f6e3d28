//! Transition edges.

use crate::processor::{EventProcessor, HookResult};
use crate::types::{Event, State};
use std::fmt;
use std::sync::Arc;

/// Domain callback executed between the exit and enter hooks.
pub type Action = Arc<dyn Fn(State, &Event, State) -> HookResult + Send + Sync>;

/// One edge of a graph: `(from, event) -> to`, with its action and optional hooks.
#[derive(Clone)]
pub struct Transition {
    pub from: State,
    pub event: Event,
    pub to: State,
    pub action: Action,
    pub processor: Option<Arc<dyn EventProcessor>>,
}

impl Transition {
    /// Creates a transition with a no-op action and no processor.
    pub fn new(from: State, event: impl Into<Event>, to: State) -> Self {
        Self {
            from,
            event: event.into(),
            to,
            action: Arc::new(|_, _, _| Ok(())),
            processor: None,
        }
    }

    pub fn with_action<F>(mut self, action: F) -> Self
    where
        F: Fn(State, &Event, State) -> HookResult + Send + Sync + 'static,
    {
        self.action = Arc::new(action);
        self
    }

    pub fn with_processor(mut self, processor: Arc<dyn EventProcessor>) -> Self {
        self.processor = Some(processor);
        self
    }

    pub fn has_processor(&self) -> bool {
        self.processor.is_some()
    }
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("from", &self.from)
            .field("event", &self.event)
            .field("to", &self.to)
            .field("processor", &self.processor.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::NoopProcessor;

    #[test]
    fn test_default_action_is_noop() {
        let t = Transition::new(State(0), "go", State(1));
        assert!((t.action)(State(0), &t.event, State(1)).is_ok());
        assert!(!t.has_processor());
    }

    #[test]
    fn test_builder_methods() {
        let t = Transition::new(State(0), "go", State(1))
            .with_action(|_, _, _| Err("nope".into()))
            .with_processor(Arc::new(NoopProcessor));

        assert!((t.action)(State(0), &t.event, State(1)).is_err());
        assert!(t.has_processor());
        assert_eq!(t.event.as_str(), "go");
    }
}
