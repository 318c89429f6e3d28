//! Serializable graph definitions.
//!
//! Definitions describe a graph without its callbacks, so they can be kept in
//! JSON or YAML files:
//!
//! ```json
//! {
//!   "name": "order",
//!   "start": 0,
//!   "end": [3],
//!   "states": [
//!     {"id": 0, "label": "wait_pay"},
//!     {"id": 1, "label": "wait_confirm"},
//!     {"id": 2, "label": "payied"},
//!     {"id": 3, "label": "canceled"}
//!   ],
//!   "transitions": [
//!     {"from": 0, "event": "pay", "to": 1},
//!     {"from": 0, "event": "cancel", "to": 3},
//!     {"from": 1, "event": "pay_confirm", "to": 2}
//!   ]
//! }
//! ```

use crate::error::CoreError;
use crate::graph::{StateGraph, StateGraphBuilder};
use crate::transition::Transition;
use crate::types::{Event, State};
use serde::{Deserialize, Serialize};

/// A declared state and its label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDefinition {
    pub id: State,
    pub label: String,
}

/// A callback-free transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionDefinition {
    pub from: State,
    pub event: Event,
    pub to: State,
}

/// Raw graph definition as stored/transmitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphDefinition {
    /// Machine name.
    pub name: String,

    /// Start state.
    pub start: State,

    /// Terminal states.
    #[serde(default)]
    pub end: Vec<State>,

    /// All valid states.
    pub states: Vec<StateDefinition>,

    /// Transitions.
    #[serde(default)]
    pub transitions: Vec<TransitionDefinition>,
}

impl GraphDefinition {
    /// Parses a definition from JSON text.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Returns the definition as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Converts the definition into an unvalidated graph builder.
    pub fn into_builder(self) -> StateGraphBuilder {
        let mut builder = StateGraph::builder()
            .name(self.name)
            .start(self.start)
            .end(self.end);
        for state in self.states {
            builder = builder.state(state.id, state.label);
        }
        for t in self.transitions {
            builder = builder.transition(Transition::new(t.from, t.event, t.to));
        }
        builder
    }

    /// Canonical form of a graph: states by id, transitions by source then event.
    pub(crate) fn from_graph(graph: &StateGraph) -> Self {
        Self {
            name: graph.name().to_string(),
            start: graph.start(),
            end: graph.end().to_vec(),
            states: graph
                .states()
                .map(|(id, label)| StateDefinition {
                    id,
                    label: label.to_string(),
                })
                .collect(),
            transitions: graph
                .transitions()
                .into_iter()
                .map(|t| TransitionDefinition {
                    from: t.from,
                    event: t.event.clone(),
                    to: t.to,
                })
                .collect(),
        }
    }
}
