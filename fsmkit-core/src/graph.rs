//! State graph: the declarative, read-only description of one workflow.

use crate::definition::GraphDefinition;
use crate::error::CoreError;
use crate::transition::Transition;
use crate::types::{Event, State};
use std::collections::{BTreeMap, HashMap};

/// Transition table: from-state -> event -> transition.
pub type TransitionTable = HashMap<State, HashMap<Event, Transition>>;

/// Validated and indexed graph of states and transitions.
///
/// Built once through [`StateGraphBuilder`]; there are no mutating methods afterwards.
#[derive(Debug, Clone)]
pub struct StateGraph {
    name: String,
    start: State,
    end: Vec<State>,
    states: BTreeMap<State, String>,
    transitions: TransitionTable,
    checksum: String,
}

impl StateGraph {
    pub fn builder() -> StateGraphBuilder {
        StateGraphBuilder::default()
    }

    /// Builds a graph from its serializable form. Transitions get no-op actions.
    pub fn from_definition(definition: GraphDefinition) -> Result<Self, CoreError> {
        definition.into_builder().build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared start state. Informational: `run` accepts any non-terminal state.
    pub fn start(&self) -> State {
        self.start
    }

    /// Terminal states in declaration order.
    pub fn end(&self) -> &[State] {
        &self.end
    }

    /// Returns true if `state` is one of the terminal states.
    pub fn is_end(&self, state: State) -> bool {
        self.end.contains(&state)
    }

    /// Returns true if the given state is declared in this graph.
    pub fn has_state(&self, state: State) -> bool {
        self.states.contains_key(&state)
    }

    pub fn label(&self, state: State) -> Option<&str> {
        self.states.get(&state).map(String::as_str)
    }

    /// Renders a state as `label(id)`, or `?(id)` when it is not declared.
    pub fn describe(&self, state: State) -> String {
        format!("{}({})", self.label(state).unwrap_or("?"), state)
    }

    /// Resolves a state by numeric id or by label.
    pub fn resolve(&self, token: &str) -> Option<State> {
        if let Ok(id) = token.parse::<u8>() {
            let state = State(id);
            return self.has_state(state).then_some(state);
        }
        self.states
            .iter()
            .find(|(_, label)| label.as_str() == token)
            .map(|(state, _)| *state)
    }

    /// All declared states with their labels, ordered by id.
    pub fn states(&self) -> impl Iterator<Item = (State, &str)> {
        self.states.iter().map(|(s, label)| (*s, label.as_str()))
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// Looks up the transition for the given state and event.
    pub fn get_transition(&self, from: State, event: &str) -> Option<&Transition> {
        self.transitions.get(&from).and_then(|events| events.get(event))
    }

    /// Returns all events registered from the given state, sorted.
    pub fn events_from(&self, state: State) -> Vec<&Event> {
        let mut events: Vec<&Event> = self
            .transitions
            .get(&state)
            .map(|events| events.keys().collect())
            .unwrap_or_default();
        events.sort();
        events
    }

    /// All transitions ordered by source state, then event.
    pub fn transitions(&self) -> Vec<&Transition> {
        let mut all: Vec<&Transition> = self
            .transitions
            .values()
            .flat_map(|events| events.values())
            .collect();
        all.sort_by(|a, b| (a.from, &a.event).cmp(&(b.from, &b.event)));
        all
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.values().map(HashMap::len).sum()
    }

    /// Exports the graph without its callbacks.
    pub fn to_definition(&self) -> GraphDefinition {
        GraphDefinition::from_graph(self)
    }

    /// CRC32C of the canonical JSON definition, as 8 hex digits.
    pub fn checksum(&self) -> &str {
        &self.checksum
    }
}

/// Fluent builder for [`StateGraph`]. Nothing is checked until [`build`](Self::build).
#[derive(Debug, Clone, Default)]
pub struct StateGraphBuilder {
    name: String,
    start: Option<State>,
    end: Vec<State>,
    states: BTreeMap<State, String>,
    transitions: TransitionTable,
    duplicate_states: Vec<State>,
    duplicate_transitions: Vec<(State, Event)>,
}

impl StateGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn start(mut self, start: State) -> Self {
        self.start = Some(start);
        self
    }

    /// Replaces the terminal states.
    pub fn end(mut self, end: impl IntoIterator<Item = State>) -> Self {
        self.end = end.into_iter().collect();
        self
    }

    /// Replaces the declared states.
    pub fn states<L>(mut self, states: impl IntoIterator<Item = (State, L)>) -> Self
    where
        L: Into<String>,
    {
        self.states.clear();
        self.duplicate_states.clear();
        for (state, label) in states {
            self = self.state(state, label);
        }
        self
    }

    /// Declares a single state.
    pub fn state(mut self, state: State, label: impl Into<String>) -> Self {
        if self.states.insert(state, label.into()).is_some() {
            self.duplicate_states.push(state);
        }
        self
    }

    /// Replaces the whole transition table. Each entry's `from` must match its outer key.
    pub fn transitions(mut self, transitions: TransitionTable) -> Self {
        self.transitions = transitions;
        self.duplicate_transitions.clear();
        self
    }

    /// Registers a single transition under its own `from` and `event`.
    pub fn transition(mut self, transition: Transition) -> Self {
        let key = (transition.from, transition.event.clone());
        let previous = self
            .transitions
            .entry(transition.from)
            .or_default()
            .insert(transition.event.clone(), transition);
        if previous.is_some() {
            self.duplicate_transitions.push(key);
        }
        self
    }

    /// Validates and freezes the graph.
    pub fn build(self) -> Result<StateGraph, CoreError> {
        if self.name.trim().is_empty() {
            return Err(CoreError::invalid("machine name is empty"));
        }

        if self.states.is_empty() {
            return Err(CoreError::invalid(format!(
                "machine '{}' declares no states",
                self.name
            )));
        }

        if let Some(state) = self.duplicate_states.first() {
            return Err(CoreError::invalid(format!(
                "state {} declared more than once",
                state
            )));
        }

        let start = self
            .start
            .ok_or_else(|| CoreError::invalid("start state not specified"))?;
        if !self.states.contains_key(&start) {
            return Err(CoreError::invalid(format!(
                "start state {} not in states list",
                start
            )));
        }

        for end in &self.end {
            if !self.states.contains_key(end) {
                return Err(CoreError::invalid(format!(
                    "terminal state {} not in states list",
                    end
                )));
            }
        }

        if let Some((from, event)) = self.duplicate_transitions.first() {
            return Err(CoreError::invalid(format!(
                "duplicate transition from {} on event '{}'",
                from, event
            )));
        }

        let mut keys: Vec<&State> = self.transitions.keys().collect();
        keys.sort();
        for key in keys {
            if !self.states.contains_key(key) {
                return Err(CoreError::invalid(format!(
                    "transition source {} not in states list",
                    key
                )));
            }

            let mut events: Vec<(&Event, &Transition)> = self.transitions[key].iter().collect();
            events.sort_by(|a, b| a.0.cmp(b.0));
            for (event, t) in events {
                if t.from != *key {
                    return Err(CoreError::invalid(format!(
                        "transition on '{}' registered under state {} declares from {}",
                        event, key, t.from
                    )));
                }
                if t.event != *event {
                    return Err(CoreError::invalid(format!(
                        "transition registered under event '{}' declares event '{}'",
                        event, t.event
                    )));
                }
                if !self.states.contains_key(&t.to) {
                    return Err(CoreError::invalid(format!(
                        "transition target {} not in states list",
                        t.to
                    )));
                }
            }

            if self.end.contains(key) && !self.transitions[key].is_empty() {
                tracing::warn!(
                    machine = %self.name,
                    state = %key,
                    "terminal state has outgoing transitions; they can never fire"
                );
            }
        }

        let mut graph = StateGraph {
            name: self.name,
            start,
            end: self.end,
            states: self.states,
            transitions: self.transitions,
            checksum: String::new(),
        };

        let json_bytes = serde_json::to_vec(&graph.to_definition())?;
        graph.checksum = format!("{:08x}", crc32c::crc32c(&json_bytes));

        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: State = State(0);
    const B: State = State(1);
    const C: State = State(2);

    fn sample() -> StateGraphBuilder {
        StateGraph::builder()
            .name("sample")
            .start(A)
            .end([C])
            .states([(A, "a"), (B, "b"), (C, "c")])
            .transition(Transition::new(A, "next", B))
            .transition(Transition::new(B, "next", C))
            .transition(Transition::new(B, "back", A))
    }

    #[test]
    fn test_build_and_lookup() {
        let graph = sample().build().unwrap();

        assert_eq!(graph.name(), "sample");
        assert_eq!(graph.start(), A);
        assert_eq!(graph.state_count(), 3);
        assert_eq!(graph.transition_count(), 3);

        let t = graph.get_transition(A, "next").unwrap();
        assert_eq!(t.to, B);
        assert!(graph.get_transition(A, "back").is_none());
        assert!(graph.get_transition(State(7), "next").is_none());
    }

    #[test]
    fn test_is_end_membership() {
        let graph = sample().end([C, C]).build().unwrap();

        assert!(graph.is_end(C));
        assert!(!graph.is_end(A));
        assert!(!graph.is_end(State(42)));
    }

    #[test]
    fn test_describe_and_resolve() {
        let graph = sample().build().unwrap();

        assert_eq!(graph.describe(B), "b(1)");
        assert_eq!(graph.describe(State(9)), "?(9)");
        assert_eq!(graph.resolve("c"), Some(C));
        assert_eq!(graph.resolve("1"), Some(B));
        assert_eq!(graph.resolve("9"), None);
        assert_eq!(graph.resolve("zzz"), None);
    }

    #[test]
    fn test_events_from_sorted() {
        let graph = sample().build().unwrap();
        let events: Vec<&str> = graph.events_from(B).iter().map(|e| e.as_str()).collect();
        assert_eq!(events, vec!["back", "next"]);
        assert!(graph.events_from(C).is_empty());
    }

    #[test]
    fn test_empty_terminal_set_allowed() {
        let graph = sample().end(Vec::new()).build().unwrap();
        assert!(graph.end().is_empty());
    }

    #[test]
    fn test_rejects_missing_start() {
        let result = StateGraph::builder()
            .name("x")
            .states([(A, "a")])
            .build();
        assert!(matches!(result, Err(CoreError::InvalidDefinition { .. })));
    }

    #[test]
    fn test_rejects_undeclared_start_and_end() {
        let result = sample().start(State(9)).build();
        assert!(matches!(result, Err(CoreError::InvalidDefinition { .. })));

        let result = sample().end([State(9)]).build();
        assert!(matches!(result, Err(CoreError::InvalidDefinition { .. })));
    }

    #[test]
    fn test_rejects_unknown_target() {
        let result = sample().transition(Transition::new(A, "jump", State(9))).build();
        assert!(matches!(result, Err(CoreError::InvalidDefinition { .. })));
    }

    #[test]
    fn test_rejects_from_key_mismatch() {
        let mut table = TransitionTable::new();
        table
            .entry(A)
            .or_default()
            .insert(Event::from("next"), Transition::new(B, "next", C));

        let result = sample().transitions(table).build();
        match result {
            Err(CoreError::InvalidDefinition { reason }) => {
                assert!(reason.contains("declares from 1"), "{}", reason)
            }
            other => panic!("expected InvalidDefinition, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_undeclared_source() {
        let result = sample()
            .transition(Transition::new(State(9), "next", A))
            .build();
        match result {
            Err(CoreError::InvalidDefinition { reason }) => {
                assert!(reason.contains("transition source 9"), "{}", reason)
            }
            other => panic!("expected InvalidDefinition, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_event_key_mismatch() {
        let mut table = TransitionTable::new();
        table
            .entry(A)
            .or_default()
            .insert(Event::from("next"), Transition::new(A, "skip", C));

        let result = sample().transitions(table).build();
        match result {
            Err(CoreError::InvalidDefinition { reason }) => {
                assert!(reason.contains("declares event 'skip'"), "{}", reason)
            }
            other => panic!("expected InvalidDefinition, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_duplicate_transition() {
        let result = sample().transition(Transition::new(A, "next", C)).build();
        assert!(matches!(result, Err(CoreError::InvalidDefinition { .. })));
    }

    #[test]
    fn test_rejects_empty_name_and_states() {
        assert!(sample().name("  ").build().is_err());
        assert!(StateGraph::builder().name("x").start(A).build().is_err());
    }

    #[test]
    fn test_terminal_with_outgoing_edge_is_accepted() {
        let graph = sample()
            .transition(Transition::new(C, "again", A))
            .build()
            .unwrap();
        assert!(graph.is_end(C));
        assert!(graph.get_transition(C, "again").is_some());
    }

    #[test]
    fn test_checksum_stable_across_insertion_order() {
        let first = sample().build().unwrap();
        let second = StateGraph::builder()
            .name("sample")
            .start(A)
            .end([C])
            .states([(C, "c"), (B, "b"), (A, "a")])
            .transition(Transition::new(B, "back", A))
            .transition(Transition::new(B, "next", C))
            .transition(Transition::new(A, "next", B))
            .build()
            .unwrap();

        assert_eq!(first.checksum(), second.checksum());
        assert_eq!(first.checksum().len(), 8);

        let changed = sample().end([B]).build().unwrap();
        assert_ne!(first.checksum(), changed.checksum());
    }
}
