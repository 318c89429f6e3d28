//! State machine runtime: one graph, one default processor, serialized execution.

use crate::error::CoreError;
use crate::graph::{StateGraph, StateGraphBuilder, TransitionTable};
use crate::policy::{HookFailurePolicy, LockPolicy, MachineOptions};
use crate::processor::{EventProcessor, HookFailure, HookResult, HookStage, NoopProcessor};
use crate::transition::Transition;
use crate::types::{Event, State};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Outcome of a transition, including any hook failures observed on the way.
#[derive(Debug)]
pub struct RunReport {
    pub from: State,
    pub event: Event,
    pub to: State,
    pub failures: Vec<HookFailure>,
}

impl RunReport {
    /// Returns true if every hook and the action succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// The state machine engine.
///
/// The caller owns each entity's current state: `run` takes it in and hands the
/// new one back, nothing is stored here.
pub struct StateMachine {
    graph: StateGraph,

    /// Machine-level processor, run before any per-transition processor.
    processor: Arc<dyn EventProcessor>,

    options: MachineOptions,

    /// Machine-wide lock held for the whole hook sequence.
    lock: Mutex<()>,

    /// Per-entity locks, created lazily for `LockPolicy::PerEntity`.
    entity_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl StateMachine {
    pub fn builder() -> StateMachineBuilder {
        StateMachineBuilder::default()
    }

    /// Creates a machine with a no-op default processor and default options.
    pub fn new(graph: StateGraph) -> Self {
        Self::with_processor(graph, Arc::new(NoopProcessor))
    }

    pub fn with_processor(graph: StateGraph, processor: Arc<dyn EventProcessor>) -> Self {
        Self::with_options(graph, processor, MachineOptions::default())
    }

    pub fn with_options(
        graph: StateGraph,
        processor: Arc<dyn EventProcessor>,
        options: MachineOptions,
    ) -> Self {
        Self {
            graph,
            processor,
            options,
            lock: Mutex::new(()),
            entity_locks: DashMap::new(),
        }
    }

    pub fn graph(&self) -> &StateGraph {
        &self.graph
    }

    pub fn name(&self) -> &str {
        self.graph.name()
    }

    pub fn options(&self) -> MachineOptions {
        self.options
    }

    /// Renders a state as `label(id)`.
    pub fn describe(&self, state: State) -> String {
        self.graph.describe(state)
    }

    /// Returns true if `run(from, event)` would pass its preconditions.
    pub fn can_fire(&self, from: State, event: &str) -> bool {
        self.check(from, event).is_ok()
    }

    /// Advances an entity from `from` on `event` and returns the new state.
    ///
    /// Preconditions are checked in order: `from` must be declared, must not be terminal,
    /// and must have a transition for `event`. The hook sequence then runs under the
    /// machine-wide lock; see [`HookFailurePolicy`] for how hook errors are reported.
    pub fn run(&self, from: State, event: &str) -> Result<State, CoreError> {
        let report = self.run_report(from, event)?;
        self.settle(report)
    }

    /// Like [`run`](Self::run) but returns every hook failure instead of applying the
    /// hook-failure policy. Only precondition failures are errors here.
    pub fn run_report(&self, from: State, event: &str) -> Result<RunReport, CoreError> {
        self.log_request(from, event);
        let transition = self.check(from, event)?;
        let _guard = self.lock.lock();
        Ok(self.fire(transition))
    }

    /// Runs a transition for one entity.
    ///
    /// Under `LockPolicy::PerEntity` only calls for the same `entity` are serialized;
    /// under `LockPolicy::Machine` this is identical to [`run`](Self::run).
    pub fn run_for(&self, entity: &str, from: State, event: &str) -> Result<State, CoreError> {
        self.log_request(from, event);
        let transition = self.check(from, event)?;
        let report = match self.options.lock_policy {
            LockPolicy::Machine => {
                let _guard = self.lock.lock();
                self.fire(transition)
            }
            LockPolicy::PerEntity => {
                let lock = self.entity_lock(entity);
                let _guard = lock.lock();
                self.fire(transition)
            }
        };
        self.settle(report)
    }

    /// Drops the lock table entry for an entity if no call is currently using it.
    pub fn release_entity(&self, entity: &str) -> bool {
        self.entity_locks
            .remove_if(entity, |_, lock| Arc::strong_count(lock) == 1)
            .is_some()
    }

    /// Number of entities with an allocated lock.
    pub fn entity_lock_count(&self) -> usize {
        self.entity_locks.len()
    }

    fn entity_lock(&self, entity: &str) -> Arc<Mutex<()>> {
        if let Some(lock) = self.entity_locks.get(entity) {
            return lock.value().clone();
        }
        self.entity_locks
            .entry(entity.to_string())
            .or_default()
            .value()
            .clone()
    }

    fn log_request(&self, from: State, event: &str) {
        tracing::debug!(
            machine = %self.name(),
            from = %self.graph.describe(from),
            event,
            "transition requested"
        );
    }

    /// Precondition checks only; no logging, no lock.
    fn check(&self, from: State, event: &str) -> Result<&Transition, CoreError> {
        if !self.graph.has_state(from) {
            return Err(CoreError::UnknownState {
                machine: self.name().to_string(),
                state: from,
            });
        }

        if self.graph.is_end(from) {
            return Err(CoreError::AlreadyTerminal {
                machine: self.name().to_string(),
                state: from,
            });
        }

        self.graph
            .get_transition(from, event)
            .ok_or_else(|| CoreError::NoTransition {
                machine: self.name().to_string(),
                state: from,
                event: Event::from(event),
            })
    }

    /// Runs the five-step hook sequence. Must be called with a lock held.
    fn fire(&self, transition: &Transition) -> RunReport {
        let from = transition.from;
        let to = transition.to;
        let event = &transition.event;

        let mut failures = Vec::new();
        let mut observe = |stage: HookStage, result: HookResult| {
            if let Err(error) = result {
                failures.push(HookFailure { stage, error });
            }
        };

        observe(HookStage::DefaultExit, self.processor.exit_old_state(from, to));
        if let Some(processor) = &transition.processor {
            observe(HookStage::TransitionExit, processor.exit_old_state(from, to));
        }
        observe(HookStage::Action, (transition.action)(from, event, to));
        observe(HookStage::DefaultEnter, self.processor.enter_new_state(to, event));
        if let Some(processor) = &transition.processor {
            observe(
                HookStage::TransitionEnter,
                processor.enter_new_state(to, event),
            );
        }

        tracing::debug!(
            machine = %self.name(),
            from = %self.graph.describe(from),
            to = %self.graph.describe(to),
            %event,
            failures = failures.len(),
            "transition applied"
        );

        RunReport {
            from,
            event: event.clone(),
            to,
            failures,
        }
    }

    fn settle(&self, report: RunReport) -> Result<State, CoreError> {
        if report.is_clean() {
            return Ok(report.to);
        }

        match self.options.hook_failure_policy {
            HookFailurePolicy::Ignore => {
                for failure in &report.failures {
                    tracing::warn!(
                        machine = %self.name(),
                        from = %self.graph.describe(report.from),
                        to = %self.graph.describe(report.to),
                        event = %report.event,
                        stage = %failure.stage,
                        error = %failure.error,
                        "hook failed, transition still applied"
                    );
                }
                Ok(report.to)
            }
            HookFailurePolicy::Fail => Err(CoreError::HooksFailed {
                machine: self.name().to_string(),
                to: report.to,
                failures: report.failures,
            }),
        }
    }
}

impl fmt::Debug for StateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("graph", &self.graph)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Builder mirroring the graph builder, plus the machine-level processor and options.
#[derive(Default)]
pub struct StateMachineBuilder {
    graph: StateGraphBuilder,
    processor: Option<Arc<dyn EventProcessor>>,
    options: MachineOptions,
}

impl StateMachineBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.graph = self.graph.name(name);
        self
    }

    pub fn start(mut self, start: State) -> Self {
        self.graph = self.graph.start(start);
        self
    }

    pub fn end(mut self, end: impl IntoIterator<Item = State>) -> Self {
        self.graph = self.graph.end(end);
        self
    }

    pub fn states<L>(mut self, states: impl IntoIterator<Item = (State, L)>) -> Self
    where
        L: Into<String>,
    {
        self.graph = self.graph.states(states);
        self
    }

    pub fn state(mut self, state: State, label: impl Into<String>) -> Self {
        self.graph = self.graph.state(state, label);
        self
    }

    pub fn transitions(mut self, transitions: TransitionTable) -> Self {
        self.graph = self.graph.transitions(transitions);
        self
    }

    pub fn transition(mut self, transition: Transition) -> Self {
        self.graph = self.graph.transition(transition);
        self
    }

    pub fn processor(mut self, processor: Arc<dyn EventProcessor>) -> Self {
        self.processor = Some(processor);
        self
    }

    pub fn options(mut self, options: MachineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn lock_policy(mut self, policy: LockPolicy) -> Self {
        self.options.lock_policy = policy;
        self
    }

    pub fn hook_failure_policy(mut self, policy: HookFailurePolicy) -> Self {
        self.options.hook_failure_policy = policy;
        self
    }

    /// Validates the graph and creates the machine.
    pub fn build(self) -> Result<StateMachine, CoreError> {
        let graph = self.graph.build()?;
        let processor = self
            .processor
            .unwrap_or_else(|| Arc::new(NoopProcessor) as Arc<dyn EventProcessor>);
        Ok(StateMachine::with_options(graph, processor, self.options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDLE: State = State(0);
    const BUSY: State = State(1);
    const DONE: State = State(2);

    fn machine() -> StateMachine {
        StateMachine::builder()
            .name("worker")
            .start(IDLE)
            .end([DONE])
            .states([(IDLE, "idle"), (BUSY, "busy"), (DONE, "done")])
            .transition(Transition::new(IDLE, "start", BUSY))
            .transition(Transition::new(BUSY, "pause", IDLE))
            .transition(Transition::new(BUSY, "finish", DONE))
            .transition(Transition::new(DONE, "restart", IDLE))
            .build()
            .unwrap()
    }

    #[test]
    fn test_run_declared_transition() {
        let m = machine();
        assert_eq!(m.run(IDLE, "start").unwrap(), BUSY);
        assert_eq!(m.run(BUSY, "pause").unwrap(), IDLE);
        assert_eq!(m.run(BUSY, "finish").unwrap(), DONE);
    }

    #[test]
    fn test_unknown_state() {
        let m = machine();
        let result = m.run(State(9), "start");
        assert!(matches!(
            result,
            Err(CoreError::UnknownState { state, .. }) if state == State(9)
        ));
    }

    #[test]
    fn test_terminal_checked_before_lookup() {
        let m = machine();
        // DONE carries a stray "restart" edge, terminality wins.
        assert!(matches!(
            m.run(DONE, "restart"),
            Err(CoreError::AlreadyTerminal { .. })
        ));
        assert!(matches!(
            m.run(DONE, "nothing"),
            Err(CoreError::AlreadyTerminal { .. })
        ));
    }

    #[test]
    fn test_no_transition() {
        let m = machine();
        assert!(matches!(
            m.run(IDLE, "finish"),
            Err(CoreError::NoTransition { .. })
        ));
    }

    #[test]
    fn test_can_fire() {
        let m = machine();
        assert!(m.can_fire(IDLE, "start"));
        assert!(!m.can_fire(IDLE, "finish"));
        assert!(!m.can_fire(DONE, "restart"));
    }

    #[test]
    fn test_run_report_collects_failures_regardless_of_policy() {
        let m = StateMachine::builder()
            .name("flaky")
            .start(IDLE)
            .states([(IDLE, "idle"), (BUSY, "busy")])
            .transition(
                Transition::new(IDLE, "start", BUSY).with_action(|_, _, _| Err("no".into())),
            )
            .hook_failure_policy(HookFailurePolicy::Fail)
            .build()
            .unwrap();

        let report = m.run_report(IDLE, "start").unwrap();
        assert_eq!(report.to, BUSY);
        assert!(!report.is_clean());
        assert_eq!(report.failures[0].stage, HookStage::Action);
    }

    #[test]
    fn test_run_for_per_entity_allocates_locks() {
        let m = StateMachine::builder()
            .name("worker")
            .start(IDLE)
            .states([(IDLE, "idle"), (BUSY, "busy")])
            .transition(Transition::new(IDLE, "start", BUSY))
            .lock_policy(LockPolicy::PerEntity)
            .build()
            .unwrap();

        assert_eq!(m.run_for("a", IDLE, "start").unwrap(), BUSY);
        assert_eq!(m.run_for("b", IDLE, "start").unwrap(), BUSY);
        assert_eq!(m.entity_lock_count(), 2);

        assert!(m.release_entity("a"));
        assert!(!m.release_entity("a"));
        assert_eq!(m.entity_lock_count(), 1);
    }

    #[test]
    fn test_run_for_machine_policy_allocates_nothing() {
        let m = machine();
        assert_eq!(m.run_for("a", IDLE, "start").unwrap(), BUSY);
        assert_eq!(m.entity_lock_count(), 0);
    }

    #[test]
    fn test_builder_rejects_invalid_graph() {
        let result = StateMachine::builder()
            .name("broken")
            .start(IDLE)
            .states([(IDLE, "idle")])
            .transition(Transition::new(IDLE, "go", State(5)))
            .build();
        assert!(matches!(result, Err(CoreError::InvalidDefinition { .. })));
    }
}
