//! Named collection of machines, owned by the application's composition root.

use crate::error::CoreError;
use crate::machine::StateMachine;
use crate::types::State;
use dashmap::DashMap;
use std::sync::Arc;

/// Machines indexed by name.
///
/// Registries are plain values: build one at startup and pass it to whoever needs it.
/// Several registries (for instance one per test) can live in the same process.
#[derive(Debug, Default)]
pub struct MachineRegistry {
    machines: DashMap<String, Arc<StateMachine>>,
}

impl MachineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a machine under its graph name.
    pub fn register(&self, machine: StateMachine) -> Result<Arc<StateMachine>, CoreError> {
        self.register_shared(Arc::new(machine))
    }

    /// Registers an already shared machine under its graph name.
    pub fn register_shared(
        &self,
        machine: Arc<StateMachine>,
    ) -> Result<Arc<StateMachine>, CoreError> {
        use dashmap::mapref::entry::Entry;

        let name = machine.name().to_string();
        match self.machines.entry(name.clone()) {
            Entry::Occupied(_) => Err(CoreError::MachineExists { machine: name }),
            Entry::Vacant(slot) => {
                tracing::info!(
                    machine = %name,
                    checksum = %machine.graph().checksum(),
                    states = machine.graph().state_count(),
                    transitions = machine.graph().transition_count(),
                    "registered machine"
                );
                slot.insert(machine.clone());
                Ok(machine)
            }
        }
    }

    /// Gets a machine by name.
    pub fn get(&self, name: &str) -> Result<Arc<StateMachine>, CoreError> {
        self.machines
            .get(name)
            .map(|r| r.value().clone())
            .ok_or_else(|| CoreError::MachineNotFound {
                machine: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.machines.contains_key(name)
    }

    /// Returns all machine names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.machines.iter().map(|r| r.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.machines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }

    /// Runs a transition on the named machine.
    pub fn run(&self, name: &str, from: State, event: &str) -> Result<State, CoreError> {
        self.get(name)?.run(from, event)
    }

    /// Runs a transition for one entity on the named machine.
    pub fn run_for(
        &self,
        name: &str,
        entity: &str,
        from: State,
        event: &str,
    ) -> Result<State, CoreError> {
        self.get(name)?.run_for(entity, from, event)
    }
}
