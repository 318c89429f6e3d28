//! # fsmkit-core
//!
//! Embeddable finite-state-machine engine.
//!
//! This crate provides:
//! - State graphs built once through a validating builder, then read-only
//! - Transition execution with ordered exit/action/enter hooks
//! - Machine-wide or per-entity serialization of transitions
//! - Serializable graph definitions and a registry of named machines

pub mod definition;
pub mod error;
pub mod graph;
pub mod machine;
pub mod policy;
pub mod processor;
pub mod registry;
pub mod transition;
pub mod types;

pub use definition::{GraphDefinition, StateDefinition, TransitionDefinition};
pub use error::CoreError;
pub use graph::{StateGraph, StateGraphBuilder, TransitionTable};
pub use machine::{RunReport, StateMachine, StateMachineBuilder};
pub use policy::{HookFailurePolicy, LockPolicy, MachineOptions};
pub use processor::{
    EventProcessor, HookError, HookFailure, HookResult, HookStage, NoopProcessor,
    TracingProcessor,
};
pub use registry::MachineRegistry;
pub use transition::{Action, Transition};
pub use types::{Event, State};
