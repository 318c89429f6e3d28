//! # fsmkit-workflows
//!
//! Ready-made lifecycles for the fsmkit engine:
//! - [`order`]: main order payment lifecycle
//! - [`sub_order`]: per-item lifecycle with shipping and after-sale loops
//! - [`after_sale`]: after-sale review, return and refund
//!
//! Each module exposes its state and event constants, a preconfigured
//! [`StateMachineBuilder`](fsmkit_core::StateMachineBuilder) and a `machine()` shortcut.

pub mod after_sale;
pub mod order;
pub mod sub_order;

use fsmkit_core::{
    CoreError, Event, HookResult, MachineOptions, MachineRegistry, State, TracingProcessor,
};
use std::sync::Arc;

/// Builds a registry holding all three lifecycles, each with a tracing processor.
pub fn registry(options: MachineOptions) -> Result<MachineRegistry, CoreError> {
    let registry = MachineRegistry::new();
    let builders = [
        (order::NAME, order::builder()),
        (sub_order::NAME, sub_order::builder()),
        (after_sale::NAME, after_sale::builder()),
    ];
    for (name, builder) in builders {
        let machine = builder
            .processor(Arc::new(TracingProcessor::new(name)))
            .options(options)
            .build()?;
        registry.register(machine)?;
    }
    Ok(registry)
}

/// Action that records the business step in the log and always succeeds.
pub(crate) fn log_step(
    machine: &'static str,
    step: &'static str,
) -> impl Fn(State, &Event, State) -> HookResult + Send + Sync + 'static {
    move |from: State, event: &Event, to: State| {
        tracing::info!(machine, step, %from, %event, %to, "workflow step");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_holds_all_workflows() {
        let registry = registry(MachineOptions::default()).unwrap();
        assert_eq!(
            registry.names(),
            vec![after_sale::NAME, order::NAME, sub_order::NAME]
        );
    }

    #[test]
    fn test_registry_applies_options() {
        let options =
            MachineOptions::default().with_lock_policy(fsmkit_core::LockPolicy::PerEntity);
        let registry = registry(options).unwrap();
        let machine = registry.get(order::NAME).unwrap();
        assert_eq!(machine.options(), options);
    }
}
