//! Machine execution policies.

use serde::{Deserialize, Serialize};

/// How concurrent `run` calls on one machine are serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockPolicy {
    /// One lock for the whole machine: every transition runs alone.
    #[default]
    Machine,
    /// `run_for` locks per entity id; distinct entities transition concurrently.
    PerEntity,
}

impl LockPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "machine" => Some(LockPolicy::Machine),
            "per_entity" | "per-entity" | "entity" => Some(LockPolicy::PerEntity),
            _ => None,
        }
    }
}

/// What `run` does when a hook or the action returns an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookFailurePolicy {
    /// Log the failure and report the transition as successful.
    #[default]
    Ignore,
    /// Run every step, then return `CoreError::HooksFailed` carrying the applied state.
    Fail,
}

impl HookFailurePolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ignore" => Some(HookFailurePolicy::Ignore),
            "fail" => Some(HookFailurePolicy::Fail),
            _ => None,
        }
    }
}

/// Per-machine options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineOptions {
    pub lock_policy: LockPolicy,
    pub hook_failure_policy: HookFailurePolicy,
}

impl MachineOptions {
    pub fn with_lock_policy(mut self, policy: LockPolicy) -> Self {
        self.lock_policy = policy;
        self
    }

    pub fn with_hook_failure_policy(mut self, policy: HookFailurePolicy) -> Self {
        self.hook_failure_policy = policy;
        self
    }
}
