//! Main order lifecycle.
//!
//! ```text
//! wait_pay --pay--------> wait_confirm --pay_confirm--> payied
//! wait_pay --pay_confirm-------------------------------> payied
//! wait_pay --cancel-----> canceled
//! ```
//!
//! `canceled` is the only terminal state.

use crate::log_step;
use fsmkit_core::{CoreError, State, StateMachine, StateMachineBuilder, Transition};

pub const NAME: &str = "order";

pub const WAIT_PAY: State = State(0);
pub const WAIT_CONFIRM: State = State(1);
pub const PAYIED: State = State(2);
pub const CANCELED: State = State(3);

pub const PAY: &str = "pay";
pub const PAY_CONFIRM: &str = "pay_confirm";
pub const CANCEL: &str = "cancel";

fn edge(from: State, event: &'static str, to: State) -> Transition {
    Transition::new(from, event, to).with_action(log_step(NAME, event))
}

pub fn builder() -> StateMachineBuilder {
    StateMachine::builder()
        .name(NAME)
        .start(WAIT_PAY)
        .end([CANCELED])
        .states([
            (WAIT_PAY, "wait_pay"),
            (WAIT_CONFIRM, "wait_confirm"),
            (PAYIED, "payied"),
            (CANCELED, "canceled"),
        ])
        .transition(edge(WAIT_PAY, PAY, WAIT_CONFIRM))
        .transition(edge(WAIT_PAY, CANCEL, CANCELED))
        .transition(edge(WAIT_PAY, PAY_CONFIRM, PAYIED))
        .transition(edge(WAIT_CONFIRM, PAY_CONFIRM, PAYIED))
}

pub fn machine() -> Result<StateMachine, CoreError> {
    builder().build()
}
