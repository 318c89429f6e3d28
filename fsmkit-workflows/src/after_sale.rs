//! After-sale request lifecycle.
//!
//! A request is reviewed first; once passed it either goes through a physical return
//! (`return` -> `wait_receive` -> `refund`) or straight to `refund` for items that never
//! shipped. `complete`, `cancel` and `reject` are terminal.

use crate::log_step;
use fsmkit_core::{CoreError, State, StateMachine, StateMachineBuilder, Transition};

pub const NAME: &str = "after_sale";

pub const WAIT_REVIEW: State = State(0);
pub const REJECTED: State = State(1);
pub const PASSED: State = State(2);
pub const CANCELED: State = State(3);
pub const RETURNING: State = State(4);
pub const WAIT_RECEIVE: State = State(5);
pub const REFUNDING: State = State(6);
pub const COMPLETED: State = State(7);

pub const REJECT: &str = "reject";
pub const PASS: &str = "pass";
pub const CANCEL: &str = "cancel";
pub const SHIP: &str = "ship";
pub const RECEIVE: &str = "receive";
pub const REFUND: &str = "refund";
pub const RETURN: &str = "return";
pub const REFUND_REQ: &str = "refund_req";

fn edge(from: State, event: &'static str, to: State) -> Transition {
    Transition::new(from, event, to).with_action(log_step(NAME, event))
}

pub fn builder() -> StateMachineBuilder {
    StateMachine::builder()
        .name(NAME)
        .start(WAIT_REVIEW)
        .end([COMPLETED, CANCELED, REJECTED])
        .states([
            (WAIT_REVIEW, "wait_review"),
            (REJECTED, "reject"),
            (PASSED, "pass"),
            (CANCELED, "cancel"),
            (RETURNING, "return"),
            (WAIT_RECEIVE, "wait_receive"),
            (REFUNDING, "refund"),
            (COMPLETED, "complete"),
        ])
        .transition(edge(WAIT_REVIEW, REJECT, REJECTED))
        .transition(edge(WAIT_REVIEW, PASS, PASSED))
        .transition(edge(PASSED, RETURN, RETURNING))
        .transition(edge(PASSED, REFUND_REQ, REFUNDING))
        .transition(edge(PASSED, CANCEL, CANCELED))
        .transition(edge(RETURNING, SHIP, WAIT_RECEIVE))
        .transition(edge(WAIT_RECEIVE, RECEIVE, REFUNDING))
        .transition(edge(REFUNDING, REFUND, COMPLETED))
}

pub fn machine() -> Result<StateMachine, CoreError> {
    builder().build()
}
