//! Sub-order lifecycle: one shipped item of an order.
//!
//! Refund requests loop back: cancelling an after-sale request returns the item to
//! the state it was in before the request (`wait_ship` or `received`).

use crate::log_step;
use fsmkit_core::{CoreError, State, StateMachine, StateMachineBuilder, Transition};

pub const NAME: &str = "sub_order";

pub const WAIT_PAY: State = State(0);
pub const WAIT_CONFIRM: State = State(1);
pub const WAIT_SHIP: State = State(2);
pub const WAIT_RECEIVE: State = State(3);
pub const AFTER_SALE_REFUND: State = State(4);
pub const AFTER_SALE_REFUND_RETURN: State = State(5);
pub const CANCELED: State = State(6);
pub const RECEIVED: State = State(7);
pub const COMPLETED: State = State(8);

pub const PAY: &str = "pay";
pub const PAY_CONFIRM: &str = "pay_confirm";
pub const SHIP: &str = "ship";
pub const RECEIVE: &str = "receive";
pub const REFUND: &str = "refund";
pub const REFUND_RETURN: &str = "refund_return";
pub const CANCEL: &str = "cancel";
pub const CANCEL_AFTER_SALE: &str = "cancel_after_sale";
pub const AFTER_SALE_COMPLETE: &str = "after_sale_complete";
pub const COMPLETE: &str = "complete";

fn edge(from: State, event: &'static str, to: State) -> Transition {
    Transition::new(from, event, to).with_action(log_step(NAME, event))
}

pub fn builder() -> StateMachineBuilder {
    StateMachine::builder()
        .name(NAME)
        .start(WAIT_PAY)
        .end([COMPLETED, CANCELED])
        .states([
            (WAIT_PAY, "wait_pay"),
            (WAIT_CONFIRM, "wait_confirm"),
            (WAIT_SHIP, "wait_ship"),
            (WAIT_RECEIVE, "wait_receive"),
            (AFTER_SALE_REFUND, "after_sale_refund"),
            (AFTER_SALE_REFUND_RETURN, "after_sale_refund_return"),
            (CANCELED, "canceled"),
            (RECEIVED, "received"),
            (COMPLETED, "completed"),
        ])
        .transition(edge(WAIT_PAY, PAY, WAIT_CONFIRM))
        .transition(edge(WAIT_PAY, CANCEL, CANCELED))
        .transition(edge(WAIT_PAY, PAY_CONFIRM, WAIT_SHIP))
        .transition(edge(WAIT_CONFIRM, PAY_CONFIRM, WAIT_SHIP))
        .transition(edge(WAIT_SHIP, SHIP, WAIT_RECEIVE))
        .transition(edge(WAIT_SHIP, REFUND, AFTER_SALE_REFUND))
        .transition(edge(WAIT_RECEIVE, RECEIVE, RECEIVED))
        .transition(edge(AFTER_SALE_REFUND, AFTER_SALE_COMPLETE, COMPLETED))
        .transition(edge(AFTER_SALE_REFUND, CANCEL_AFTER_SALE, WAIT_SHIP))
        .transition(edge(AFTER_SALE_REFUND_RETURN, AFTER_SALE_COMPLETE, COMPLETED))
        .transition(edge(AFTER_SALE_REFUND_RETURN, CANCEL_AFTER_SALE, RECEIVED))
        .transition(edge(RECEIVED, COMPLETE, COMPLETED))
        .transition(edge(RECEIVED, REFUND_RETURN, AFTER_SALE_REFUND_RETURN))
}

pub fn machine() -> Result<StateMachine, CoreError> {
    builder().build()
}
