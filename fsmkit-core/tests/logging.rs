//! Log lines emitted by the machine.

use fsmkit_core::{State, StateMachine, Transition};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::Subscriber;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// Collects the `message` field of every event.
#[derive(Clone, Default)]
struct Messages(Arc<Mutex<Vec<String>>>);

impl Messages {
    fn count(&self, message: &str) -> usize {
        self.0.lock().iter().filter(|m| m.as_str() == message).count()
    }
}

struct MessageVisitor<'a>(&'a mut Option<String>);

impl Visit for MessageVisitor<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            *self.0 = Some(format!("{:?}", value));
        }
    }
}

impl<S: Subscriber> Layer<S> for Messages {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut message = None;
        event.record(&mut MessageVisitor(&mut message));
        if let Some(message) = message {
            self.0.lock().push(message);
        }
    }
}

fn machine() -> StateMachine {
    StateMachine::builder()
        .name("switch")
        .start(State(0))
        .states([(State(0), "off"), (State(1), "on")])
        .transition(Transition::new(State(0), "flip", State(1)))
        .build()
        .unwrap()
}

fn capture(f: impl FnOnce()) -> Messages {
    let messages = Messages::default();
    let subscriber = tracing_subscriber::registry().with(messages.clone());
    tracing::subscriber::with_default(subscriber, f);
    messages
}

#[test]
fn can_fire_does_not_log_a_request() {
    let m = machine();
    let messages = capture(|| {
        assert!(m.can_fire(State(0), "flip"));
        assert!(!m.can_fire(State(0), "nope"));
    });

    assert_eq!(messages.count("transition requested"), 0);
    assert_eq!(messages.count("transition applied"), 0);
}

#[test]
fn run_logs_request_and_application() {
    let m = machine();
    let messages = capture(|| {
        assert_eq!(m.run(State(0), "flip").unwrap(), State(1));
        assert!(m.run(State(0), "nope").is_err());
        assert_eq!(m.run_for("lamp-1", State(0), "flip").unwrap(), State(1));
    });

    assert_eq!(messages.count("transition requested"), 3);
    assert_eq!(messages.count("transition applied"), 2);
}
