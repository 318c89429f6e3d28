//! State and event identifiers.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// A state identifier, meaningful only within one graph.
///
/// Ordering exists so that graphs can be listed and exported deterministically;
/// the engine itself only compares states for equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct State(pub u8);

impl State {
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    pub const fn id(self) -> u8 {
        self.0
    }
}

impl From<u8> for State {
    fn from(id: u8) -> Self {
        Self(id)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An event name. Lookups accept `&str` through the `Borrow` impl.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Event(pub String);

impl Event {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Event {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Event {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for Event {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
