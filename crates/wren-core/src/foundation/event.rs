//! Raw chat events.
//!
//! An [`Event`] is the field mapping an engine produces for everything that
//! happens on the chat service: messages, mentions, interactive actions,
//! acknowledgements. The dispatcher never mutates it; anything derived from
//! it (normalized text, addressing) lives on [`Message`](super::Message).

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Event
// ============================================================================

/// An inbound event as a mapping of string keys to JSON values.
///
/// Conventional keys are `type`, `text`, `channel`, `user` and `ts`; engines
/// are free to add any other field (`callback_id`, `thread_ts`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Event(Map<String, Value>);

impl Event {
    /// Creates an event with the given `type` field.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self::default().with("type", event_type.into())
    }

    /// Builder-style field insertion.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Returns the raw value of a field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns a field if it holds a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// The `type` field.
    pub fn event_type(&self) -> Option<&str> {
        self.get_str("type")
    }

    /// The `text` field.
    pub fn text(&self) -> Option<&str> {
        self.get_str("text")
    }

    /// The `channel` field.
    pub fn channel(&self) -> Option<&str> {
        self.get_str("channel")
    }

    /// The `user` field.
    pub fn user(&self) -> Option<&str> {
        self.get_str("user")
    }

    /// Whether the event carries a non-empty `text` field.
    pub fn has_text(&self) -> bool {
        self.text().is_some_and(|t| !t.trim().is_empty())
    }

    /// Borrows the underlying map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the event, returning the underlying map.
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Event {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Event {
    type Error = Value;

    /// Succeeds only for JSON objects; any other value is handed back.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(other),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::Object(self.0.clone()))
    }
}
