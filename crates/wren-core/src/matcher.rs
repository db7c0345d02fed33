//! Field and text matching.
//!
//! - [`subset_match`] decides whether an event carries every field a listener
//!   asked for.
//! - [`CommandPattern`] / [`regex_match`] decide whether a message text
//!   matches a command.

use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value};
use tracing::warn;

use crate::foundation::{Event, MatchGroups};

// ============================================================================
// Criteria
// ============================================================================

/// The fields a listener expects an event to carry.
///
/// ```rust,ignore
/// let criteria = Criteria::new().field("type", "ack").field("id", 42);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria(Map<String, Value>);

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an expected field.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The expected `type` field, if any.
    pub fn event_type(&self) -> Option<&str> {
        self.get("type").and_then(Value::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for Criteria {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Criteria {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// True iff every key of `criteria` is present in `event` with a
/// structurally equal value. Extra event keys are ignored.
///
/// Empty criteria match every event.
pub fn subset_match(event: &Event, criteria: &Criteria) -> bool {
    criteria
        .iter()
        .all(|(key, expected)| event.get(key) == Some(expected))
}

// ============================================================================
// Command Patterns
// ============================================================================

/// A compiled, case-insensitive command pattern.
#[derive(Debug, Clone)]
pub struct CommandPattern {
    source: String,
    anchored: bool,
    regex: Regex,
}

impl CommandPattern {
    /// Compiles `pattern`.
    ///
    /// With `anchor` the whole text must match; otherwise the pattern may
    /// match anywhere in the text.
    pub fn new(pattern: impl Into<String>, anchor: bool) -> Result<Self, regex::Error> {
        let source = pattern.into();
        let effective = if anchor {
            format!("^(?:{source})$")
        } else {
            source.clone()
        };
        let regex = RegexBuilder::new(&effective).case_insensitive(true).build()?;
        Ok(Self {
            source,
            anchored: anchor,
            regex,
        })
    }

    /// The pattern as written by the script author.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_anchored(&self) -> bool {
        self.anchored
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Matches `text`, returning the captured groups.
    pub fn matches(&self, text: &str) -> Option<MatchGroups> {
        self.regex
            .captures(text)
            .map(|caps| MatchGroups::from_captures(&self.regex, &caps))
    }
}

/// One-off case-insensitive match of `text` against `pattern`.
///
/// An invalid pattern never matches; it is logged instead of raised.
pub fn regex_match(text: &str, pattern: &str, anchor: bool) -> Option<MatchGroups> {
    match CommandPattern::new(pattern, anchor) {
        Ok(compiled) => compiled.matches(text),
        Err(err) => {
            warn!(pattern, error = %err, "Invalid command pattern");
            None
        }
    }
}
