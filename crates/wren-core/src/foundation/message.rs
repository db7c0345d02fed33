//! The chat view of an event.

use std::collections::HashMap;
use std::sync::Arc;

use super::{Channel, Event};

// ============================================================================
// Match Groups
// ============================================================================

/// Capture groups extracted by a regular-expression match.
///
/// Index `0` is the whole match; `1..` are the positional groups in pattern
/// order. Groups that did not participate in the match are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchGroups {
    positional: Vec<Option<String>>,
    named: HashMap<String, String>,
}

impl MatchGroups {
    pub fn from_captures(re: &regex::Regex, caps: &regex::Captures<'_>) -> Self {
        let positional = caps
            .iter()
            .map(|m| m.map(|m| m.as_str().to_owned()))
            .collect();
        let named = re
            .capture_names()
            .flatten()
            .filter_map(|name| caps.name(name).map(|m| (name.to_owned(), m.as_str().to_owned())))
            .collect();
        Self { positional, named }
    }

    /// The text matched by the whole pattern.
    pub fn whole(&self) -> &str {
        self.get(0).unwrap_or_default()
    }

    /// A positional group. `get(1)` is the first parenthesised group.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.positional.get(index).and_then(|g| g.as_deref())
    }

    /// A named group.
    pub fn name(&self, name: &str) -> Option<&str> {
        self.named.get(name).map(String::as_str)
    }

    /// Number of positional groups, excluding the whole match.
    pub fn len(&self) -> usize {
        self.positional.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn named(&self) -> &HashMap<String, String> {
        &self.named
    }
}

// ============================================================================
// Message
// ============================================================================

/// The per-event chat view handed to handlers.
///
/// Built by the engine from an [`Event`]. `text` has the bot mention
/// stripped; `raw_text` is exactly what the user typed.
#[derive(Debug, Clone)]
pub struct Message {
    pub text: String,
    pub raw_text: String,
    pub user: Option<String>,
    pub channel: Channel,
    pub is_direct: bool,
    pub event: Arc<Event>,
    pub groups: MatchGroups,
}

impl Message {
    /// Returns a copy carrying the groups of a matched command.
    pub fn with_groups(&self, groups: MatchGroups) -> Self {
        Self {
            groups,
            ..self.clone()
        }
    }

    /// The event timestamp, used for threading replies.
    pub fn ts(&self) -> Option<&str> {
        self.event.get_str("ts")
    }

    /// The thread this message belongs to, or its own timestamp when it
    /// starts one.
    pub fn thread_ts(&self) -> Option<&str> {
        self.event.get_str("thread_ts").or_else(|| self.ts())
    }
}
