//! Help registry.
//!
//! Built as a side index while handlers register. Each handler gets one
//! record; the first registration that sets a field wins and later ones
//! only fill in fields that are still empty.

use std::collections::BTreeMap;
use std::fmt;

use parking_lot::RwLock;
use regex::Regex;
use tracing::warn;

use crate::handler::{HandlerId, HandlerRef};

const USAGE_MARKER: &str = "Usage: ";

/// A help search tag.
#[derive(Debug, Clone)]
pub enum HelpTag {
    Text(String),
    /// A command pattern. Not searchable by text filters.
    Pattern(Regex),
}

impl HelpTag {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }
}

impl fmt::Display for HelpTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Pattern(re) => f.write_str(re.as_str()),
        }
    }
}

impl PartialEq for HelpTag {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Pattern(a), Self::Pattern(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

/// One handler's help.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HelpRecord {
    pub usage: String,
    pub tags: Vec<HelpTag>,
    pub description: String,
}

/// A `(usage, description)` pair returned by [`HelpRegistry::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpEntry {
    pub usage: String,
    pub description: String,
}

/// Help records keyed by handler. Ids grow with each new handler, so
/// records with the same usage list in the order their handlers were made.
#[derive(Debug, Default)]
pub struct HelpRegistry {
    records: RwLock<BTreeMap<HandlerId, HelpRecord>>,
}

impl HelpRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records help for `handler`.
    ///
    /// - `description` defaults to the handler's doc text.
    /// - A description line containing `Usage: ` overrides `usage`.
    /// - `tags` default to `[usage]`.
    /// - On a repeated registration only empty fields are filled.
    pub fn register(
        &self,
        handler: &HandlerRef,
        usage: Option<HelpTag>,
        tags: Option<Vec<HelpTag>>,
        description: Option<&str>,
    ) {
        let description = match description.filter(|d| !d.is_empty()) {
            Some(d) => d.to_owned(),
            None => dedent(handler.doc()),
        };

        let usage = description
            .lines()
            .find(|line| line.contains(USAGE_MARKER))
            .map(|line| HelpTag::Text(line.replace(USAGE_MARKER, "").trim().to_owned()))
            .or(usage);

        let usage_text = usage.as_ref().map(ToString::to_string).unwrap_or_default();
        let tags = match (tags.filter(|t| !t.is_empty()), usage) {
            (Some(tags), _) => tags,
            (None, Some(usage)) if !usage_text.is_empty() => vec![usage],
            (None, _) => Vec::new(),
        };

        let mut records = self.records.write();
        match records.get_mut(&handler.id()) {
            Some(existing) => {
                if existing.usage.is_empty() {
                    existing.usage = usage_text;
                }
                if existing.tags.is_empty() {
                    existing.tags = tags;
                }
                if existing.description.is_empty() {
                    existing.description = description;
                }
            }
            None => {
                records.insert(
                    handler.id(),
                    HelpRecord {
                        usage: usage_text,
                        tags,
                        description,
                    },
                );
            }
        }
    }

    pub fn get(&self, handler: &HandlerRef) -> Option<HelpRecord> {
        self.records.read().get(&handler.id()).cloned()
    }

    /// Lists help sorted by usage.
    ///
    /// Without a filter each entry carries the first description line.
    /// With a filter only records with a text tag containing it are
    /// returned, with their full description.
    pub fn list(&self, filter: Option<&str>) -> Vec<HelpEntry> {
        let records = self.records.read();
        let mut results: Vec<HelpEntry> = match filter {
            Some(filter) => records
                .values()
                .filter(|record| {
                    record.tags.iter().any(|tag| match tag {
                        HelpTag::Text(text) => text.contains(filter),
                        HelpTag::Pattern(re) => {
                            warn!(tag = re.as_str(), "Help tag is not text, skipping");
                            false
                        }
                    })
                })
                .map(|record| HelpEntry {
                    usage: record.usage.clone(),
                    description: record.description.clone(),
                })
                .collect(),
            None => records
                .values()
                .map(|record| HelpEntry {
                    usage: record.usage.clone(),
                    description: record.description.lines().next().unwrap_or_default().to_owned(),
                })
                .collect(),
        };
        results.sort_by(|a, b| a.usage.cmp(&b.usage));
        results
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

fn dedent(doc: &str) -> String {
    doc.trim()
        .lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
}
