//! Chat channels.

use serde::{Deserialize, Serialize};

/// A chat destination as reported by the engine.
///
/// Fields the service does not report keep their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Channel {
    pub id: String,
    pub name: String,
    pub is_channel: bool,
    pub is_group: bool,
    pub is_im: bool,
    pub is_private: bool,
    pub is_archived: bool,
    pub is_general: bool,
    pub num_members: u32,
}

impl Channel {
    /// A channel known only by its id.
    pub fn from_id(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            ..Default::default()
        }
    }

    /// A direct-message channel.
    pub fn direct(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_im: true,
            is_private: true,
            num_members: 2,
            ..Default::default()
        }
    }
}

/// How a caller refers to a channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChannelQuery {
    Id(String),
    Name(String),
}

impl ChannelQuery {
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Whether `channel` is the one this query refers to.
    pub fn matches(&self, channel: &Channel) -> bool {
        match self {
            Self::Id(id) => channel.id == *id,
            Self::Name(name) => channel.name == *name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_matches() {
        let channel = Channel {
            id: "C1".into(),
            name: "general".into(),
            is_general: true,
            ..Default::default()
        };
        assert!(ChannelQuery::id("C1").matches(&channel));
        assert!(ChannelQuery::name("general").matches(&channel));
        assert!(!ChannelQuery::name("C1").matches(&channel));
    }

    #[test]
    fn test_partial_deserialize() {
        let channel: Channel = serde_json::from_str(r#"{"id":"D9","is_im":true}"#).unwrap();
        assert_eq!(channel.id, "D9");
        assert!(channel.is_im);
        assert_eq!(channel.num_members, 0);
    }
}
