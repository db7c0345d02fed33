//! Direct-vs-ambient addressing.
//!
//! An event is *direct* when the bot is spoken to rather than overheard:
//! it arrived in a direct-message channel, it is a mention event, or its
//! text starts with the bot's name or id. In the last case the mention is
//! stripped from the text handed to commands.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::foundation::Event;

/// Who the bot is on the chat service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotIdentity {
    pub name: String,
    pub id: String,
}

impl BotIdentity {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
        }
    }
}

/// Service conventions that make an event direct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressingRules {
    /// Channel ids with this prefix are direct-message channels.
    pub direct_channel_prefix: String,
    /// Event type the service uses for "the bot was mentioned".
    pub mention_event_type: String,
}

impl Default for AddressingRules {
    fn default() -> Self {
        Self {
            direct_channel_prefix: "D".into(),
            mention_event_type: "app_mention".into(),
        }
    }
}

/// Result of addressing detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Addressed {
    pub is_direct: bool,
    /// The text with a leading mention removed.
    pub text: String,
}

/// Precompiled addressing detector for one bot identity.
#[derive(Debug, Clone)]
pub struct Addressing {
    identity: BotIdentity,
    rules: AddressingRules,
    mention: Option<Regex>,
}

impl Addressing {
    pub fn new(identity: BotIdentity, rules: AddressingRules) -> Self {
        let alternatives: Vec<String> = [&identity.name, &identity.id]
            .into_iter()
            .filter(|s| !s.is_empty())
            .map(|s| regex::escape(s))
            .collect();

        let mention = (!alternatives.is_empty()).then(|| {
            let pattern = format!(r"^[\s@<]*(?:{})(?:[>:,.!?\s]+|$)", alternatives.join("|"));
            RegexBuilder::new(&pattern)
                .case_insensitive(true)
                .build()
                .ok()
        });

        Self {
            identity,
            rules,
            mention: mention.flatten(),
        }
    }

    pub fn identity(&self) -> &BotIdentity {
        &self.identity
    }

    pub fn rules(&self) -> &AddressingRules {
        &self.rules
    }

    /// Whether `event_type` is the service's mention event.
    pub fn is_mention_type(&self, event_type: &str) -> bool {
        event_type == self.rules.mention_event_type
    }

    /// Whether a channel id denotes a direct-message channel.
    pub fn is_direct_channel(&self, channel: &str) -> bool {
        !self.rules.direct_channel_prefix.is_empty()
            && channel.starts_with(&self.rules.direct_channel_prefix)
    }

    /// Strips a leading mention from `text`.
    ///
    /// Returns `None` when the text does not start with a mention.
    pub fn strip_mention<'a>(&self, text: &'a str) -> Option<&'a str> {
        let m = self.mention.as_ref()?.find(text)?;
        Some(&text[m.end()..])
    }

    /// Classifies `event` as direct or ambient.
    pub fn detect(&self, event: &Event) -> Addressed {
        let raw = event.text().unwrap_or_default();

        let (mentioned, text) = match self.strip_mention(raw) {
            Some(rest) => (true, rest),
            None => (false, raw),
        };

        let is_direct = mentioned
            || event.channel().is_some_and(|c| self.is_direct_channel(c))
            || event.event_type().is_some_and(|t| self.is_mention_type(t));

        Addressed {
            is_direct,
            text: text.trim().to_owned(),
        }
    }
}

/// Classifies `event` for `identity` under the default service rules.
pub fn detect_direct(event: &Event, identity: &BotIdentity) -> Addressed {
    Addressing::new(identity.clone(), AddressingRules::default()).detect(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn betabot() -> BotIdentity {
        BotIdentity::new("betabot", "U0BOT")
    }

    fn message(channel: &str, text: &str) -> Event {
        Event::new("message")
            .with("channel", channel)
            .with("text", text)
    }

    #[test]
    fn test_leading_mention_is_direct_and_stripped() {
        let addressed = detect_direct(&message("C1", "@betabot hi"), &betabot());
        assert!(addressed.is_direct);
        assert_eq!(addressed.text, "hi");
    }

    #[test]
    fn test_mention_variants() {
        for text in ["betabot: hi", "<@U0BOT> hi", "BetaBot, hi", "  @betabot   hi"] {
            let addressed = detect_direct(&message("C1", text), &betabot());
            assert!(addressed.is_direct, "{text}");
            assert_eq!(addressed.text, "hi", "{text}");
        }
    }

    #[test]
    fn test_bare_mention_is_direct_with_empty_text() {
        let addressed = detect_direct(&message("C1", "@betabot"), &betabot());
        assert!(addressed.is_direct);
        assert_eq!(addressed.text, "");
    }

    #[test]
    fn test_mid_text_mention_is_ambient() {
        let addressed = detect_direct(&message("C1", "hi @betabot"), &betabot());
        assert!(!addressed.is_direct);
        assert_eq!(addressed.text, "hi @betabot");
    }

    #[test]
    fn test_name_prefix_of_word_is_not_mention() {
        let addressed = detect_direct(&message("C1", "betabotany rocks"), &betabot());
        assert!(!addressed.is_direct);
    }

    #[test]
    fn test_direct_channel_and_mention_type() {
        assert!(detect_direct(&message("D42", "hi"), &betabot()).is_direct);

        let mention = Event::new("app_mention").with("channel", "C1").with("text", "hi");
        assert!(detect_direct(&mention, &betabot()).is_direct);
    }

    #[test]
    fn test_absent_fields_are_ambient() {
        let addressed = detect_direct(&Event::new("ack"), &betabot());
        assert!(!addressed.is_direct);
        assert_eq!(addressed.text, "");
    }

    #[test]
    fn test_custom_rules() {
        let addressing = Addressing::new(
            betabot(),
            AddressingRules {
                direct_channel_prefix: "dm-".into(),
                mention_event_type: "mention".into(),
            },
        );
        assert!(addressing.detect(&message("dm-1", "x")).is_direct);
        assert!(!addressing.detect(&message("D1", "x")).is_direct);
    }
}
