//! The chat engine interface.
//!
//! An engine is the transport between the bot and a chat service. It
//! produces [`Event`]s, builds the [`Message`] view of them, and delivers
//! outbound text.
//!
//! ```rust,ignore
//! while let Some(event) = engine.next_event().await? {
//!     dispatcher.dispatch(event).await;
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use serde_json::{Map, Value};

use crate::addressing::{Addressed, BotIdentity};
use crate::foundation::{
    Channel, ChannelQuery, EngineError, EngineResult, Event, MatchGroups, Message,
};

/// Extra fields merged into an outbound payload (e.g. `thread_ts`).
pub type Extras = Map<String, Value>;

/// A chat transport.
#[async_trait]
pub trait Engine: Send + Sync + 'static {
    /// Short engine name (`cli`, `slack`, ...).
    fn name(&self) -> &'static str;

    /// The bot's identity on the service. Valid after [`setup`](Self::setup).
    fn identity(&self) -> BotIdentity;

    /// Connects to the service.
    async fn setup(&self) -> EngineResult<()> {
        Ok(())
    }

    /// Waits for the next inbound event.
    ///
    /// `Ok(None)` means the stream has ended and the bot should stop.
    async fn next_event(&self) -> EngineResult<Option<Event>>;

    /// Builds the chat view of an event.
    ///
    /// The default resolves the channel through [`get_channel`](Self::get_channel)
    /// and falls back to a bare id.
    async fn event_to_chat(&self, event: Arc<Event>, addressed: Addressed) -> EngineResult<Message> {
        let channel = match event.channel() {
            Some(id) => self
                .get_channel(&ChannelQuery::id(id))
                .await?
                .unwrap_or_else(|| Channel::from_id(id)),
            None => Channel::default(),
        };

        Ok(Message {
            text: addressed.text,
            raw_text: event.text().unwrap_or_default().to_owned(),
            user: event.user().map(str::to_owned),
            channel,
            is_direct: addressed.is_direct,
            event,
            groups: MatchGroups::default(),
        })
    }

    /// Sends `text` to the channel with id `channel`.
    async fn send(&self, text: &str, channel: &str, extras: Option<Extras>) -> EngineResult<Message>;

    /// Looks up a channel by id or name.
    async fn get_channel(&self, query: &ChannelQuery) -> EngineResult<Option<Channel>>;

    /// Returns every channel whose name matches `pattern`.
    async fn find_channels(&self, pattern: &Regex) -> EngineResult<Vec<Channel>>;

    /// Calls a raw service API method.
    async fn api(&self, method: &str, params: Value) -> EngineResult<Value> {
        let _ = params;
        Err(EngineError::CapabilityMissing {
            engine: self.name(),
            capability: method.to_owned(),
        })
    }

    /// Disconnects from the service.
    async fn shutdown(&self) {}
}

/// Type alias for a shared engine.
pub type BoxedEngine = Arc<dyn Engine>;

#[cfg(test)]
mod tests {
    use super::*;

    struct Null;

    #[async_trait]
    impl Engine for Null {
        fn name(&self) -> &'static str {
            "null"
        }

        fn identity(&self) -> BotIdentity {
            BotIdentity::new("nullbot", "N0")
        }

        async fn next_event(&self) -> EngineResult<Option<Event>> {
            Ok(None)
        }

        async fn send(&self, _: &str, _: &str, _: Option<Extras>) -> EngineResult<Message> {
            Err(EngineError::Closed)
        }

        async fn get_channel(&self, _: &ChannelQuery) -> EngineResult<Option<Channel>> {
            Ok(None)
        }

        async fn find_channels(&self, _: &Regex) -> EngineResult<Vec<Channel>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_default_api_is_capability_missing() {
        let err = Null.api("reactions.add", Value::Null).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::CapabilityMissing { engine: "null", ref capability } if capability == "reactions.add"
        ));
    }

    #[tokio::test]
    async fn test_default_event_to_chat() {
        let event = Arc::new(
            Event::new("message")
                .with("channel", "C7")
                .with("user", "U1")
                .with("text", "@nullbot ping"),
        );
        let addressed = Addressed {
            is_direct: true,
            text: "ping".into(),
        };

        let message = Null.event_to_chat(event, addressed).await.unwrap();
        assert_eq!(message.text, "ping");
        assert_eq!(message.raw_text, "@nullbot ping");
        assert_eq!(message.user.as_deref(), Some("U1"));
        assert_eq!(message.channel.id, "C7");
        assert!(message.is_direct);
    }
}
