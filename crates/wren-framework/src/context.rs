//! Per-invocation handler context.
//!
//! A [`Context`] bundles the bot, the event being handled and, when the
//! event is a chat message, its [`Message`] view with the groups captured by
//! the matched command.

use std::sync::Arc;

use serde_json::Value;
use wren_core::{BotError, BotResult, BoxedMemory, Event, Extras, MatchGroups, Message};

use crate::bot::Bot;

/// Context passed to every handler.
#[derive(Clone)]
pub struct Context {
    bot: Bot,
    event: Arc<Event>,
    message: Option<Message>,
}

impl Context {
    pub(crate) fn new(bot: Bot, event: Arc<Event>, message: Option<Message>) -> Self {
        Self {
            bot,
            event,
            message,
        }
    }

    /// A context not tied to a chat message (start hooks, scheduled jobs).
    pub fn detached(bot: Bot) -> Self {
        Self::new(bot, Arc::new(Event::new("internal")), None)
    }

    pub(crate) fn with_event(bot: Bot, event: Event) -> Self {
        Self::new(bot, Arc::new(event), None)
    }

    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    /// The raw event.
    pub fn event(&self) -> &Event {
        &self.event
    }

    pub fn message(&self) -> Option<&Message> {
        self.message.as_ref()
    }

    /// The normalized message text, or an empty string.
    pub fn text(&self) -> &str {
        self.message.as_ref().map(|m| m.text.as_str()).unwrap_or_default()
    }

    /// Groups captured by the matched command.
    pub fn groups(&self) -> &MatchGroups {
        static EMPTY: std::sync::OnceLock<MatchGroups> = std::sync::OnceLock::new();
        match &self.message {
            Some(m) => &m.groups,
            None => EMPTY.get_or_init(MatchGroups::default),
        }
    }

    /// Shorthand for a positional group of the matched command.
    pub fn group(&self, index: usize) -> Option<&str> {
        self.groups().get(index)
    }

    /// The id of the channel the event came from.
    pub fn channel_id(&self) -> Option<&str> {
        match &self.message {
            Some(m) if !m.channel.id.is_empty() => Some(&m.channel.id),
            _ => self.event.channel(),
        }
    }

    pub fn memory(&self) -> BotResult<BoxedMemory> {
        self.bot.memory()
    }

    /// Replies in the originating channel.
    pub async fn reply(&self, text: impl AsRef<str>) -> BotResult<Message> {
        self.send_to_origin(text.as_ref(), None).await
    }

    /// Replies in a thread under the originating message.
    pub async fn reply_thread(&self, text: impl AsRef<str>) -> BotResult<Message> {
        let mut extras = Extras::new();
        let ts = self
            .message
            .as_ref()
            .and_then(|m| m.thread_ts())
            .or_else(|| self.event.get_str("ts"));
        if let Some(ts) = ts {
            extras.insert("thread_ts".into(), Value::String(ts.to_owned()));
        }
        self.send_to_origin(text.as_ref(), Some(extras)).await
    }

    /// Waits for the author of this message to say something matching
    /// `pattern`.
    ///
    /// Returns `None` only if the bot shuts down first.
    pub async fn listen_for(&self, pattern: &str) -> BotResult<Option<Message>> {
        let user = self.message.as_ref().and_then(|m| m.user.clone());
        self.bot.listen_for(user, pattern).await
    }

    async fn send_to_origin(&self, text: &str, extras: Option<Extras>) -> BotResult<Message> {
        let channel = self
            .channel_id()
            .ok_or_else(|| BotError::InvalidOptions("event has no channel to reply to".into()))?
            .to_owned();
        self.bot.send(text, &channel, extras).await
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("event", &self.event)
            .field("has_message", &self.message.is_some())
            .finish()
    }
}
