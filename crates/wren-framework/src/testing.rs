//! Test doubles.
//!
//! [`MockEngine`] is an in-memory engine: tests push events into it and
//! inspect what the bot sent back.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use regex::Regex;
use tokio::sync::mpsc;
use wren_core::{
    BotIdentity, Channel, ChannelQuery, Engine, EngineResult, Event, Extras, MatchGroups, Message,
};

use crate::bot::{Bot, DispatchSettings};

/// A message recorded by [`MockEngine::send`].
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub channel: String,
    pub text: String,
    pub extras: Option<Extras>,
}

/// In-memory engine for tests.
pub struct MockEngine {
    identity: BotIdentity,
    channels: Vec<Channel>,
    tx: Mutex<Option<mpsc::UnboundedSender<Event>>>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Event>>,
    sent: Mutex<Vec<SentMessage>>,
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEngine {
    /// An engine for a bot named `betabot` with channels `general` (`C1`)
    /// and `betabot` (`C9`).
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            identity: BotIdentity::new("betabot", "U0BOT"),
            channels: vec![
                Channel {
                    id: "C1".into(),
                    name: "general".into(),
                    is_channel: true,
                    is_general: true,
                    ..Default::default()
                },
                Channel {
                    id: "C9".into(),
                    name: "betabot".into(),
                    is_channel: true,
                    ..Default::default()
                },
            ],
            tx: Mutex::new(Some(tx)),
            rx: tokio::sync::Mutex::new(rx),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// A bot with default settings on a fresh mock engine.
    pub fn bot() -> Bot {
        Self::pair().1
    }

    /// A fresh mock engine and a bot running on it.
    pub fn pair() -> (Arc<MockEngine>, Bot) {
        let engine = Arc::new(Self::new());
        let bot = Bot::new(engine.clone(), DispatchSettings::default());
        (engine, bot)
    }

    /// Queues an inbound event.
    pub fn push(&self, event: Event) {
        if let Some(tx) = self.tx.lock().as_ref() {
            let _ = tx.send(event);
        }
    }

    /// Ends the event stream once queued events are consumed.
    pub fn close(&self) {
        self.tx.lock().take();
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent
            .lock()
            .iter()
            .map(|m| (m.channel.clone(), m.text.clone()))
            .collect()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.sent.lock().iter().map(|m| m.text.clone()).collect()
    }

    pub fn sent_messages(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Engine for MockEngine {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn identity(&self) -> BotIdentity {
        self.identity.clone()
    }

    async fn next_event(&self) -> EngineResult<Option<Event>> {
        Ok(self.rx.lock().await.recv().await)
    }

    async fn send(&self, text: &str, channel: &str, extras: Option<Extras>) -> EngineResult<Message> {
        self.sent.lock().push(SentMessage {
            channel: channel.to_owned(),
            text: text.to_owned(),
            extras: extras.clone(),
        });

        let mut event = Event::new("message")
            .with("channel", channel)
            .with("user", self.identity.id.clone())
            .with("text", text);
        for (k, v) in extras.unwrap_or_default() {
            event = event.with(k, v);
        }
        Ok(Message {
            text: text.to_owned(),
            raw_text: text.to_owned(),
            user: Some(self.identity.id.clone()),
            channel: Channel::from_id(channel),
            is_direct: false,
            event: Arc::new(event),
            groups: MatchGroups::default(),
        })
    }

    async fn get_channel(&self, query: &ChannelQuery) -> EngineResult<Option<Channel>> {
        let found = self.channels.iter().find(|c| query.matches(c)).cloned();
        Ok(match (found, query) {
            (Some(c), _) => Some(c),
            (None, ChannelQuery::Id(id)) => Some(Channel::from_id(id.clone())),
            (None, ChannelQuery::Name(_)) => None,
        })
    }

    async fn find_channels(&self, pattern: &Regex) -> EngineResult<Vec<Channel>> {
        Ok(self
            .channels
            .iter()
            .filter(|c| pattern.is_match(&c.name))
            .cloned()
            .collect())
    }
}
