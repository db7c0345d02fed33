//! The Slack [`Engine`] implementation.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use regex::Regex;
use serde_json::{Map, Value, json};
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use wren_core::{
    BotIdentity, Channel, ChannelQuery, Engine, EngineResult, Event, Extras, MatchGroups, Message,
};

use crate::api::WebApi;
use crate::config::SlackConfig;
use crate::socket::SocketMode;

const EVENT_BUFFER: usize = 256;

/// Chat engine for a Slack workspace, using Socket Mode for events and the
/// Web API for everything else.
pub struct SlackEngine {
    config: SlackConfig,
    api: WebApi,
    identity: RwLock<BotIdentity>,
    channels: RwLock<Vec<Channel>>,
    events_tx: mpsc::Sender<Event>,
    events_rx: Mutex<mpsc::Receiver<Event>>,
    shutdown: CancellationToken,
}

impl SlackEngine {
    pub fn new(config: SlackConfig) -> EngineResult<Self> {
        let api = WebApi::new(&config)?;
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        Ok(Self {
            config,
            api,
            identity: RwLock::new(BotIdentity::default()),
            channels: RwLock::new(Vec::new()),
            events_tx,
            events_rx: Mutex::new(events_rx),
            shutdown: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &SlackConfig {
        &self.config
    }

    /// Reloads the channel cache from `conversations.list`.
    pub async fn refresh_channels(&self) -> EngineResult<usize> {
        let mut channels = Vec::new();
        let mut cursor = String::new();
        loop {
            let mut params = json!({
                "types": "public_channel,private_channel,mpim,im",
                "limit": 200,
                "exclude_archived": true,
            });
            if !cursor.is_empty() {
                params["cursor"] = Value::String(cursor.clone());
            }
            let resp = self.api.call("conversations.list", params).await?;
            channels.extend(parse_channels(&resp));

            cursor = resp
                .pointer("/response_metadata/next_cursor")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned();
            if cursor.is_empty() {
                break;
            }
        }

        let count = channels.len();
        *self.channels.write() = channels;
        Ok(count)
    }

    fn lookup(&self, query: &ChannelQuery) -> Option<Channel> {
        let channels = self.channels.read();
        let found = channels.iter().find(|c| query.matches(c)).cloned();
        match (found, query) {
            (Some(channel), _) => Some(channel),
            // Direct-message channels are not always listed.
            (None, ChannelQuery::Id(id)) if id.starts_with('D') => {
                Some(Channel::direct(id.clone(), id.clone()))
            }
            (None, _) => None,
        }
    }

    #[cfg(test)]
    fn set_channels(&self, channels: Vec<Channel>) {
        *self.channels.write() = channels;
    }
}

fn parse_channels(resp: &Value) -> Vec<Channel> {
    resp.get("channels")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|c| serde_json::from_value::<Channel>(c.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Builds the `chat.postMessage` body. `extras` (e.g. `thread_ts`) are merged
/// in and may override the defaults.
fn post_message_payload(text: &str, channel: &str, extras: Option<Extras>) -> Value {
    let mut payload = Map::new();
    payload.insert("channel".into(), channel.into());
    payload.insert("text".into(), text.into());
    payload.extend(extras.unwrap_or_default());
    Value::Object(payload)
}

#[async_trait]
impl Engine for SlackEngine {
    fn name(&self) -> &'static str {
        "slack"
    }

    fn identity(&self) -> BotIdentity {
        self.identity.read().clone()
    }

    async fn setup(&self) -> EngineResult<()> {
        info!("Authenticating with Slack");
        let auth = self.api.call("auth.test", json!({})).await?;
        let identity = BotIdentity::new(
            auth.get("user").and_then(Value::as_str).unwrap_or_default(),
            auth.get("user_id").and_then(Value::as_str).unwrap_or_default(),
        );
        info!(name = %identity.name, id = %identity.id, "Logged in to Slack");
        *self.identity.write() = identity;

        match self.refresh_channels().await {
            Ok(count) => info!(channels = count, "Loaded channel list"),
            Err(e) => warn!(error = %e, "Could not load channel list"),
        }

        let socket = SocketMode {
            api: self.api.clone(),
            app_token: self.config.app_token.clone(),
            reconnect: self.config.reconnect.clone(),
            events: self.events_tx.clone(),
            shutdown: self.shutdown.clone(),
        };
        tokio::spawn(socket.run());
        Ok(())
    }

    async fn next_event(&self) -> EngineResult<Option<Event>> {
        let mut rx = self.events_rx.lock().await;
        tokio::select! {
            _ = self.shutdown.cancelled() => Ok(None),
            event = rx.recv() => Ok(event),
        }
    }

    async fn send(&self, text: &str, channel: &str, extras: Option<Extras>) -> EngineResult<Message> {
        let payload = post_message_payload(text, channel, extras);
        let resp = self.api.call("chat.postMessage", payload).await?;

        let channel_id = resp
            .get("channel")
            .and_then(Value::as_str)
            .unwrap_or(channel)
            .to_owned();
        let mut event = resp
            .get("message")
            .cloned()
            .and_then(|m| Event::try_from(m).ok())
            .unwrap_or_else(|| Event::new("message").with("text", text));
        event = event
            .with("channel", channel_id.clone())
            .with("user", self.identity.read().id.clone());
        if let Some(ts) = resp.get("ts") {
            event = event.with("ts", ts.clone());
        }

        Ok(Message {
            text: text.to_owned(),
            raw_text: text.to_owned(),
            user: event.user().map(str::to_owned),
            channel: self
                .lookup(&ChannelQuery::id(channel_id.clone()))
                .unwrap_or_else(|| Channel::from_id(channel_id)),
            is_direct: false,
            event: Arc::new(event),
            groups: MatchGroups::default(),
        })
    }

    async fn get_channel(&self, query: &ChannelQuery) -> EngineResult<Option<Channel>> {
        let found = self.lookup(query);
        if found.is_none() {
            warn!(?query, "No channel match");
        }
        Ok(found)
    }

    async fn find_channels(&self, pattern: &Regex) -> EngineResult<Vec<Channel>> {
        Ok(self
            .channels
            .read()
            .iter()
            .filter(|c| pattern.is_match(&c.name))
            .cloned()
            .collect())
    }

    async fn api(&self, method: &str, params: Value) -> EngineResult<Value> {
        self.api.call(method, params).await
    }

    async fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl std::fmt::Debug for SlackEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackEngine")
            .field("identity", &*self.identity.read())
            .field("channels", &self.channels.read().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> SlackEngine {
        SlackEngine::new(SlackConfig {
            token: "xoxb-test".into(),
            app_token: "xapp-test".into(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_post_message_payload_merges_extras() {
        let mut extras = Extras::new();
        extras.insert("thread_ts".into(), "1.5".into());

        let payload = post_message_payload("pong", "C1", Some(extras));
        assert_eq!(payload, json!({"channel": "C1", "text": "pong", "thread_ts": "1.5"}));
    }

    #[test]
    fn test_parse_channels() {
        let resp = json!({
            "ok": true,
            "channels": [
                {"id": "C1", "name": "general", "is_channel": true, "is_general": true, "topic": {"value": "x"}},
                {"id": "D7", "is_im": true, "user": "U1"}
            ]
        });
        let channels = parse_channels(&resp);
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0].name, "general");
        assert!(channels[0].is_general);
        assert!(channels[1].is_im);
    }

    #[tokio::test]
    async fn test_get_channel_uses_cache_and_synthesizes_dms() {
        let engine = engine();
        engine.set_channels(vec![Channel {
            id: "C1".into(),
            name: "general".into(),
            is_channel: true,
            ..Default::default()
        }]);

        let by_name = engine.get_channel(&ChannelQuery::name("general")).await.unwrap();
        assert_eq!(by_name.unwrap().id, "C1");

        let dm = engine.get_channel(&ChannelQuery::id("D123")).await.unwrap().unwrap();
        assert!(dm.is_im);

        assert!(engine.get_channel(&ChannelQuery::id("C404")).await.unwrap().is_none());
        assert!(engine.get_channel(&ChannelQuery::name("random")).await.unwrap().is_none());

        let found = engine.find_channels(&Regex::new("^gen").unwrap()).await.unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_ends_event_stream() {
        let engine = engine();
        engine.shutdown().await;
        assert!(engine.next_event().await.unwrap().is_none());
    }
}
