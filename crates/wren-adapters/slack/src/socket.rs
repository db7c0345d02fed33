//! Socket Mode event stream.
//!
//! Slack pushes events over a websocket opened through
//! `apps.connections.open`. Every envelope carrying an `envelope_id` must be
//! acknowledged; a `disconnect` envelope asks the client to reconnect.

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use wren_core::{EngineError, EngineResult, Event};

use crate::api::WebApi;
use crate::config::ReconnectConfig;

/// A decoded Socket Mode envelope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    /// Envelope id to acknowledge.
    pub ack: Option<String>,
    /// Event to dispatch.
    pub event: Option<Event>,
    /// The server asked us to reconnect.
    pub disconnect: bool,
}

impl Frame {
    pub fn parse(text: &str) -> EngineResult<Self> {
        let envelope: Value = serde_json::from_str(text)?;
        Ok(Self::from_envelope(&envelope))
    }

    pub fn from_envelope(envelope: &Value) -> Self {
        let ack = envelope
            .get("envelope_id")
            .and_then(Value::as_str)
            .map(str::to_owned);
        let payload = envelope.get("payload");

        match envelope.get("type").and_then(Value::as_str) {
            Some("events_api") => Self {
                ack,
                event: payload
                    .and_then(|p| p.get("event"))
                    .cloned()
                    .and_then(|e| Event::try_from(e).ok()),
                disconnect: false,
            },
            Some("interactive") => Self {
                ack,
                event: payload.map(message_action),
                disconnect: false,
            },
            Some("disconnect") => Self {
                ack,
                event: None,
                disconnect: true,
            },
            _ => Self {
                ack,
                ..Default::default()
            },
        }
    }
}

/// Surfaces an interactive payload (button click, menu choice) as a
/// `message-action` event.
fn message_action(payload: &Value) -> Event {
    let user = payload.pointer("/user/id").and_then(Value::as_str).unwrap_or_default();
    let channel = payload
        .pointer("/channel/id")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let callback_id = payload
        .get("callback_id")
        .or_else(|| payload.pointer("/actions/0/action_id"))
        .cloned()
        .unwrap_or(Value::Null);

    Event::new("message-action")
        .with("text", "")
        .with("user", user)
        .with("channel", channel)
        .with("callback_id", callback_id)
        .with("payload", payload.clone())
}

enum SessionEnd {
    Cancelled,
    Reconnect,
    ReceiverGone,
}

/// Runs the Socket Mode connection until cancelled.
pub(crate) struct SocketMode {
    pub(crate) api: WebApi,
    pub(crate) app_token: String,
    pub(crate) reconnect: ReconnectConfig,
    pub(crate) events: mpsc::Sender<Event>,
    pub(crate) shutdown: CancellationToken,
}

impl SocketMode {
    pub(crate) async fn run(self) {
        let mut delay = self.reconnect.initial_delay();
        loop {
            match self.session().await {
                Ok(SessionEnd::Cancelled) => {
                    info!("Socket Mode connection closed");
                    return;
                }
                Ok(SessionEnd::ReceiverGone) => {
                    debug!("Event receiver dropped, stopping Socket Mode");
                    return;
                }
                Ok(SessionEnd::Reconnect) => {
                    info!("Slack requested reconnect");
                    delay = self.reconnect.initial_delay();
                }
                Err(e) => {
                    warn!(error = %e, delay = ?delay, "Socket Mode connection lost, reconnecting");
                    tokio::select! {
                        _ = self.shutdown.cancelled() => return,
                        _ = tokio::time::sleep(delay) => {}
                    }
                    delay = self.reconnect.next_delay(delay);
                }
            }
        }
    }

    async fn open_url(&self) -> EngineResult<String> {
        let resp = self
            .api
            .call_with(&self.app_token, "apps.connections.open", json!({}))
            .await?;
        resp.get("url")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| EngineError::Decode("apps.connections.open returned no url".into()))
    }

    async fn session(&self) -> EngineResult<SessionEnd> {
        let url = self.open_url().await?;
        let (stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| EngineError::Connection(format!("websocket connection failed: {e}")))?;
        let (mut tx, mut rx) = stream.split();
        info!("Socket Mode connected");

        loop {
            let msg = tokio::select! {
                _ = self.shutdown.cancelled() => {
                    let _ = tx.close().await;
                    return Ok(SessionEnd::Cancelled);
                }
                msg = rx.next() => msg,
            };

            match msg {
                Some(Ok(WsMessage::Text(text))) => {
                    trace!(len = text.len(), "Received envelope");
                    let frame = match Frame::parse(text.as_str()) {
                        Ok(frame) => frame,
                        Err(e) => {
                            warn!(error = %e, "Undecodable envelope");
                            continue;
                        }
                    };
                    if let Some(id) = frame.ack {
                        let ack = json!({ "envelope_id": id }).to_string();
                        tx.send(WsMessage::Text(ack.into()))
                            .await
                            .map_err(|e| EngineError::Connection(e.to_string()))?;
                    }
                    if let Some(event) = frame.event
                        && self.events.send(event).await.is_err()
                    {
                        return Ok(SessionEnd::ReceiverGone);
                    }
                    if frame.disconnect {
                        let _ = tx.close().await;
                        return Ok(SessionEnd::Reconnect);
                    }
                }
                Some(Ok(WsMessage::Ping(data))) => {
                    let _ = tx.send(WsMessage::Pong(data)).await;
                }
                Some(Ok(WsMessage::Close(_))) | None => {
                    return Err(EngineError::Connection("socket closed by server".into()));
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(EngineError::Connection(e.to_string())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_api_envelope() {
        let frame = Frame::parse(
            r#"{
                "envelope_id": "abc",
                "type": "events_api",
                "payload": {"event": {"type": "message", "channel": "C1", "user": "U1", "text": "hi"}}
            }"#,
        )
        .unwrap();

        assert_eq!(frame.ack.as_deref(), Some("abc"));
        let event = frame.event.unwrap();
        assert_eq!(event.event_type(), Some("message"));
        assert_eq!(event.text(), Some("hi"));
        assert!(!frame.disconnect);
    }

    #[test]
    fn test_interactive_envelope_becomes_message_action() {
        let frame = Frame::parse(
            r#"{
                "envelope_id": "e2",
                "type": "interactive",
                "payload": {
                    "user": {"id": "U1"},
                    "channel": {"id": "C1"},
                    "actions": [{"action_id": "vote"}]
                }
            }"#,
        )
        .unwrap();

        let event = frame.event.unwrap();
        assert_eq!(event.event_type(), Some("message-action"));
        assert_eq!(event.user(), Some("U1"));
        assert_eq!(event.channel(), Some("C1"));
        assert_eq!(event.get_str("callback_id"), Some("vote"));
        assert_eq!(event.text(), Some(""));
    }

    #[test]
    fn test_hello_and_disconnect() {
        let hello = Frame::parse(r#"{"type": "hello", "num_connections": 1}"#).unwrap();
        assert_eq!(hello, Frame::default());

        let bye = Frame::parse(r#"{"type": "disconnect", "reason": "refresh_requested"}"#).unwrap();
        assert!(bye.disconnect);
        assert!(bye.event.is_none());
    }

    #[test]
    fn test_slash_command_is_acked_but_not_dispatched() {
        let frame =
            Frame::parse(r#"{"envelope_id": "s1", "type": "slash_commands", "payload": {}}"#).unwrap();
        assert_eq!(frame.ack.as_deref(), Some("s1"));
        assert!(frame.event.is_none());
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(Frame::parse("not json").is_err());
    }
}
