//! Console engine for the Wren chat-bot runtime.
//!
//! Every line typed on stdin becomes a `message` event in a private
//! channel, so the bot treats it as directly addressed. Outbound messages
//! are echoed to stdout.
//!
//! ```rust,ignore
//! let engine = Arc::new(ConsoleEngine::stdio(ConsoleConfig::default()));
//! let bot = Bot::new(engine, DispatchSettings::default());
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::sync::Mutex;
use tracing::debug;
use wren_core::{
    BotIdentity, Channel, ChannelQuery, Engine, EngineResult, Event, Extras, MatchGroups, Message,
};

type Input = Box<dyn AsyncBufRead + Send + Unpin>;
type Output = Box<dyn AsyncWrite + Send + Unpin>;

/// Console engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Name the bot answers to.
    pub bot_name: String,
    /// Name of the person at the keyboard.
    pub user: String,
    /// Use ANSI colours for the prompt and replies.
    pub color: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            bot_name: "betabot".into(),
            user: "console".into(),
            color: true,
        }
    }
}

/// Chat engine over a line-oriented reader and writer.
pub struct ConsoleEngine {
    config: ConsoleConfig,
    identity: BotIdentity,
    channel: Channel,
    input: Mutex<Lines<Input>>,
    output: Mutex<Output>,
}

impl ConsoleEngine {
    pub const CHANNEL_ID: &'static str = "DCONSOLE";
    pub const BOT_ID: &'static str = "U0CONSOLE";

    /// An engine reading stdin and writing stdout.
    pub fn stdio(config: ConsoleConfig) -> Self {
        Self::with_io(config, BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }

    pub fn with_io<R, W>(config: ConsoleConfig, input: R, output: W) -> Self
    where
        R: AsyncBufRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let input: Input = Box::new(input);
        Self {
            identity: BotIdentity::new(config.bot_name.clone(), Self::BOT_ID),
            channel: Channel::direct(Self::CHANNEL_ID, "console"),
            config,
            input: Mutex::new(input.lines()),
            output: Mutex::new(Box::new(output)),
        }
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    fn prompt(&self) -> String {
        if self.config.color {
            format!("\x1b[4m{}\x1b[0m> ", self.config.user)
        } else {
            format!("{}> ", self.config.user)
        }
    }

    fn render(&self, text: &str) -> String {
        let sep = if text.contains('\n') { '\n' } else { ' ' };
        if self.config.color {
            format!("\x1b[93m! {}:{sep}\x1b[92m{text}\x1b[0m\n", self.identity.name)
        } else {
            format!("! {}:{sep}{text}\n", self.identity.name)
        }
    }

    async fn write(&self, s: &str) -> EngineResult<()> {
        let mut output = self.output.lock().await;
        output.write_all(s.as_bytes()).await?;
        output.flush().await?;
        Ok(())
    }
}

fn timestamp() -> String {
    let now = chrono::Utc::now();
    format!("{}.{:06}", now.timestamp(), now.timestamp_subsec_micros())
}

#[async_trait]
impl Engine for ConsoleEngine {
    fn name(&self) -> &'static str {
        "cli"
    }

    fn identity(&self) -> BotIdentity {
        self.identity.clone()
    }

    async fn next_event(&self) -> EngineResult<Option<Event>> {
        loop {
            self.write(&self.prompt()).await?;
            let line = self.input.lock().await.next_line().await?;
            let Some(line) = line else {
                debug!("Console input closed");
                return Ok(None);
            };
            let text = line.trim_end();
            if text.trim().is_empty() {
                continue;
            }
            return Ok(Some(
                Event::new("message")
                    .with("channel", self.channel.id.clone())
                    .with("user", self.config.user.clone())
                    .with("text", text)
                    .with("ts", timestamp()),
            ));
        }
    }

    async fn send(&self, text: &str, channel: &str, extras: Option<Extras>) -> EngineResult<Message> {
        self.write(&self.render(text)).await?;

        let mut event = Event::new("message")
            .with("channel", channel)
            .with("user", self.identity.id.clone())
            .with("text", text)
            .with("ts", timestamp());
        for (k, v) in extras.unwrap_or_default() {
            event = event.with(k, v);
        }
        Ok(Message {
            text: text.to_owned(),
            raw_text: text.to_owned(),
            user: Some(self.identity.id.clone()),
            channel: self.channel.clone(),
            is_direct: true,
            event: Arc::new(event),
            groups: MatchGroups::default(),
        })
    }

    /// There is only one channel; every lookup resolves to it.
    async fn get_channel(&self, _query: &ChannelQuery) -> EngineResult<Option<Channel>> {
        Ok(Some(self.channel.clone()))
    }

    async fn find_channels(&self, pattern: &Regex) -> EngineResult<Vec<Channel>> {
        Ok(if pattern.is_match(&self.channel.name) {
            vec![self.channel.clone()]
        } else {
            Vec::new()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    fn plain() -> ConsoleConfig {
        ConsoleConfig {
            color: false,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_lines_become_direct_message_events() {
        let (sink, _keep) = tokio::io::duplex(1024);
        let engine = ConsoleEngine::with_io(plain(), &b"hello\n\n   \nbetabot hi\n"[..], sink);

        let first = engine.next_event().await.unwrap().unwrap();
        assert_eq!(first.event_type(), Some("message"));
        assert_eq!(first.text(), Some("hello"));
        assert_eq!(first.user(), Some("console"));
        assert_eq!(first.channel(), Some(ConsoleEngine::CHANNEL_ID));
        assert!(first.get_str("ts").is_some());

        let second = engine.next_event().await.unwrap().unwrap();
        assert_eq!(second.text(), Some("betabot hi"));

        assert!(engine.next_event().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_send_prints_reply() {
        let (sink, mut source) = tokio::io::duplex(1024);
        let engine = ConsoleEngine::with_io(plain(), &b""[..], sink);

        let message = engine.send("pong", ConsoleEngine::CHANNEL_ID, None).await.unwrap();
        assert_eq!(message.text, "pong");
        assert_eq!(message.user.as_deref(), Some(ConsoleEngine::BOT_ID));

        let mut buf = vec![0; 64];
        let n = source.read(&mut buf).await.unwrap();
        assert_eq!(std::str::from_utf8(&buf[..n]).unwrap(), "! betabot: pong\n");
    }

    #[tokio::test]
    async fn test_multiline_reply_starts_on_new_line() {
        let (sink, _keep) = tokio::io::duplex(1024);
        let engine = ConsoleEngine::with_io(plain(), &b""[..], sink);
        assert_eq!(engine.render("a\nb"), "! betabot:\na\nb\n");
        assert_eq!(engine.prompt(), "console> ");
    }

    #[tokio::test]
    async fn test_channel_lookup() {
        let (sink, _keep) = tokio::io::duplex(1024);
        let engine = ConsoleEngine::with_io(plain(), &b""[..], sink);

        let channel = engine.get_channel(&ChannelQuery::name("betabot")).await.unwrap().unwrap();
        assert!(channel.is_im);
        assert_eq!(channel.id.chars().next(), Some('D'));

        let found = engine.find_channels(&Regex::new("^cons").unwrap()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert!(engine.find_channels(&Regex::new("^general$").unwrap()).await.unwrap().is_empty());
    }
}
