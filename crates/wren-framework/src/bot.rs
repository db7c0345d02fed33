//! The bot application context.
//!
//! [`Bot`] owns everything scripts register against: the listener table,
//! the help registry, learned phrases, scheduled jobs and start hooks. It
//! is created once per process and handed to every plugin's `register`
//! function; clones share the same state.
//!
//! ```rust,ignore
//! fn register(bot: &Bot) -> Result<(), BoxError> {
//!     let h = handler("lowercase", lowercase).doc("lowercase some text\n\nUsage: lowercase <text>");
//!     let h = bot.add_command("lowercase (.*)", false, h)?;
//!     bot.learn(&["make this lowercase"], h);
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use wren_core::{
    Addressing, AddressingRules, BotError, BotIdentity, BotResult, BoxedEngine, BoxedMemory,
    Channel, ChannelQuery, CommandPattern, Criteria, Event, Extras, MemoryError, Message,
};

use crate::context::Context;
use crate::dispatcher::{Dispatcher, invoke_isolated};
use crate::handler::HandlerRef;
use crate::help::{HelpRegistry, HelpTag};
use crate::intent::{IntentGate, Thresholds};
use crate::listener::{Action, ListenerId, ListenerTable, Rule};
use crate::schedule::{Schedule, Scheduler};

/// Dispatch behaviour knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchSettings {
    pub thresholds: Thresholds,
    #[serde(flatten)]
    pub addressing: AddressingRules,
    /// Channel name plugin load failures are reported to.
    pub debug_channel: Option<String>,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            addressing: AddressingRules::default(),
            debug_channel: Some("betabot".into()),
        }
    }
}

struct BotInner {
    engine: BoxedEngine,
    settings: DispatchSettings,
    addressing: RwLock<Addressing>,
    memory: RwLock<Option<BoxedMemory>>,
    listeners: Arc<ListenerTable>,
    help: HelpRegistry,
    intents: IntentGate,
    scheduler: Scheduler,
    on_start: Mutex<Vec<HandlerRef>>,
    started: Instant,
}

/// Shared bot application context.
#[derive(Clone)]
pub struct Bot(Arc<BotInner>);

impl Bot {
    pub fn new(engine: BoxedEngine, settings: DispatchSettings) -> Self {
        let addressing = Addressing::new(engine.identity(), settings.addressing.clone());
        Self(Arc::new(BotInner {
            engine,
            settings,
            addressing: RwLock::new(addressing),
            memory: RwLock::new(None),
            listeners: Arc::new(ListenerTable::new()),
            help: HelpRegistry::new(),
            intents: IntentGate::new(),
            scheduler: Scheduler::new(),
            on_start: Mutex::new(Vec::new()),
            started: Instant::now(),
        }))
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn engine(&self) -> &BoxedEngine {
        &self.0.engine
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.0.settings
    }

    pub fn identity(&self) -> BotIdentity {
        self.0.addressing.read().identity().clone()
    }

    pub fn addressing(&self) -> Addressing {
        self.0.addressing.read().clone()
    }

    /// Re-reads the engine identity. Call after the engine is set up.
    pub fn refresh_identity(&self) {
        let identity = self.0.engine.identity();
        info!(name = %identity.name, id = %identity.id, "Bot identity");
        *self.0.addressing.write() = Addressing::new(identity, self.0.settings.addressing.clone());
    }

    pub fn listeners(&self) -> &Arc<ListenerTable> {
        &self.0.listeners
    }

    pub fn help(&self) -> &HelpRegistry {
        &self.0.help
    }

    pub fn intents(&self) -> &IntentGate {
        &self.0.intents
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.0.scheduler
    }

    pub fn uptime(&self) -> Duration {
        self.0.started.elapsed()
    }

    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(self.clone())
    }

    // ------------------------------------------------------------------
    // Memory
    // ------------------------------------------------------------------

    pub fn set_memory(&self, memory: BoxedMemory) {
        info!(backend = memory.name(), "Memory attached");
        *self.0.memory.write() = Some(memory);
    }

    pub fn memory(&self) -> BotResult<BoxedMemory> {
        self.0
            .memory
            .read()
            .clone()
            .ok_or(BotError::Memory(MemoryError::NotReady("unset")))
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Calls `handler` with every event whose fields include `criteria`.
    ///
    /// Listening for the raw mention event type is refused; use
    /// [`add_command`](Self::add_command) with `direct = true`.
    pub fn on(&self, criteria: Criteria, handler: HandlerRef) -> BotResult<HandlerRef> {
        let mention = &self.0.settings.addressing.mention_event_type;
        if criteria.event_type() == Some(mention.as_str()) {
            return Err(BotError::InvalidOptions(format!(
                "listening for raw event type `{mention}` is disallowed; use add_command(.., direct = true) instead"
            )));
        }

        let usage = match criteria.event_type() {
            Some(t) => t.to_owned(),
            None => Value::Object(criteria.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                .to_string(),
        };
        self.0
            .help
            .register(&handler, Some(HelpTag::Text(usage)), None, None);
        self.0
            .listeners
            .register(criteria, None, Action::Handler(handler.clone()));
        Ok(handler)
    }

    /// Calls `handler` with messages whose whole text matches `pattern`
    /// (case-insensitive). With `direct`, only messages addressed to the
    /// bot match.
    pub fn add_command(&self, pattern: &str, direct: bool, handler: HandlerRef) -> BotResult<HandlerRef> {
        let pattern = CommandPattern::new(pattern, true)?;
        self.0.help.register(
            &handler,
            Some(HelpTag::Pattern(Regex::new(pattern.as_str())?)),
            None,
            None,
        );
        info!(pattern = pattern.as_str(), direct, handler = handler.name(), "New command");
        self.0.listeners.register(
            Criteria::new(),
            Some(Rule::Command { pattern, direct }),
            Action::Handler(handler.clone()),
        );
        Ok(handler)
    }

    /// Teaches example phrases that should trigger `handler`.
    pub fn learn<S: AsRef<str>>(&self, phrases: &[S], handler: HandlerRef) -> HandlerRef {
        self.0.intents.learn(phrases, &handler);
        handler
    }

    /// Adds or backfills help for `handler`.
    pub fn add_help(
        &self,
        handler: HandlerRef,
        description: Option<&str>,
        usage: Option<&str>,
        tags: Option<Vec<String>>,
    ) -> HandlerRef {
        self.0.help.register(
            &handler,
            usage.map(HelpTag::text),
            tags.map(|t| t.into_iter().map(HelpTag::Text).collect()),
            description,
        );
        handler
    }

    /// Runs `handler` once the bot has started.
    pub fn on_start(&self, handler: HandlerRef) -> HandlerRef {
        debug!(handler = handler.name(), "New start hook");
        self.0.on_start.lock().push(handler.clone());
        handler
    }

    /// Runs `handler` on a cron-style schedule.
    pub fn on_schedule(&self, schedule: Schedule, handler: HandlerRef) -> BotResult<HandlerRef> {
        self.0.scheduler.add(schedule, handler.clone())?;
        Ok(handler)
    }

    /// Removes a listener. Unknown ids are ignored.
    pub fn remove_listener(&self, id: ListenerId) {
        self.0.listeners.remove(id);
    }

    // ------------------------------------------------------------------
    // Waiting
    // ------------------------------------------------------------------

    /// Waits for the next event whose fields include `criteria`.
    ///
    /// Returns `None` if the bot shuts down first. There is no timeout;
    /// wrap the call in `tokio::time::timeout` if one is needed.
    pub async fn wait_for_event(&self, criteria: Criteria) -> Option<Event> {
        let (_guard, rx) = self.0.listeners.waiter(criteria, None);
        rx.await.ok().map(|d| Event::clone(&d.event))
    }

    /// Waits for `user` to send a message matching `pattern` anywhere in
    /// its text.
    pub async fn listen_for(&self, user: Option<String>, pattern: &str) -> BotResult<Option<Message>> {
        let pattern = CommandPattern::new(pattern, false)?;
        let (_guard, rx) = self.0.listeners.waiter(
            Criteria::new().field("type", "message"),
            Some(Rule::Reply { user, pattern }),
        );
        Ok(rx.await.ok().and_then(|d| d.message))
    }

    // ------------------------------------------------------------------
    // Outbound
    // ------------------------------------------------------------------

    pub async fn send(&self, text: &str, channel: &str, extras: Option<Extras>) -> BotResult<Message> {
        Ok(self.0.engine.send(text, channel, extras).await?)
    }

    pub async fn get_channel(&self, query: &ChannelQuery) -> BotResult<Option<Channel>> {
        Ok(self.0.engine.get_channel(query).await?)
    }

    /// Channels whose name matches `pattern`.
    pub async fn find_channels(&self, pattern: &str) -> BotResult<Vec<Channel>> {
        let pattern = Regex::new(pattern)?;
        Ok(self.0.engine.find_channels(&pattern).await?)
    }

    /// Raw engine API call.
    pub async fn api(&self, method: &str, params: Value) -> BotResult<Value> {
        Ok(self.0.engine.api(method, params).await?)
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Runs the start hooks in registration order.
    pub async fn run_start_hooks(&self) {
        let hooks = self.0.on_start.lock().clone();
        for hook in hooks {
            debug!(handler = hook.name(), "Running start hook");
            let event = Event::new("start");
            invoke_isolated(hook, Context::with_event(self.clone(), event)).await;
        }
    }

    /// Sends `text` to the configured debug channel, if it can be found.
    pub async fn notify_debug_channel(&self, text: &str) {
        let Some(name) = self.0.settings.debug_channel.as_deref() else {
            return;
        };
        match self.get_channel(&ChannelQuery::name(name)).await {
            Ok(Some(channel)) => {
                if let Err(e) = self.send(text, &channel.id, None).await {
                    warn!(channel = name, error = %e, "Failed to notify debug channel");
                }
            }
            Ok(None) => debug!(channel = name, "Debug channel not found"),
            Err(e) => warn!(channel = name, error = %e, "Failed to look up debug channel"),
        }
    }

    /// Wakes every pending waiter with nothing.
    pub fn shutdown(&self) {
        self.0.listeners.close_waiters();
    }
}

impl std::fmt::Debug for Bot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bot")
            .field("engine", &self.0.engine.name())
            .field("listeners", &self.0.listeners.len())
            .field("help", &self.0.help.len())
            .field("jobs", &self.0.scheduler.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::handler;
    use crate::testing::MockEngine;
    use serde_json::json;

    async fn noop(_: Context) {}

    #[test]
    fn test_on_rejects_mention_type() {
        let bot = MockEngine::bot();
        let h = handler("mention", noop).build();
        let err = bot
            .on(Criteria::new().field("type", "app_mention"), h)
            .unwrap_err();
        assert!(matches!(err, BotError::InvalidOptions(_)));
        assert!(bot.listeners().is_empty());
    }

    #[test]
    fn test_registration_returns_same_handler() {
        let bot = MockEngine::bot();
        let h = handler("help", noop).doc("get summary of all commands\n\nUsage: help");
        let id = h.id();

        let h = bot.add_command("help$", true, h).unwrap();
        let h = bot.learn(&["What can you do?"], h);
        let h = bot.add_help(h, None, None, Some(vec!["commands".into()]));

        assert_eq!(h.id(), id);
        assert_eq!(bot.listeners().len(), 1);
        assert!(bot.intents().has_training_data());
        let record = bot.help().get(&h).unwrap();
        assert_eq!(record.usage, "help");
        assert_eq!(record.tags, vec![HelpTag::text("help")]);
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let bot = MockEngine::bot();
        let err = bot
            .add_command("(oops", false, handler("bad", noop).build())
            .unwrap_err();
        assert!(matches!(err, BotError::Pattern(_)));
    }

    #[test]
    fn test_on_uses_event_type_as_usage() {
        let bot = MockEngine::bot();
        let h = bot
            .on(
                Criteria::new().field("type", "message").field("message", "acknowledge"),
                handler("ack", noop).build(),
            )
            .unwrap();
        assert_eq!(bot.help().get(&h).unwrap().usage, "message");
    }

    #[tokio::test]
    async fn test_memory_must_be_attached() {
        let bot = MockEngine::bot();
        assert!(bot.memory().is_err());

        bot.set_memory(Arc::new(wren_core::DictMemory::new()));
        let memory = bot.memory().unwrap();
        memory.save("k", json!(1)).await.unwrap();
        assert_eq!(memory.get("k", json!(0)).await.unwrap(), json!(1));
    }

    #[tokio::test]
    async fn test_shutdown_releases_waiters() {
        let bot = MockEngine::bot();
        let waiter = {
            let bot = bot.clone();
            tokio::spawn(async move { bot.wait_for_event(Criteria::new().field("type", "ack")).await })
        };
        tokio::task::yield_now().await;
        while bot.listeners().is_empty() {
            tokio::task::yield_now().await;
        }
        bot.shutdown();
        assert_eq!(waiter.await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_start_hooks_run_in_order() {
        let (engine, bot) = MockEngine::pair();
        bot.on_start(handler("first", |ctx: Context| async move {
            ctx.bot().send("one", "C1", None).await.map(|_| ())
        }).build());
        bot.on_start(handler("second", |ctx: Context| async move {
            ctx.bot().send("two", "C1", None).await.map(|_| ())
        }).build());

        bot.run_start_hooks().await;
        assert_eq!(engine.sent_texts(), vec!["one", "two"]);
    }
}
