//! Event dispatcher for the Wren framework.
//!
//! For every event the [`Dispatcher`]:
//!
//! 1. works out whether the bot was addressed directly;
//! 2. if the event carries text and phrases were learned, asks the intent
//!    gate; a confident classification runs that handler and stops;
//! 3. otherwise scans a snapshot of the listener table in order, firing
//!    every entry that matches (there is no first-match-wins).
//!
//! Handlers run as independent tasks. Their errors and panics are caught
//! at the task boundary and reported to the originating channel; they
//! never reach the dispatch loop.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};
use wren_core::{Addressed, BotError, BoxError, EngineResult, Event, Message, subset_match};

use crate::bot::Bot;
use crate::context::Context;
use crate::handler::HandlerRef;
use crate::listener::{Action, Delivery};

/// Upper bound on the trace included in an error reply.
const MAX_TRACE_CHARS: usize = 1500;

/// What a single dispatch did.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    /// The intent gate picked a handler.
    Intent { handler: String, probability: f64 },
    /// `fired` listener entries matched.
    Listeners { fired: usize },
}

/// The central event dispatcher.
#[derive(Clone, Debug)]
pub struct Dispatcher {
    bot: Bot,
}

impl Dispatcher {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    /// Pulls events from the engine and dispatches them in order until the
    /// stream ends or `token` is cancelled.
    pub async fn run(&self, token: CancellationToken) -> EngineResult<()> {
        let engine = Arc::clone(self.bot.engine());
        loop {
            let next = tokio::select! {
                _ = token.cancelled() => {
                    info!("Dispatch loop cancelled");
                    return Ok(());
                }
                next = engine.next_event() => next?,
            };
            match next {
                Some(event) => {
                    self.dispatch(event).await;
                }
                None => {
                    info!(engine = engine.name(), "Event stream ended");
                    return Ok(());
                }
            }
        }
    }

    /// Dispatches one event.
    pub async fn dispatch(&self, event: Event) -> Dispatched {
        let span = info_span!(
            "dispatch",
            event_type = event.event_type().unwrap_or("unknown")
        );
        self.dispatch_inner(Arc::new(event)).instrument(span).await
    }

    async fn dispatch_inner(&self, event: Arc<Event>) -> Dispatched {
        debug!(event = %event, "Received event");

        if self.is_own_echo(&event) {
            debug!("Ignoring the bot's own message");
            return Dispatched::Listeners { fired: 0 };
        }

        let addressing = self.bot.addressing();
        let addressed = addressing.detect(&event);
        let mut chat = ChatView::new(&self.bot, &event, addressed.clone());

        if !addressed.text.is_empty() && self.bot.intents().has_training_data() {
            if let Some((handler, probability)) = self.bot.intents().classify(&addressed.text) {
                let thresholds = self.bot.settings().thresholds;
                if thresholds.accepts(probability, addressed.is_direct) {
                    info!(handler = handler.name(), probability, direct = addressed.is_direct, "Intent matched");
                    let message = chat.get().await;
                    let ctx = Context::new(self.bot.clone(), Arc::clone(&event), message);
                    let name = handler.name().to_owned();
                    spawn_isolated(handler, ctx);
                    return Dispatched::Intent {
                        handler: name,
                        probability,
                    };
                }
                debug!(handler = handler.name(), probability, "Intent below threshold");
            }
        }

        let is_chat = event.event_type().is_some_and(|t| {
            t == "message" || addressing.is_mention_type(t)
        });

        let snapshot = self.bot.listeners().snapshot();
        debug!(listeners = snapshot.len(), "Scanning listeners");

        let mut fired = 0;
        for entry in snapshot {
            if !subset_match(&event, &entry.criteria) {
                continue;
            }

            let message = match &entry.rule {
                Some(rule) => {
                    if !is_chat {
                        continue;
                    }
                    let Some(message) = chat.get().await else {
                        continue;
                    };
                    let Some(groups) = rule.check(&message) else {
                        continue;
                    };
                    Some(message.with_groups(groups))
                }
                None => None,
            };

            match &entry.action {
                Action::Handler(handler) => {
                    debug!(listener = %entry.id, handler = handler.name(), "Listener matched");
                    let message = match message {
                        Some(m) => Some(m),
                        None => chat.get().await,
                    };
                    let ctx = Context::new(self.bot.clone(), Arc::clone(&event), message);
                    spawn_isolated(handler.clone(), ctx);
                    fired += 1;
                }
                Action::Waiter(_) => {
                    let delivered = entry.deliver(Delivery {
                        event: Arc::clone(&event),
                        message,
                    });
                    if delivered {
                        debug!(listener = %entry.id, "Ephemeral listener resolved");
                        fired += 1;
                    }
                }
            }
        }

        Dispatched::Listeners { fired }
    }
}

impl Dispatcher {
    /// Services such as Slack deliver the bot's own posts back to it.
    fn is_own_echo(&self, event: &Event) -> bool {
        let identity = self.bot.identity();
        !identity.id.is_empty() && event.user() == Some(identity.id.as_str())
    }
}

/// Lazily built chat view of the event being dispatched.
struct ChatView<'a> {
    bot: &'a Bot,
    event: &'a Arc<Event>,
    addressed: Addressed,
    cached: Option<Option<Message>>,
}

impl<'a> ChatView<'a> {
    fn new(bot: &'a Bot, event: &'a Arc<Event>, addressed: Addressed) -> Self {
        Self {
            bot,
            event,
            addressed,
            cached: None,
        }
    }

    async fn get(&mut self) -> Option<Message> {
        if self.cached.is_none() {
            let built = self
                .bot
                .engine()
                .event_to_chat(Arc::clone(self.event), self.addressed.clone())
                .await;
            self.cached = Some(match built {
                Ok(message) => Some(message),
                Err(e) => {
                    warn!(error = %e, "Failed to build chat message");
                    None
                }
            });
        }
        self.cached.clone().flatten()
    }
}

// ============================================================================
// Error isolation
// ============================================================================

/// A handler panicked.
#[derive(Debug, Error)]
#[error("handler panicked: {0}")]
pub struct HandlerPanic(String);

impl HandlerPanic {
    fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = match payload.downcast::<String>() {
            Ok(s) => *s,
            Err(payload) => payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_owned())
                .unwrap_or_else(|| "unknown panic".to_owned()),
        };
        Self(message)
    }
}

/// Spawns `handler` on the runtime with error isolation.
pub fn spawn_isolated(handler: HandlerRef, ctx: Context) -> JoinHandle<()> {
    tokio::spawn(invoke_isolated(handler, ctx))
}

/// Runs `handler`, catching errors and panics and reporting them.
pub async fn invoke_isolated(handler: HandlerRef, ctx: Context) {
    let outcome = AssertUnwindSafe(async { handler.call(ctx.clone()).await })
        .catch_unwind()
        .await;

    let err: BoxError = match outcome {
        Ok(Ok(())) => return,
        Ok(Err(e)) => e,
        Err(payload) => Box::new(HandlerPanic::from_payload(payload)),
    };
    report_failure(handler.name(), &ctx, err).await;
}

async fn report_failure(name: &str, ctx: &Context, err: BoxError) {
    let intentional = err.downcast_ref::<BotError>().is_some_and(BotError::is_script);

    let reply = if intentional {
        warn!(handler = name, error = %err, "Script had an error");
        format!("Script had an error: {err}")
    } else {
        let trace = error_chain(&*err);
        error!(handler = name, error = %trace, "Script had an error");
        format!("Script had an error: {err} ```{}```", truncate(&trace, MAX_TRACE_CHARS))
    };

    let Some(channel) = ctx.channel_id().map(str::to_owned) else {
        return;
    };
    if let Err(e) = ctx.bot().send(&reply, &channel, None).await {
        error!(handler = name, error = %e, "Failed to report script error");
    }
}

/// The error and all of its sources, one per line.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = format!("{err:?}");
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(&format!("\nCaused by: {cause}"));
        source = cause.source();
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_owned(),
    }
}
