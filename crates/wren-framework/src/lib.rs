//! # Wren Framework
//!
//! The event dispatch and command-matching engine of the Wren chat-bot
//! runtime.
//!
//! This layer provides:
//! - The [`Bot`] application context scripts register against
//! - Handler trait with blanket impls for async functions ([`Handler`])
//! - The ordered listener table with ephemeral waiters ([`ListenerTable`])
//! - Help registry and intent classification over learned phrases
//! - The [`Dispatcher`] with per-handler error isolation
//! - Cron-style scheduled jobs ([`Schedule`])
//! - Explicit plugin registration ([`PluginDescriptor`], [`PluginRegistry`])
//!
//! ```text
//! Engine ─▶ Dispatcher ─┬─▶ IntentGate ──────────▶ handler
//!                       └─▶ ListenerTable scan ─┬─▶ handlers (spawned)
//!                                               └─▶ waiters (oneshot)
//! ```

pub mod bot;
pub mod context;
pub mod dispatcher;
pub mod handler;
pub mod help;
pub mod intent;
pub mod listener;
pub mod plugin;
pub mod schedule;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use bot::{Bot, DispatchSettings};
pub use context::Context;
pub use dispatcher::{Dispatched, Dispatcher, HandlerPanic, invoke_isolated, spawn_isolated};
pub use handler::{Handler, HandlerId, HandlerRef, HandlerResponse, handler};
pub use help::{HelpEntry, HelpRecord, HelpRegistry, HelpTag};
pub use intent::{IntentGate, NaiveBayes, TextClassifier, Thresholds};
pub use listener::{ListenerId, ListenerTable};
pub use plugin::{LoadReport, PluginDescriptor, PluginRegistry};
pub use schedule::{Schedule, Scheduler, Trigger};
