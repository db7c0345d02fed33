//! # Wren
//!
//! A chat bot that listens on a chat engine (the console or Slack), matches
//! incoming events against registered listeners, commands and learned
//! phrases, and runs the matching handlers in isolation.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌────────────┐     ┌──────────────────────────────┐
//! │   Engine    │────▶│ Dispatcher │──┬─▶│ intent gate (learned phrases)│──▶ handler
//! │ (cli/slack) │     │            │  └─▶│ listeners, commands, waiters │──▶ handlers
//! └─────────────┘     └────────────┘     └──────────────────────────────┘
//! ```
//!
//! - **Core**: events, messages, matching rules, engine and memory traits
//! - **Framework**: the [`Bot`](framework::Bot) context, dispatcher, help,
//!   intents, schedules and plugins
//! - **Runtime**: configuration, logging, engine/memory selection, web
//!   health check
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use wren::prelude::*;
//!
//! async fn ping(ctx: Context) -> BotResult<()> {
//!     ctx.reply("pong").await?;
//!     Ok(())
//! }
//!
//! fn register(bot: &Bot) -> Result<(), BoxError> {
//!     bot.add_command("ping", false, handler("ping", ping).doc("answer with pong"))?;
//!     Ok(())
//! }
//!
//! const PING: PluginDescriptor = PluginDescriptor {
//!     name: "ping",
//!     description: "answer with pong",
//!     register,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut runtime = BotRuntime::load()?;
//!     runtime.register_plugin(PING);
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: read `wren.toml` (default)
//! - `sample-scripts`: bundle the example plugins (default)
//! - `json-log`: JSON log output

pub mod cli;

pub use wren_core as core;
pub use wren_framework as framework;
pub use wren_runtime as runtime;

#[cfg(feature = "sample-scripts")]
pub use wren_sample_scripts as sample_scripts;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use wren::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use wren_runtime::{BotRuntime, ConfigLoader, WrenConfig};

    // Plugin system
    pub use wren_framework::{Bot, Context, PluginDescriptor, Schedule, handler};

    // Matching and results
    pub use wren_core::{BotError, BotResult, BoxError, ChannelQuery, Criteria, Event, Message};
}
