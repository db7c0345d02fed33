//! Wren Runtime - orchestration layer for the Wren chat-bot runtime.
//!
//! This crate provides:
//! - Layered configuration (`wren.toml`, environment, overrides)
//! - Logging setup
//! - Engine and memory backend selection
//! - The health-check web server
//! - [`BotRuntime`], which wires everything together and runs the bot
//!
//! ```rust,ignore
//! use wren_runtime::BotRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = BotRuntime::load()?;
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod web;

pub use config::{ConfigError, ConfigLoader, ConfigResult, WrenConfig, load_config};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{BotRuntime, EngineKind, MemoryKind};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
