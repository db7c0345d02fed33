//! Configuration for the Wren runtime.
//!
//! Settings are layered with `figment`: built-in defaults, then
//! `wren.toml`, then `WREN_*` environment variables, then the flat legacy
//! variables (`LOG_LEVEL`, `SLACK_TOKEN`, ...), then command-line overrides.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, load_config};
pub use schema::{
    BotSection, LogFormat, LogLevel, LogOutput, LoggingConfig, MemoryConfig, SpanEventConfig,
    WebConfig, WrenConfig,
};
pub use validation::validate_config;
