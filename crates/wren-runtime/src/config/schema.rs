//! Configuration schema definitions.
//!
//! ```toml
//! [bot]
//! engine = "slack"
//! memory = "json"
//! scripts = ["random_number", "lowercase"]
//!
//! [dispatch]
//! debug_channel = "betabot"
//!
//! [dispatch.thresholds]
//! direct = 0.65
//! ambient = 0.95
//!
//! [logging]
//! level = "debug"
//! format = "compact"
//!
//! [web]
//! port = 8000
//! no_ssl = true
//!
//! [memory]
//! path = "wren-memory.json"
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};
use wren_adapter_console::ConsoleConfig;
use wren_adapter_slack::SlackConfig;
use wren_framework::DispatchSettings;

/// Root configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WrenConfig {
    pub bot: BotSection,
    pub dispatch: DispatchSettings,
    pub logging: LoggingConfig,
    pub web: WebConfig,
    pub memory: MemoryConfig,
    pub console: ConsoleConfig,
    pub slack: SlackConfig,
}

/// Which engine, memory and scripts the bot runs with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotSection {
    /// `cli` or `slack`.
    pub engine: String,
    /// `dict` or `json`.
    pub memory: String,
    /// Plugins to load in addition to the built-ins.
    pub scripts: Vec<String>,
    /// Name the console bot answers to.
    pub name: Option<String>,
}

impl Default for BotSection {
    fn default() -> Self {
        Self {
            engine: "cli".into(),
            memory: "dict".into(),
            scripts: Vec::new(),
            name: None,
        }
    }
}

/// Health-check web server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub ssl_port: u16,
    #[serde(deserialize_with = "truthy")]
    pub no_ssl: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "0.0.0.0".into(),
            port: 8000,
            ssl_port: 8443,
            no_ssl: false,
        }
    }
}

/// Settings for the `json` memory backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub path: PathBuf,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("wren-memory.json"),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,
    pub span_events: SpanEventConfig,
    pub thread_ids: bool,
    /// Include file name and line number.
    pub file_location: bool,
    /// Log file, for `output = "file"`.
    pub file_path: Option<PathBuf>,
    /// Per-module levels, e.g. `wren_framework = "debug"`.
    pub filters: HashMap<String, LogLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            output: LogOutput::Stderr,
            span_events: SpanEventConfig::default(),
            thread_ids: false,
            file_location: false,
            file_path: None,
            filters: HashMap::new(),
        }
    }
}

/// Log verbosity. Accepts the upper-case names used by `LOG_LEVEL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[serde(alias = "TRACE")]
    Trace,
    #[serde(alias = "DEBUG")]
    Debug,
    #[serde(alias = "INFO")]
    Info,
    #[serde(alias = "WARN", alias = "WARNING", alias = "warning")]
    Warn,
    #[serde(alias = "ERROR", alias = "CRITICAL", alias = "critical")]
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    #[cfg(feature = "json-log")]
    Json,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    Stdout,
    #[default]
    Stderr,
    File,
}

/// Which span transitions are logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpanEventConfig {
    pub new: bool,
    pub enter: bool,
    pub exit: bool,
    pub close: bool,
}

/// Accepts booleans, numbers and strings; `WEB_NO_SSL=1` and
/// `WEB_NO_SSL=yes` both mean true.
fn truthy<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Text(String),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Int(n) => n != 0,
        Flag::Text(s) => !matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "" | "0" | "false" | "no" | "off"
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WrenConfig::default();
        assert_eq!(config.bot.engine, "cli");
        assert_eq!(config.bot.memory, "dict");
        assert_eq!(config.web.port, 8000);
        assert_eq!(config.web.ssl_port, 8443);
        assert!(!config.web.no_ssl);
        assert_eq!(config.dispatch.debug_channel.as_deref(), Some("betabot"));
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn test_log_level_aliases() {
        let level: LogLevel = serde_json::from_str("\"DEBUG\"").unwrap();
        assert_eq!(level, LogLevel::Debug);
        let level: LogLevel = serde_json::from_str("\"WARNING\"").unwrap();
        assert_eq!(level, LogLevel::Warn);
        assert_eq!(LogLevel::Warn.to_string(), "warn");
    }

    #[test]
    fn test_truthy_flag() {
        for (raw, expected) in [
            ("true", true),
            ("1", true),
            ("\"yes\"", true),
            ("\"0\"", false),
            ("false", false),
            ("0", false),
        ] {
            let web: WebConfig = serde_json::from_str(&format!("{{\"no_ssl\": {raw}}}")).unwrap();
            assert_eq!(web.no_ssl, expected, "{raw}");
        }
    }
}
