//! Configuration loader using figment.
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. `wren.toml` (current directory, then the user config directory)
//! 3. Environment variables (`WREN_*`, `__` separates sections)
//! 4. Legacy flat variables: `LOG_LEVEL`, `DEBUG_CHANNEL`, `WEB_PORT`,
//!    `WEB_PORT_SSL`, `WEB_NO_SSL`, `SLACK_TOKEN`, `SLACK_APP_TOKEN`
//! 5. Programmatic overrides (command-line flags)
//!
//! # Environment Variable Mapping
//!
//! - `WREN_BOT__ENGINE=slack` → `bot.engine = "slack"`
//! - `WREN_DISPATCH__THRESHOLDS__DIRECT=0.7` → `dispatch.thresholds.direct = 0.7`
//! - `LOG_LEVEL=DEBUG` → `logging.level = "debug"`
//!
//! ```rust,ignore
//! let config = ConfigLoader::new()
//!     .with_current_dir()
//!     .set("bot.engine", "slack")
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Serialized};
#[cfg(feature = "toml-config")]
use figment::providers::{Format, Toml};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::WrenConfig;
use super::validation::validate_config;

const FILE_NAME: &str = "wren.toml";

/// Legacy variable → configuration key.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("LOG_LEVEL", "logging.level"),
    ("DEBUG_CHANNEL", "dispatch.debug_channel"),
    ("WEB_PORT", "web.port"),
    ("WEB_PORT_SSL", "web.ssl_port"),
    ("WEB_NO_SSL", "web.no_ssl"),
    ("SLACK_TOKEN", "slack.token"),
    ("SLACK_APP_TOKEN", "slack.app_token"),
];

fn legacy_key(var: &str) -> &'static str {
    LEGACY_ENV
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(var))
        .map(|(_, key)| *key)
        .unwrap_or("unused")
}

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    /// Overrides merged last.
    overrides: Figment,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    /// Specific config file to load (overrides search).
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            overrides: Figment::new(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    /// Adds a search path for `wren.toml`.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    pub fn with_current_dir(self) -> Self {
        match std::env::current_dir() {
            Ok(cwd) => self.search_path(cwd),
            Err(_) => self,
        }
    }

    /// Adds `<config dir>/wren` (e.g. `~/.config/wren`) to the search paths.
    pub fn with_user_config_dir(self) -> Self {
        match dirs::config_dir() {
            Some(dir) => self.search_path(dir.join("wren")),
            None => self,
        }
    }

    /// Loads exactly this file instead of searching.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Overrides a single key, e.g. `set("bot.engine", "slack")`.
    pub fn set<T: Serialize>(mut self, key: &str, value: T) -> Self {
        self.overrides = self.overrides.merge(Serialized::default(key, value));
        self
    }

    /// Overrides with a whole configuration.
    pub fn merge(mut self, config: WrenConfig) -> Self {
        self.overrides = self.overrides.merge(Serialized::defaults(config));
        self
    }

    /// Loads, extracts and validates the configuration.
    pub fn load(self) -> ConfigResult<WrenConfig> {
        let figment = self.build_figment()?;
        let config: WrenConfig = figment.extract()?;
        validate_config(&config)?;

        debug!(
            engine = %config.bot.engine,
            memory = %config.bot.memory,
            logging_level = %config.logging.level,
            "Configuration loaded"
        );
        Ok(config)
    }

    fn build_figment(self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(WrenConfig::default()));

        if let Some(path) = &self.config_file {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
            info!(path = %path.display(), "Loading configuration file");
            figment = merge_file(figment, path)?;
        } else if let Some(path) = self.find_file() {
            info!(path = %path.display(), "Loading configuration file");
            figment = merge_file(figment, &path)?;
        } else {
            warn!("No configuration file found, using defaults");
        }

        if self.load_env {
            trace!("Loading environment variables");
            figment = figment
                .merge(
                    Env::prefixed("WREN_")
                        .split("__")
                        .map(|key| key.as_str().replace("__", ".").into()),
                )
                .merge(legacy_env());
        }

        Ok(figment.merge(self.overrides))
    }

    fn find_file(&self) -> Option<PathBuf> {
        self.search_paths
            .iter()
            .map(|dir| dir.join(FILE_NAME))
            .find(|path| path.exists())
    }
}

fn legacy_env() -> Env {
    let names: Vec<&str> = LEGACY_ENV.iter().map(|(name, _)| *name).collect();
    Env::raw()
        .only(&names)
        .map(|var| legacy_key(var.as_str()).into())
}

fn merge_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    match ext {
        #[cfg(feature = "toml-config")]
        "toml" => Ok(figment.merge(Toml::file(path))),
        _ => Err(ConfigError::ParseError(format!(
            "Unsupported or disabled configuration file format: .{ext}"
        ))),
    }
}

/// Loads configuration from the default locations.
pub fn load_config() -> ConfigResult<WrenConfig> {
    ConfigLoader::new()
        .with_current_dir()
        .with_user_config_dir()
        .load()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;
    use figment::Jail;

    #[test]
    fn test_default_config() {
        let config = ConfigLoader::new().without_env().load().unwrap();
        assert_eq!(config.logging.level.as_str(), "info");
        assert_eq!(config.bot.engine, "cli");
    }

    #[test]
    fn test_layering() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "wren.toml",
                r#"
                [bot]
                engine = "cli"
                memory = "json"

                [web]
                port = 9000
                "#,
            )?;
            jail.set_env("WREN_WEB__PORT", "9100");
            jail.set_env("WEB_NO_SSL", "1");
            jail.set_env("LOG_LEVEL", "DEBUG");
            jail.set_env("DEBUG_CHANNEL", "ops");

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .load()
                .map_err(|e| e.to_string())?;

            assert_eq!(config.bot.memory, "json");
            assert_eq!(config.web.port, 9100);
            assert!(config.web.no_ssl);
            assert_eq!(config.logging.level, LogLevel::Debug);
            assert_eq!(config.dispatch.debug_channel.as_deref(), Some("ops"));
            Ok(())
        });
    }

    #[test]
    fn test_legacy_env_below_overrides() {
        Jail::expect_with(|jail| {
            jail.set_env("WEB_PORT", "8100");
            let config = ConfigLoader::new()
                .set("web.port", 8200)
                .load()
                .map_err(|e| e.to_string())?;
            assert_eq!(config.web.port, 8200);
            Ok(())
        });
    }

    #[test]
    fn test_slack_tokens_from_env() {
        Jail::expect_with(|jail| {
            jail.set_env("SLACK_TOKEN", "xoxb-1");
            jail.set_env("SLACK_APP_TOKEN", "xapp-1");
            let config = ConfigLoader::new()
                .set("bot.engine", "slack")
                .load()
                .map_err(|e| e.to_string())?;
            assert_eq!(config.slack.token, "xoxb-1");
            assert_eq!(config.slack.app_token, "xapp-1");
            Ok(())
        });
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigLoader::new()
            .without_env()
            .file("/nonexistent/wren.toml")
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_invalid_memory_is_rejected() {
        let err = ConfigLoader::new()
            .without_env()
            .set("bot.memory", "redis")
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMemory(name) if name == "redis"));
    }
}
