//! Configuration types for the Slack engine.
//!
//! Loaded from the `slack` section of `wren.toml`, or from the
//! `SLACK_TOKEN` / `SLACK_APP_TOKEN` environment variables:
//!
//! ```toml
//! [slack]
//! token = "xoxb-..."
//! app_token = "xapp-..."
//!
//! [slack.reconnect]
//! initial_delay_ms = 1000
//! max_delay_ms = 30000
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Slack engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    /// Bot token (`xoxb-`), used for Web API calls.
    pub token: String,
    /// App-level token (`xapp-`), used to open Socket Mode connections.
    pub app_token: String,
    /// Web API base URL.
    pub api_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    pub reconnect: ReconnectConfig,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            app_token: String::new(),
            api_url: "https://slack.com/api".into(),
            timeout_secs: 30,
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl SlackConfig {
    /// Names of the credentials that are not set.
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.token.trim().is_empty() {
            missing.push("SLACK_TOKEN");
        }
        if self.app_token.trim().is_empty() {
            missing.push("SLACK_APP_TOKEN");
        }
        missing
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Socket Mode reconnect backoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1000,
            max_delay_ms: 30_000,
            multiplier: 2.0,
        }
    }
}

impl ReconnectConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// The delay after `current`, capped at the maximum.
    pub fn next_delay(&self, current: Duration) -> Duration {
        std::cmp::min(
            Duration::from_secs_f64(current.as_secs_f64() * self.multiplier),
            Duration::from_millis(self.max_delay_ms),
        )
    }
}
