//! # Wren engine for Slack
//!
//! Connects a Wren bot to a Slack workspace:
//!
//! - Identity from `auth.test`, channel cache from `conversations.list`
//! - Events over Socket Mode (`apps.connections.open` + websocket), with
//!   envelope acknowledgement and automatic reconnect
//! - Outbound messages through `chat.postMessage`
//! - Interactive payloads (buttons, menus) surfaced as `message-action` events
//! - Any other Web API method through [`Engine::api`](wren_core::Engine::api)
//!
//! ```rust,ignore
//! let engine = SlackEngine::new(SlackConfig {
//!     token: std::env::var("SLACK_TOKEN")?,
//!     app_token: std::env::var("SLACK_APP_TOKEN")?,
//!     ..Default::default()
//! })?;
//! let bot = Bot::new(Arc::new(engine), DispatchSettings::default());
//! ```

pub mod api;
pub mod config;
pub mod engine;
pub mod socket;

pub use api::WebApi;
pub use config::{ReconnectConfig, SlackConfig};
pub use engine::SlackEngine;
pub use socket::Frame;
