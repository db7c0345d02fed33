//! Plugin system for the Wren framework.
//!
//! A plugin is a named registration function. The host builds a
//! [`PluginRegistry`] of the plugins compiled into it and loads the ones
//! selected by configuration against the shared [`Bot`]:
//!
//! ```rust,ignore
//! pub static LOWERCASE: PluginDescriptor = PluginDescriptor {
//!     name: "lowercase",
//!     description: "lowercase some text",
//!     register,
//! };
//!
//! fn register(bot: &Bot) -> Result<(), BoxError> {
//!     bot.add_command("lowercase (.*)", false, handler("lowercase", lowercase).build())?;
//!     Ok(())
//! }
//! ```
//!
//! A plugin whose `register` fails (or panics) is skipped; the failure is
//! logged and reported to the debug channel, and the remaining plugins
//! still load.

pub mod builtin;

use std::panic::AssertUnwindSafe;

use tracing::{error, info};
use wren_core::{BotError, BotResult, BoxError};

use crate::bot::Bot;

/// Static handle to a plugin.
#[derive(Debug, Clone, Copy)]
pub struct PluginDescriptor {
    /// Name used for selection and in logs.
    pub name: &'static str,
    /// One-line summary.
    pub description: &'static str,
    /// Registers the plugin's handlers.
    pub register: fn(&Bot) -> Result<(), BoxError>,
}

/// Outcome of [`PluginRegistry::load`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: Vec<&'static str>,
    pub failed: Vec<(&'static str, String)>,
}

/// The plugins available to the host, in registration order.
#[derive(Debug, Default, Clone)]
pub struct PluginRegistry {
    plugins: Vec<PluginDescriptor>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-filled with the built-in plugins.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.extend(builtin::BUILTIN_PLUGINS.iter().copied());
        registry
    }

    /// Adds a plugin. A later plugin with the same name replaces the
    /// earlier one.
    pub fn add(&mut self, plugin: PluginDescriptor) -> &mut Self {
        self.plugins.retain(|p| p.name != plugin.name);
        self.plugins.push(plugin);
        self
    }

    pub fn extend(&mut self, plugins: impl IntoIterator<Item = PluginDescriptor>) -> &mut Self {
        for plugin in plugins {
            self.add(plugin);
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&PluginDescriptor> {
        self.plugins.iter().find(|p| p.name == name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|p| p.name).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Resolves plugin names, keeping the order given.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> BotResult<Vec<PluginDescriptor>> {
        names
            .iter()
            .map(|name| {
                self.get(name.as_ref()).copied().ok_or_else(|| {
                    BotError::InvalidOptions(format!(
                        "unknown script '{}' (available: {})",
                        name.as_ref(),
                        self.names().join(", ")
                    ))
                })
            })
            .collect()
    }

    /// Loads `plugins` into `bot`.
    pub async fn load(bot: &Bot, plugins: &[PluginDescriptor]) -> LoadReport {
        let mut report = LoadReport::default();
        for plugin in plugins {
            match register_guarded(bot, plugin) {
                Ok(()) => {
                    info!(plugin = plugin.name, "Loaded plugin");
                    report.loaded.push(plugin.name);
                }
                Err(e) => {
                    error!(plugin = plugin.name, error = %e, "Failed to load plugin");
                    bot.notify_debug_channel(&format!(
                        "Failed to load script `{}`: {e}",
                        plugin.name
                    ))
                    .await;
                    report.failed.push((plugin.name, e.to_string()));
                }
            }
        }
        report
    }
}

fn register_guarded(bot: &Bot, plugin: &PluginDescriptor) -> Result<(), BoxError> {
    match std::panic::catch_unwind(AssertUnwindSafe(|| (plugin.register)(bot))) {
        Ok(result) => result,
        Err(_) => Err(format!("plugin '{}' panicked during registration", plugin.name).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::handler::handler;
    use crate::testing::MockEngine;

    async fn noop(_: Context) {}

    fn good(bot: &Bot) -> Result<(), BoxError> {
        bot.add_command("good", false, handler("good", noop).build())?;
        Ok(())
    }

    fn bad(bot: &Bot) -> Result<(), BoxError> {
        bot.add_command("(bad", false, handler("bad", noop).build())?;
        Ok(())
    }

    fn explodes(_: &Bot) -> Result<(), BoxError> {
        panic!("import error");
    }

    const GOOD: PluginDescriptor = PluginDescriptor {
        name: "good",
        description: "works",
        register: good,
    };
    const BAD: PluginDescriptor = PluginDescriptor {
        name: "bad",
        description: "invalid pattern",
        register: bad,
    };
    const EXPLODES: PluginDescriptor = PluginDescriptor {
        name: "explodes",
        description: "panics",
        register: explodes,
    };

    #[tokio::test]
    async fn test_failed_plugin_is_skipped_and_reported() {
        let (engine, bot) = MockEngine::pair();
        let report = PluginRegistry::load(&bot, &[BAD, EXPLODES, GOOD]).await;

        assert_eq!(report.loaded, vec!["good"]);
        assert_eq!(report.failed.len(), 2);
        assert_eq!(bot.listeners().len(), 1);

        let sent = engine.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|(channel, _)| channel == "C9"));
        assert!(sent[0].1.starts_with("Failed to load script `bad`"));
    }

    #[test]
    fn test_select() {
        let mut registry = PluginRegistry::with_builtins();
        registry.add(GOOD);

        let selected = registry.select(&["good", "help"]).unwrap();
        assert_eq!(selected.iter().map(|p| p.name).collect::<Vec<_>>(), vec!["good", "help"]);
        assert!(registry.select(&["missing"]).is_err());
    }

    #[test]
    fn test_add_replaces_same_name() {
        let mut registry = PluginRegistry::new();
        registry.add(GOOD).add(GOOD);
        assert_eq!(registry.len(), 1);
    }
}
