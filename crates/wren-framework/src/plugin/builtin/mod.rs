//! Built-in plugins, loaded by every bot.

mod help;
mod uptime;

pub use help::{HELP_PLUGIN, help_text};
pub use uptime::{UPTIME_PLUGIN, format_uptime};

use super::PluginDescriptor;

/// Every built-in plugin.
pub static BUILTIN_PLUGINS: &[PluginDescriptor] = &[HELP_PLUGIN, UPTIME_PLUGIN];
