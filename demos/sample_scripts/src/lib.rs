//! Example plugins for the Wren chat-bot runtime.
//!
//! Each module exposes one [`PluginDescriptor`]. Register them with the
//! runtime and select them by name through `bot.scripts`:
//!
//! ```rust,ignore
//! let mut runtime = BotRuntime::load()?;
//! runtime.register_plugins(wren_sample_scripts::PLUGINS.iter().copied());
//! runtime.run().await?;
//! ```

pub mod acknowledge;
pub mod conversation;
pub mod lowercase;
pub mod random_number;
pub mod still_here;

use wren_framework::PluginDescriptor;

pub use acknowledge::ACKNOWLEDGE_PLUGIN;
pub use conversation::CONVERSATION_PLUGIN;
pub use lowercase::LOWERCASE_PLUGIN;
pub use random_number::RANDOM_NUMBER_PLUGIN;
pub use still_here::STILL_HERE_PLUGIN;

/// Every sample plugin.
pub static PLUGINS: &[PluginDescriptor] = &[
    ACKNOWLEDGE_PLUGIN,
    CONVERSATION_PLUGIN,
    LOWERCASE_PLUGIN,
    RANDOM_NUMBER_PLUGIN,
    STILL_HERE_PLUGIN,
];

#[cfg(test)]
pub(crate) mod test_util {
    use wren_core::Event;

    pub fn message(channel: &str, text: &str) -> Event {
        Event::new("message")
            .with("channel", channel)
            .with("user", "U1")
            .with("text", text)
            .with("ts", "1.0")
    }

    pub async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_plugin_names_are_unique() {
        let names: HashSet<_> = PLUGINS.iter().map(|p| p.name).collect();
        assert_eq!(names.len(), PLUGINS.len());
    }
}
