//! `acknowledge`: a raw field listener.

use tracing::debug;
use wren_core::{BotResult, Criteria};
use wren_framework::{Bot, Context, PluginDescriptor, handler};

pub const ACKNOWLEDGE_PLUGIN: PluginDescriptor = PluginDescriptor {
    name: "acknowledge",
    description: "answer the exact text `acknowledge`",
    register,
};

fn register(bot: &Bot) -> Result<(), wren_core::BoxError> {
    bot.on(
        Criteria::new().field("type", "message").field("text", "acknowledge"),
        handler("acknowledge", acknowledge).build(),
    )?;
    Ok(())
}

async fn acknowledge(ctx: Context) -> BotResult<()> {
    ctx.reply("Tadaa!").await?;
    debug!("Attached to a message");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{message, settle};
    use wren_framework::PluginRegistry;
    use wren_framework::testing::MockEngine;

    #[tokio::test]
    async fn test_exact_text_only() {
        let (engine, bot) = MockEngine::pair();
        PluginRegistry::load(&bot, &[ACKNOWLEDGE_PLUGIN]).await;

        bot.dispatcher().dispatch(message("C1", "acknowledge")).await;
        bot.dispatcher().dispatch(message("C1", "please acknowledge")).await;
        settle().await;

        assert_eq!(engine.sent(), vec![("C1".to_string(), "Tadaa!".to_string())]);
    }
}
