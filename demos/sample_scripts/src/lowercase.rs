//! `lowercase`: the optional trailing `e` shows the pattern is a regex.

use wren_core::BotResult;
use wren_framework::{Bot, Context, PluginDescriptor, handler};

pub const LOWERCASE_PLUGIN: PluginDescriptor = PluginDescriptor {
    name: "lowercase",
    description: "a command with a regex pattern",
    register,
};

fn register(bot: &Bot) -> Result<(), wren_core::BoxError> {
    bot.add_command("lowercase?", false, handler("lowercase", lowercase).build())?;
    Ok(())
}

async fn lowercase(ctx: Context) -> BotResult<()> {
    ctx.reply("til i die").await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{message, settle};
    use wren_framework::PluginRegistry;
    use wren_framework::testing::MockEngine;

    #[tokio::test]
    async fn test_pattern_variants() {
        let (engine, bot) = MockEngine::pair();
        PluginRegistry::load(&bot, &[LOWERCASE_PLUGIN]).await;

        for text in ["lowercase", "LOWERCAS", "lowercased"] {
            bot.dispatcher().dispatch(message("C1", text)).await;
        }
        settle().await;

        assert_eq!(engine.sent_texts(), vec!["til i die", "til i die"]);
    }
}
