//! Multi-turn commands: `hi` waits for the user's answer, `lunch` reacts
//! when running on Slack.

use serde_json::json;
use tracing::info;
use wren_core::BotResult;
use wren_framework::{Bot, Context, PluginDescriptor, handler};

pub const CONVERSATION_PLUGIN: PluginDescriptor = PluginDescriptor {
    name: "conversation",
    description: "small talk that waits for an answer",
    register,
};

fn register(bot: &Bot) -> Result<(), wren_core::BoxError> {
    bot.add_command(
        "hi",
        false,
        handler("conversation", conversation).doc("say hi and tell the bot how you are\n\nUsage: hi"),
    )?;
    bot.add_command("lunch", false, handler("lunch_suggestion", lunch_suggestion).build())?;
    Ok(())
}

async fn conversation(ctx: Context) -> BotResult<()> {
    info!("Starting a conversation");
    ctx.reply("How are you?").await?;

    if let Some(answer) = ctx.listen_for("(.*)").await? {
        ctx.reply(format!("{}? Me too!", answer.text)).await?;
    }
    Ok(())
}

async fn lunch_suggestion(ctx: Context) -> BotResult<()> {
    let reply = ctx.reply("How about Chipotle?").await?;

    if ctx.bot().engine().name() == "slack" {
        let params = json!({
            "name": "burrito",
            "channel": &reply.channel.id,
            "timestamp": reply.ts(),
        });
        ctx.bot().api("reactions.add", params).await?;
    }
    Ok(())
}
