//! `still_here`: an hourly heartbeat to the debug channel.

use wren_core::{BotResult, ChannelQuery};
use wren_framework::{Bot, Context, PluginDescriptor, Schedule, handler};

pub const DEBUG_CHANNEL: &str = "betabot-debug";

pub const STILL_HERE_PLUGIN: PluginDescriptor = PluginDescriptor {
    name: "still_here",
    description: "post a heartbeat at the top of every hour",
    register,
};

fn register(bot: &Bot) -> Result<(), wren_core::BoxError> {
    bot.on_schedule(Schedule::new().minute(0), handler("still_here", still_here).build())?;
    Ok(())
}

async fn still_here(ctx: Context) -> BotResult<()> {
    let bot = ctx.bot();
    if let Some(channel) = bot.get_channel(&ChannelQuery::name(DEBUG_CHANNEL)).await? {
        bot.send("I am still here!", &channel.id, None).await?;
    }
    Ok(())
}
