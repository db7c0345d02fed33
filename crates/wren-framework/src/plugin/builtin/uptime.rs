//! `uptime`: how long the bot has been running.

use std::time::Duration;

use wren_core::BotResult;

use crate::bot::Bot;
use crate::context::Context;
use crate::handler::handler;
use crate::plugin::PluginDescriptor;

pub const UPTIME_PLUGIN: PluginDescriptor = PluginDescriptor {
    name: "uptime",
    description: "report how long the bot has been running",
    register,
};

fn register(bot: &Bot) -> Result<(), wren_core::BoxError> {
    let uptime = handler("get_uptime", get_uptime).doc(
        "get amount of time this bot has been running

         Usage: uptime",
    );
    let uptime = bot.add_command("uptime", true, uptime)?;
    bot.learn(&["What's your uptime?", "How long have you been running?"], uptime);
    Ok(())
}

/// Largest whole unit, e.g. `` `3 minutes` ``.
pub fn format_uptime(elapsed: Duration) -> String {
    let mut value = elapsed.as_secs();
    let mut unit = "second";
    for (next, divisor) in [("minute", 60), ("hour", 60), ("day", 24)] {
        if value < divisor {
            break;
        }
        value /= divisor;
        unit = next;
    }
    let plural = if value == 1 { "" } else { "s" };
    format!("`{value} {unit}{plural}`")
}

async fn get_uptime(ctx: Context) -> BotResult<()> {
    ctx.reply_thread(format_uptime(ctx.bot().uptime())).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::PluginRegistry;
    use crate::testing::MockEngine;
    use wren_core::Event;

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(Duration::from_secs(0)), "`0 seconds`");
        assert_eq!(format_uptime(Duration::from_secs(1)), "`1 second`");
        assert_eq!(format_uptime(Duration::from_secs(59)), "`59 seconds`");
        assert_eq!(format_uptime(Duration::from_secs(60)), "`1 minute`");
        assert_eq!(format_uptime(Duration::from_secs(7200)), "`2 hours`");
        assert_eq!(format_uptime(Duration::from_secs(86_400 * 3)), "`3 days`");
    }

    #[tokio::test]
    async fn test_uptime_replies_in_thread() {
        let (engine, bot) = MockEngine::pair();
        PluginRegistry::load(&bot, &[UPTIME_PLUGIN]).await;

        let event = Event::new("message")
            .with("channel", "C1")
            .with("user", "U1")
            .with("ts", "1700000000.000100")
            .with("text", "betabot: uptime");
        bot.dispatcher().dispatch(event).await;
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }

        let sent = engine.sent_messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, "`0 seconds`");
        let extras = sent[0].extras.as_ref().unwrap();
        assert_eq!(extras["thread_ts"], "1700000000.000100");
    }
}
