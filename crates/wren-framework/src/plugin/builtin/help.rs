//! `help`: lists what the bot can do.

use wren_core::BotResult;

use crate::bot::Bot;
use crate::context::Context;
use crate::handler::handler;
use crate::help::HelpEntry;
use crate::plugin::PluginDescriptor;

pub const HELP_PLUGIN: PluginDescriptor = PluginDescriptor {
    name: "help",
    description: "list the commands the bot knows",
    register,
};

fn register(bot: &Bot) -> Result<(), wren_core::BoxError> {
    let summary = handler("generic_help", generic_help).doc(
        "get summary of all commands

         Usage: help",
    );
    let summary = bot.add_command("help$", true, summary)?;
    bot.learn(
        &[
            "List your commands",
            "What can you do?",
            "What commands do you know?",
        ],
        summary,
    );

    let query = handler("help_query", help_query).doc(
        "get detailed help of a command

         Usage: help <command>",
    );
    bot.add_command("help (.*)", true, query)?;
    Ok(())
}

/// Renders help entries as one line each.
pub fn help_text(entries: &[HelpEntry]) -> String {
    entries
        .iter()
        .map(|entry| {
            if entry.description.is_empty() {
                format!("`{}`\n", entry.usage)
            } else {
                format!("`{}` - {}\n", entry.usage, entry.description)
            }
        })
        .collect()
}

async fn generic_help(ctx: Context) -> BotResult<()> {
    ctx.reply(
        "Here are my commands, but I can also understand natural language. \
         Just ask me \"What can you do?\"",
    )
    .await?;
    ctx.reply(help_text(&ctx.bot().help().list(None))).await?;
    Ok(())
}

async fn help_query(ctx: Context) -> BotResult<()> {
    let query = ctx.group(1).unwrap_or_default().trim().to_owned();
    let entries = ctx.bot().help().list(Some(&query));
    if entries.is_empty() {
        ctx.reply(format!("No commands match `{query}`")).await?;
    } else {
        ctx.reply(help_text(&entries)).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::builtin::UPTIME_PLUGIN;
    use crate::plugin::PluginRegistry;
    use crate::testing::MockEngine;
    use wren_core::Event;

    fn direct(text: &str) -> Event {
        Event::new("message")
            .with("channel", "D1")
            .with("user", "U1")
            .with("text", text)
    }

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn test_help_text() {
        let entries = vec![
            HelpEntry {
                usage: "help".into(),
                description: "get summary".into(),
            },
            HelpEntry {
                usage: "bare".into(),
                description: String::new(),
            },
        ];
        assert_eq!(help_text(&entries), "`help` - get summary\n`bare`\n");
    }

    #[tokio::test]
    async fn test_help_lists_builtins() {
        let (engine, bot) = MockEngine::pair();
        PluginRegistry::load(&bot, &[HELP_PLUGIN, UPTIME_PLUGIN]).await;

        bot.dispatcher().dispatch(direct("help")).await;
        settle().await;

        let texts = engine.sent_texts();
        assert_eq!(texts.len(), 2);
        assert_eq!(
            texts[1],
            "`help` - get summary of all commands\n\
             `help <command>` - get detailed help of a command\n\
             `uptime` - get amount of time this bot has been running\n"
        );
    }

    #[tokio::test]
    async fn test_help_query_filters() {
        let (engine, bot) = MockEngine::pair();
        PluginRegistry::load(&bot, &[HELP_PLUGIN, UPTIME_PLUGIN]).await;

        bot.dispatcher().dispatch(direct("help up")).await;
        settle().await;

        let texts = engine.sent_texts();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].starts_with("`uptime` - get amount of time this bot has been running\n"));
        assert!(texts[0].contains("Usage: uptime"));
    }

    #[tokio::test]
    async fn test_help_ignores_ambient() {
        let (engine, bot) = MockEngine::pair();
        PluginRegistry::load(&bot, &[HELP_PLUGIN]).await;

        let ambient = Event::new("message")
            .with("channel", "C1")
            .with("user", "U1")
            .with("text", "help");
        bot.dispatcher().dispatch(ambient).await;
        settle().await;
        assert!(engine.sent_texts().is_empty());
    }
}
