//! `random number`: remembers the previous roll in memory.

use std::time::Duration;

use rand::Rng;
use wren_core::BotResult;
use wren_framework::{Bot, Context, PluginDescriptor, handler};

const MEMORY_KEY: &str = "random_number";

pub const RANDOM_NUMBER_PLUGIN: PluginDescriptor = PluginDescriptor {
    name: "random_number",
    description: "roll a number between 1 and 10",
    register,
};

fn register(bot: &Bot) -> Result<(), wren_core::BoxError> {
    let roll = handler("random_number", random_number).doc(
        "roll a number between 1 and 10

         Usage: random number",
    );
    let roll = bot.add_command("random number", false, roll)?;
    bot.learn(
        &["Give me a random number", "roll the dice", "generatet a random number"],
        roll,
    );
    Ok(())
}

async fn random_number(ctx: Context) -> BotResult<()> {
    let memory = ctx.memory()?;
    let last: Option<u32> = memory.load(MEMORY_KEY).await?;
    let roll: u32 = rand::thread_rng().gen_range(1..=10);
    memory.store(MEMORY_KEY, &roll).await?;

    ctx.reply(format!("Random number is {roll}")).await?;
    if let Some(last) = last {
        tokio::time::sleep(Duration::from_secs(1)).await;
        ctx.reply(format!("But last time I said it was {last}")).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{message, settle};
    use std::sync::Arc;
    use wren_core::{BoxedMemory, DictMemory};
    use wren_framework::PluginRegistry;
    use wren_framework::testing::MockEngine;

    fn rolled(text: &str) -> u32 {
        let n = text.strip_prefix("Random number is ").unwrap().parse().unwrap();
        assert!((1..=10).contains(&n));
        n
    }

    #[tokio::test]
    async fn test_first_roll_is_remembered() {
        let (engine, bot) = MockEngine::pair();
        let memory: BoxedMemory = Arc::new(DictMemory::new());
        bot.set_memory(memory.clone());
        PluginRegistry::load(&bot, &[RANDOM_NUMBER_PLUGIN]).await;

        bot.dispatcher().dispatch(message("D1", "random number")).await;
        settle().await;

        let texts = engine.sent_texts();
        assert_eq!(texts.len(), 1);
        let n = rolled(&texts[0]);
        assert_eq!(memory.load::<u32>(MEMORY_KEY).await.unwrap(), Some(n));
    }

    #[tokio::test(start_paused = true)]
    async fn test_learned_phrase_mentions_last_roll() {
        let (engine, bot) = MockEngine::pair();
        let memory: BoxedMemory = Arc::new(DictMemory::new());
        memory.store(MEMORY_KEY, &3u32).await.unwrap();
        bot.set_memory(memory);
        PluginRegistry::load(&bot, &[RANDOM_NUMBER_PLUGIN]).await;

        bot.dispatcher().dispatch(message("D1", "roll the dice")).await;
        settle().await;
        tokio::time::sleep(Duration::from_secs(2)).await;

        let texts = engine.sent_texts();
        assert_eq!(texts.len(), 2);
        rolled(&texts[0]);
        assert_eq!(texts[1], "But last time I said it was 3");
    }
}
