//! The `wren` binary.
//!
//! ```bash
//! wren --engine cli --scripts random_number lowercase
//! ```

use anyhow::Result;
use clap::Parser;
use wren::cli::Cli;
use wren::runtime::BotRuntime;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.loader().load()?;

    let mut runtime = BotRuntime::from_config(config);
    #[cfg(feature = "sample-scripts")]
    runtime.register_plugins(wren::sample_scripts::PLUGINS.iter().copied());

    if cli.list_scripts {
        for name in runtime.plugins().names() {
            let description = runtime
                .plugins()
                .get(name)
                .map(|p| p.description)
                .unwrap_or_default();
            println!("{name:<16} {description}");
        }
        return Ok(());
    }

    runtime.run().await?;
    Ok(())
}
