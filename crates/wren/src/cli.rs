//! Command-line arguments.
//!
//! Flags override the matching configuration keys; anything left unset
//! falls through to `wren.toml` and the environment.

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use wren_runtime::ConfigLoader;

#[derive(Debug, Parser)]
#[command(name = "wren", version, about = "wren chat bot", disable_version_flag = true)]
pub struct Cli {
    /// Show version and exit
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    pub version: Option<bool>,

    /// Scripts to load, by name. Can be given several times.
    #[arg(short = 'S', long = "scripts", value_name = "NAME", num_args = 1..)]
    pub scripts: Vec<String>,

    /// What chat engine to use: slack or cli
    #[arg(short = 'e', long)]
    pub engine: Option<String>,

    /// What persistent storage to use: dict or json
    #[arg(short = 'm', long)]
    pub memory: Option<String>,

    /// Do not run the web server
    #[arg(long = "no-web-app")]
    pub no_web_app: bool,

    /// Load this config file instead of searching for `wren.toml`
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// List the available scripts and exit
    #[arg(long)]
    pub list_scripts: bool,
}

impl Cli {
    /// A config loader with the default sources plus these flags on top.
    pub fn loader(&self) -> ConfigLoader {
        let mut loader = match &self.config {
            Some(path) => ConfigLoader::new().file(path),
            None => ConfigLoader::new().with_current_dir().with_user_config_dir(),
        };
        if !self.scripts.is_empty() {
            loader = loader.set("bot.scripts", &self.scripts);
        }
        if let Some(engine) = &self.engine {
            loader = loader.set("bot.engine", engine);
        }
        if let Some(memory) = &self.memory {
            loader = loader.set("bot.memory", memory);
        }
        if self.no_web_app {
            loader = loader.set("web.enabled", false);
        }
        loader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["wren"]).unwrap();
        assert!(cli.scripts.is_empty());
        assert!(cli.engine.is_none());
        assert!(!cli.no_web_app);
    }

    #[test]
    fn test_all_flags() {
        let cli = Cli::try_parse_from([
            "wren", "-e", "slack", "-m", "json", "--no-web-app", "-S", "random_number", "lowercase",
        ])
        .unwrap();
        assert_eq!(cli.engine.as_deref(), Some("slack"));
        assert_eq!(cli.memory.as_deref(), Some("json"));
        assert!(cli.no_web_app);
        assert_eq!(cli.scripts, vec!["random_number", "lowercase"]);
    }

    #[test]
    fn test_version_flag() {
        let err = Cli::try_parse_from(["wren", "-v"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_flags_override_config() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("wren.toml", "[bot]\nengine = \"slack\"\nmemory = \"json\"\n")?;
            let cli = Cli::try_parse_from(["wren", "-c", "wren.toml", "-e", "cli", "--no-web-app"])
                .map_err(|e| e.to_string())?;
            let config = cli.loader().load().map_err(|e| e.to_string())?;
            assert_eq!(config.bot.engine, "cli");
            assert_eq!(config.bot.memory, "json");
            assert!(!config.web.enabled);
            Ok(())
        });
    }
}
