//! Runtime orchestration.
//!
//! [`BotRuntime`] turns a [`WrenConfig`] into a running bot:
//!
//! 1. build the engine selected by `bot.engine`
//! 2. start the health web server (unless disabled)
//! 3. connect the engine and set up the memory backend
//! 4. load the built-in plugins and the ones named in `bot.scripts`
//! 5. run `on_start` hooks and start scheduled jobs
//! 6. dispatch events until Ctrl+C, SIGTERM or the end of the event stream
//!
//! ```rust,ignore
//! let mut runtime = BotRuntime::load()?;
//! runtime.register_plugins(sample_scripts::PLUGINS.iter().copied());
//! runtime.run().await?;
//! ```

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use wren_adapter_console::ConsoleEngine;
use wren_adapter_slack::SlackEngine;
use wren_core::{BoxedEngine, BoxedMemory, DictMemory, JsonFileMemory};
use wren_framework::plugin::builtin::BUILTIN_PLUGINS;
use wren_framework::{Bot, LoadReport, PluginDescriptor, PluginRegistry};

use crate::config::{ConfigError, ConfigResult, WrenConfig, load_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::{logging, web};

/// The chat engines this build can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    Cli,
    Slack,
}

impl EngineKind {
    pub fn parse(name: &str) -> ConfigResult<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "cli" | "console" => Ok(Self::Cli),
            "slack" => Ok(Self::Slack),
            _ => Err(ConfigError::InvalidEngine(name.to_owned())),
        }
    }

    pub fn build(self, config: &WrenConfig) -> RuntimeResult<BoxedEngine> {
        match self {
            Self::Cli => {
                let mut console = config.console.clone();
                if let Some(name) = &config.bot.name {
                    console.bot_name.clone_from(name);
                }
                Ok(Arc::new(ConsoleEngine::stdio(console)))
            }
            Self::Slack => {
                if let Some(missing) = config.slack.missing_credentials().first() {
                    return Err(ConfigError::missing_field(*missing).into());
                }
                Ok(Arc::new(SlackEngine::new(config.slack.clone())?))
            }
        }
    }
}

/// The memory backends this build provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryKind {
    Dict,
    Json,
}

impl MemoryKind {
    pub fn parse(name: &str) -> ConfigResult<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "dict" => Ok(Self::Dict),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::InvalidMemory(name.to_owned())),
        }
    }

    pub fn build(self, config: &WrenConfig) -> BoxedMemory {
        match self {
            Self::Dict => Arc::new(DictMemory::new()),
            Self::Json => Arc::new(JsonFileMemory::new(config.memory.path.clone())),
        }
    }
}

/// The main Wren runtime.
pub struct BotRuntime {
    config: WrenConfig,
    plugins: PluginRegistry,
    shutdown: CancellationToken,
}

impl BotRuntime {
    /// Loads configuration from the default locations.
    pub fn load() -> RuntimeResult<Self> {
        Ok(Self::from_config(load_config()?))
    }

    /// Creates a runtime and initializes logging from `config`.
    pub fn from_config(config: WrenConfig) -> Self {
        logging::init_from_config(&config.logging);
        info!(
            engine = %config.bot.engine,
            memory = %config.bot.memory,
            log_level = %config.logging.level,
            "Runtime initialized from configuration"
        );
        Self {
            config,
            plugins: PluginRegistry::with_builtins(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &WrenConfig {
        &self.config
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    /// Makes a plugin available for selection through `bot.scripts`.
    pub fn register_plugin(&mut self, plugin: PluginDescriptor) -> &mut Self {
        self.plugins.add(plugin);
        self
    }

    pub fn register_plugins(&mut self, plugins: impl IntoIterator<Item = PluginDescriptor>) -> &mut Self {
        self.plugins.extend(plugins);
        self
    }

    /// Cancelling this token stops the dispatch loop, the scheduler and the
    /// web server.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Built-ins first, then `bot.scripts` in the order given.
    pub fn selected_plugins(&self) -> RuntimeResult<Vec<PluginDescriptor>> {
        let mut names: Vec<&str> = BUILTIN_PLUGINS.iter().map(|p| p.name).collect();
        for script in &self.config.bot.scripts {
            if !names.contains(&script.as_str()) {
                names.push(script.as_str());
            }
        }
        Ok(self.plugins.select(&names)?)
    }

    /// Creates the bot on the configured engine.
    pub fn build_bot(&self) -> RuntimeResult<Bot> {
        let engine = EngineKind::parse(&self.config.bot.engine)?.build(&self.config)?;
        Ok(Bot::new(engine, self.config.dispatch.clone()))
    }

    /// Connects the engine, sets up memory, loads plugins, runs start hooks
    /// and starts scheduled jobs.
    pub async fn start(&self, bot: &Bot) -> RuntimeResult<LoadReport> {
        let plugins = self.selected_plugins()?;

        bot.engine().setup().await?;
        bot.refresh_identity();

        let memory = MemoryKind::parse(&self.config.bot.memory)?.build(&self.config);
        memory.setup().await?;
        info!(memory = memory.name(), "Memory ready");
        bot.set_memory(memory);

        let report = PluginRegistry::load(bot, &plugins).await;
        if !report.failed.is_empty() {
            warn!(failed = report.failed.len(), "Some plugins failed to load");
        }

        bot.run_start_hooks().await;
        bot.scheduler().start(bot, &self.shutdown);
        info!(
            plugins = report.loaded.len(),
            listeners = bot.listeners().len(),
            jobs = bot.scheduler().len(),
            "Bot started"
        );
        Ok(report)
    }

    /// Builds the bot and runs it until shutdown.
    pub async fn run(self) -> RuntimeResult<()> {
        let bot = self.build_bot()?;
        self.run_bot(bot).await
    }

    /// Runs an already-built bot until shutdown.
    pub async fn run_bot(&self, bot: Bot) -> RuntimeResult<()> {
        let web = if self.config.web.enabled {
            Some(web::serve(&self.config.web, self.shutdown.child_token()).await?)
        } else {
            None
        };

        let result = match self.start(&bot).await {
            Ok(_) => {
                info!("Wren is now running. Press Ctrl+C to stop.");
                let dispatcher = bot.dispatcher();
                tokio::select! {
                    r = dispatcher.run(self.shutdown.clone()) => r.map_err(RuntimeError::from),
                    _ = wait_for_signal() => Ok(()),
                }
            }
            Err(e) => Err(e),
        };

        self.shutdown.cancel();
        bot.shutdown();
        bot.engine().shutdown().await;
        if let Some((_, handle)) = web {
            let _ = handle.await;
        }
        info!("Wren stopped");
        result
    }
}

/// Waits for Ctrl+C or SIGTERM.
async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to register SIGTERM handler");
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Received Ctrl+C, shutting down");
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                warn!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        }
    }
}
