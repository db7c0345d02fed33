//! Runtime error types.

use thiserror::Error;
use wren_core::{BotError, EngineError, MemoryError};

pub use crate::config::error::{ConfigError, ConfigResult};

/// Errors that stop the runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Bad or incomplete configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The engine failed to connect or its event stream broke.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// The memory backend could not be set up.
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error(transparent)]
    Bot(#[from] BotError),

    /// The web server could not bind.
    #[error("Web server error: {0}")]
    Web(#[from] std::io::Error),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
