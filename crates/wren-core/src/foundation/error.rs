//! Unified error types for the Wren core.
//!
//! Runtime-level errors (configuration, startup) are defined in
//! `wren-runtime`.

use thiserror::Error;

/// Error type handlers and scheduled jobs return.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// =============================================================================
// Engine Errors
// =============================================================================

/// Errors raised by a chat engine.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// Could not reach the chat service.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The chat service rejected an API call.
    #[error("API call '{method}' failed: {message}")]
    Api {
        /// The API method that failed.
        method: String,
        /// Error reported by the service.
        message: String,
    },

    /// The event stream is closed.
    #[error("engine closed")]
    Closed,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),

    /// A payload could not be decoded.
    #[error("failed to decode payload: {0}")]
    Decode(String),

    /// The engine does not provide the requested capability.
    #[error("engine '{engine}' does not support '{capability}'")]
    CapabilityMissing {
        engine: &'static str,
        capability: String,
    },
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

// =============================================================================
// Memory Errors
// =============================================================================

/// Errors raised by a memory backend.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// The backing store could not be read or written.
    #[error("memory I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value could not be (de)serialized.
    #[error("memory serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// The store was used before `setup`.
    #[error("memory backend '{0}' is not set up")]
    NotReady(&'static str),
}

// =============================================================================
// Bot Errors
// =============================================================================

/// Errors in the bot domain.
#[derive(Debug, Error)]
pub enum BotError {
    /// A deliberate failure raised by a script.
    ///
    /// Reported to the chat without a trace.
    #[error("{0}")]
    Script(String),

    /// Invalid registration or configuration options.
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// The engine lacks a capability a script asked for.
    #[error("engine '{engine}' does not support '{capability}'")]
    CapabilityMissing {
        engine: &'static str,
        capability: String,
    },

    /// Engine failure.
    #[error(transparent)]
    Engine(EngineError),

    /// Memory failure.
    #[error(transparent)]
    Memory(#[from] MemoryError),

    /// An invalid regular expression.
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl BotError {
    /// Shorthand for an intentional script error.
    pub fn script(message: impl Into<String>) -> Self {
        Self::Script(message.into())
    }

    /// Whether the error was raised on purpose by a script.
    pub fn is_script(&self) -> bool {
        matches!(self, Self::Script(_))
    }
}

impl From<EngineError> for BotError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::CapabilityMissing { engine, capability } => {
                Self::CapabilityMissing { engine, capability }
            }
            other => Self::Engine(other),
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Result type for memory operations.
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Result type for bot operations.
pub type BotResult<T> = Result<T, BotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_missing_is_lifted() {
        let err: BotError = EngineError::CapabilityMissing {
            engine: "cli",
            capability: "reactions.add".into(),
        }
        .into();
        assert!(matches!(err, BotError::CapabilityMissing { .. }));
        assert_eq!(err.to_string(), "engine 'cli' does not support 'reactions.add'");
    }

    #[test]
    fn test_script_error_displays_bare_message() {
        let err = BotError::script("nope");
        assert!(err.is_script());
        assert_eq!(err.to_string(), "nope");
    }
}
