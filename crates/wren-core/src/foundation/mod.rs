//! Foundation layer: events, messages, channels and errors.

pub mod channel;
pub mod error;
pub mod event;
pub mod message;

pub use channel::{Channel, ChannelQuery};
pub use error::{
    BotError, BotResult, BoxError, EngineError, EngineResult, MemoryError, MemoryResult,
};
pub use event::Event;
pub use message::{MatchGroups, Message};
