//! # Wren Core
//!
//! The core types of the Wren chat-bot runtime.
//!
//! This crate holds everything the dispatcher needs to reason about an
//! incoming event without knowing which chat service produced it.
//!
//! ## Architecture Layers
//!
//! ### Foundation Layer
//!
//! Plain data and error types:
//! - **Events**: raw field mappings produced by an engine ([`Event`])
//! - **Messages**: the per-event chat view handed to handlers ([`Message`])
//! - **Channels**: chat destinations ([`Channel`], [`ChannelQuery`])
//! - **Errors**: [`BotError`], [`EngineError`], [`MemoryError`]
//!
//! ### Matching Layer
//!
//! Pure functions used by the dispatcher:
//! - **Field matching**: [`subset_match`] over [`Criteria`]
//! - **Text matching**: [`regex_match`] and [`CommandPattern`]
//! - **Addressing**: [`Addressing`] / [`detect_direct`]
//!
//! ### Integration Layer
//!
//! Collaborator interfaces:
//! - **Engines**: the chat transport ([`Engine`])
//! - **Memory**: the key-value store scripts persist into ([`Memory`])
//!
//! ```text
//! ┌──────────┐  Event   ┌────────────┐  Message  ┌──────────┐
//! │  Engine  │─────────▶│ Dispatcher │──────────▶│ Handlers │
//! └──────────┘          └────────────┘           └──────────┘
//!       ▲                                              │
//!       └──────────────── send / api ──────────────────┘
//! ```

pub mod addressing;
pub mod foundation;
pub mod integration;
pub mod matcher;

pub use addressing::{Addressed, Addressing, AddressingRules, BotIdentity, detect_direct};
pub use foundation::{
    BotError, BotResult, BoxError, Channel, ChannelQuery, EngineError, EngineResult, Event,
    MatchGroups, MemoryError, MemoryResult, Message,
};
pub use integration::{
    BoxedEngine, BoxedMemory, DictMemory, Engine, Extras, JsonFileMemory, Memory,
};
pub use matcher::{CommandPattern, Criteria, regex_match, subset_match};

/// Prelude for common imports.
pub mod prelude {
    pub use super::foundation::*;
    pub use super::integration::{Engine, Extras, Memory};
    pub use super::matcher::{Criteria, subset_match};
}
