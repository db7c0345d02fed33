//! Integration layer - collaborator interfaces.
//!
//! - Chat engines that produce events and deliver messages
//! - Memory backends scripts persist into

pub mod engine;
pub mod memory;

pub use engine::{BoxedEngine, Engine, Extras};
pub use memory::{BoxedMemory, DictMemory, JsonFileMemory, Memory};
