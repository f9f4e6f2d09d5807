//! Bounded conversation memory.
//!
//! - [`window`]: MessageTurn, ConversationId and the FIFO MemoryWindow
//! - [`store`]: process-wide, per-conversation synchronized store

pub mod store;
pub mod window;

pub use store::{ConversationMemory, MemoryConfig, MemoryStats, DEFAULT_MAX_WINDOW_SIZE};
pub use window::{ConversationId, MemoryWindow, MessageTurn, Role};
