//! Process-wide store of conversation windows.
//!
//! Windows live in a sharded concurrent map, so appends to one conversation
//! are serialized by that key's shard lock while unrelated conversations
//! proceed independently. The bound is shared by every window and is read
//! while the window lock is held.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::memory::window::{ConversationId, MemoryWindow, MessageTurn};

/// Default window bound, in turns.
pub const DEFAULT_MAX_WINDOW_SIZE: usize = 20;

/// Memory settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Maximum turns kept per conversation.
    pub max_window_size: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_window_size: DEFAULT_MAX_WINDOW_SIZE,
        }
    }
}

/// Point-in-time usage figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryStats {
    pub conversations: usize,
    pub turns: usize,
    pub evicted_turns: u64,
    pub max_window_size: usize,
}

/// Bounded conversation memory keyed by [`ConversationId`].
pub struct ConversationMemory {
    windows: DashMap<ConversationId, MemoryWindow>,
    max_window_size: AtomicUsize,
    evicted: AtomicU64,
}

impl ConversationMemory {
    pub fn new(config: MemoryConfig) -> Result<Self, CoreError> {
        let max_window_size = config.max_window_size;
        if max_window_size == 0 {
            return Err(CoreError::InvalidCapacity { requested: 0 });
        }
        Ok(Self {
            windows: DashMap::new(),
            max_window_size: AtomicUsize::new(max_window_size),
            evicted: AtomicU64::new(0),
        })
    }

    /// Current window bound.
    pub fn max_window_size(&self) -> usize {
        self.max_window_size.load(Ordering::SeqCst)
    }

    /// Add `turn` to the conversation, creating its window if needed.
    pub fn append(&self, conversation: &ConversationId, turn: MessageTurn) {
        self.append_all(conversation, std::iter::once(turn));
    }

    /// Add several turns under a single lock, so no concurrent append can
    /// land between them.
    pub fn append_all<I>(&self, conversation: &ConversationId, turns: I)
    where
        I: IntoIterator<Item = MessageTurn>,
    {
        let mut turns = turns.into_iter().peekable();
        if turns.peek().is_none() {
            return;
        }

        let mut window = self.windows.entry(conversation.clone()).or_default();
        let capacity = self.max_window_size();
        let evicted: usize = turns.map(|turn| window.push(turn, capacity)).sum();
        drop(window);

        if evicted > 0 {
            self.evicted.fetch_add(evicted as u64, Ordering::Relaxed);
        }
    }

    /// Window contents, oldest first. Unknown conversations yield an empty
    /// sequence.
    pub fn snapshot(&self, conversation: &ConversationId) -> Vec<MessageTurn> {
        self.windows
            .get(conversation)
            .map(|window| window.to_vec())
            .unwrap_or_default()
    }

    /// Change the bound for every window, trimming oversized ones now.
    ///
    /// Non-positive sizes are rejected and leave all state untouched.
    pub fn configure(&self, max_window_size: i64) -> Result<(), CoreError> {
        let capacity = validate_capacity(max_window_size)?;
        self.max_window_size.store(capacity, Ordering::SeqCst);

        let mut evicted = 0usize;
        for mut window in self.windows.iter_mut() {
            // Re-read so a racing configure never leaves a window above the
            // bound that won.
            evicted += window.trim_to(self.max_window_size());
        }
        if evicted > 0 {
            self.evicted.fetch_add(evicted as u64, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Remove the conversation's window entirely.
    pub fn clear(&self, conversation: &ConversationId) {
        self.windows.remove(conversation);
    }

    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            conversations: self.windows.len(),
            turns: self.windows.iter().map(|window| window.len()).sum(),
            evicted_turns: self.evicted.load(Ordering::Relaxed),
            max_window_size: self.max_window_size(),
        }
    }
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self {
            windows: DashMap::new(),
            max_window_size: AtomicUsize::new(DEFAULT_MAX_WINDOW_SIZE),
            evicted: AtomicU64::new(0),
        }
    }
}

fn validate_capacity(requested: i64) -> Result<usize, CoreError> {
    if requested <= 0 {
        return Err(CoreError::InvalidCapacity { requested });
    }
    usize::try_from(requested).map_err(|_| CoreError::InvalidCapacity { requested })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory(max_window_size: usize) -> ConversationMemory {
        ConversationMemory::new(MemoryConfig { max_window_size }).unwrap()
    }

    fn contents(turns: &[MessageTurn]) -> Vec<&str> {
        turns.iter().map(|t| t.content.as_str()).collect()
    }

    #[test]
    fn test_new_rejects_zero_capacity() {
        let err = ConversationMemory::new(MemoryConfig { max_window_size: 0 })
            .err()
            .unwrap();
        assert_eq!(err, CoreError::InvalidCapacity { requested: 0 });
    }

    #[test]
    fn test_new_accepts_any_positive_size() {
        let memory = memory(usize::MAX);
        assert_eq!(memory.max_window_size(), usize::MAX);
    }

    #[test]
    fn test_windows_are_isolated() {
        let memory = memory(4);
        let a = ConversationId::from("a");
        let b = ConversationId::from("b");
        memory.append(&a, MessageTurn::user("to a"));
        memory.append(&b, MessageTurn::user("to b"));

        assert_eq!(contents(&memory.snapshot(&a)), vec!["to a"]);
        assert_eq!(contents(&memory.snapshot(&b)), vec!["to b"]);
    }

    #[test]
    fn test_append_all_empty_creates_nothing() {
        let memory = memory(4);
        memory.append_all(&ConversationId::from("x"), Vec::new());
        assert_eq!(memory.stats().conversations, 0);
    }

    #[test]
    fn test_stats_track_evictions() {
        let memory = memory(2);
        let id = ConversationId::from("x");
        for c in ["a", "b", "c", "d"] {
            memory.append(&id, MessageTurn::user(c));
        }
        memory.configure(1).unwrap();

        let stats = memory.stats();
        assert_eq!(stats.conversations, 1);
        assert_eq!(stats.turns, 1);
        assert_eq!(stats.evicted_turns, 3);
        assert_eq!(stats.max_window_size, 1);
    }

    #[test]
    fn test_raising_bound_keeps_contents() {
        let memory = memory(2);
        let id = ConversationId::from("x");
        for c in ["a", "b", "c"] {
            memory.append(&id, MessageTurn::user(c));
        }
        memory.configure(5).unwrap();
        memory.append(&id, MessageTurn::user("d"));
        assert_eq!(contents(&memory.snapshot(&id)), vec!["b", "c", "d"]);
    }
}
