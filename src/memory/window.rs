//! Conversation turn types and the bounded FIFO window that stores them.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Author of a message turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One role-tagged message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageTurn {
    pub role: Role,
    pub content: String,
}

impl MessageTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// Opaque key identifying one conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConversationId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ConversationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered turns of one conversation, oldest first.
///
/// The window does not own its bound: callers pass the capacity on every
/// mutation so a reconfiguration applies to all windows at once.
#[derive(Debug, Clone, Default)]
pub struct MemoryWindow {
    turns: VecDeque<MessageTurn>,
}

impl MemoryWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `turn`, evicting from the front first if the window is full.
    ///
    /// Returns the number of evicted turns.
    pub fn push(&mut self, turn: MessageTurn, capacity: usize) -> usize {
        let evicted = self.trim_to(capacity.saturating_sub(1));
        self.turns.push_back(turn);
        evicted
    }

    /// Drop the oldest turns until at most `capacity` remain.
    pub fn trim_to(&mut self, capacity: usize) -> usize {
        let excess = self.turns.len().saturating_sub(capacity);
        self.turns.drain(..excess);
        excess
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MessageTurn> {
        self.turns.iter()
    }

    pub fn to_vec(&self) -> Vec<MessageTurn> {
        self.turns.iter().cloned().collect()
    }
}
