//! Token-bounded chat history.

use serde::{Deserialize, Serialize};

use super::types::{ChatMessage, MessageRole};

fn default_token_limit() -> usize {
    3000
}

/// Rough token count of a message: one token per four characters.
#[must_use]
pub fn estimate_tokens(message: &ChatMessage) -> usize {
    message.content.chars().count().div_ceil(4) + 1
}

/// Chat history that returns only the most recent turns fitting a budget.
///
/// The buffer is serializable so it can live in a run's context store and
/// travel inside snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMemoryBuffer {
    #[serde(default = "default_token_limit")]
    token_limit: usize,
    #[serde(default)]
    messages: Vec<ChatMessage>,
}

impl Default for ChatMemoryBuffer {
    fn default() -> Self {
        Self::new(default_token_limit())
    }
}

impl ChatMemoryBuffer {
    /// Creates an empty buffer with the given token budget.
    #[must_use]
    pub fn new(token_limit: usize) -> Self {
        Self {
            token_limit,
            messages: Vec::new(),
        }
    }

    /// Returns the token budget.
    #[must_use]
    pub fn token_limit(&self) -> usize {
        self.token_limit
    }

    /// Appends a message.
    pub fn put(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Returns the newest messages whose estimated size fits the budget.
    ///
    /// The window never starts with an assistant message, so the history
    /// handed to a model always opens with the user's side of a turn.
    #[must_use]
    pub fn get(&self) -> Vec<ChatMessage> {
        let mut used = 0;
        let mut start = self.messages.len();
        for (idx, message) in self.messages.iter().enumerate().rev() {
            let cost = estimate_tokens(message);
            if used + cost > self.token_limit {
                break;
            }
            used += cost;
            start = idx;
        }

        while start < self.messages.len() && self.messages[start].role == MessageRole::Assistant {
            start += 1;
        }
        self.messages[start..].to_vec()
    }

    /// Returns the full history.
    #[must_use]
    pub fn get_all(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Returns the number of stored messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Forgets the history.
    pub fn reset(&mut self) {
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_get_returns_everything_under_budget() {
        let mut memory = ChatMemoryBuffer::default();
        memory.put(ChatMessage::user("what is 103223+320292"));
        memory.put(ChatMessage::assistant("423515"));

        assert_eq!(memory.get().len(), 2);
        assert_eq!(memory.len(), 2);
    }

    #[test]
    fn test_get_drops_oldest_turns() {
        let mut memory = ChatMemoryBuffer::new(10);
        memory.put(ChatMessage::user("a".repeat(40)));
        memory.put(ChatMessage::assistant("b".repeat(8)));
        memory.put(ChatMessage::user("c".repeat(8)));

        let window = memory.get();
        assert_eq!(window, vec![ChatMessage::user("c".repeat(8))]);
        assert_eq!(memory.get_all().len(), 3);
    }

    #[test]
    fn test_round_trips_through_json() {
        let mut memory = ChatMemoryBuffer::new(50);
        memory.put(ChatMessage::user("hi"));

        let json = serde_json::to_value(&memory).unwrap();
        let back: ChatMemoryBuffer = serde_json::from_value(json).unwrap();
        assert_eq!(back, memory);
    }

    #[test]
    fn test_reset() {
        let mut memory = ChatMemoryBuffer::default();
        memory.put(ChatMessage::user("hi"));
        memory.reset();
        assert!(memory.is_empty());
    }
}
