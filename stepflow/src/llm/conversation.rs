//! Multi-turn chat over an [`LlmClient`].

use std::sync::Arc;

use super::client::LlmClient;
use super::types::{ChatMessage, MessageRole};
use crate::errors::LlmError;

/// A running conversation.
///
/// Each call to [`Conversation::send`] appends the user message and the
/// assistant reply, so later turns see the earlier ones.
#[derive(Debug, Clone)]
pub struct Conversation {
    client: Arc<dyn LlmClient>,
    messages: Vec<ChatMessage>,
}

impl Conversation {
    /// Starts an empty conversation.
    #[must_use]
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            messages: Vec::new(),
        }
    }

    /// Starts a conversation framed by a system prompt.
    #[must_use]
    pub fn with_system(mut self, prompt: impl Into<String>) -> Self {
        self.messages.retain(|m| m.role != MessageRole::System);
        self.messages.insert(0, ChatMessage::system(prompt));
        self
    }

    /// Sends a user turn and returns the reply.
    ///
    /// On failure the user turn is not kept.
    pub async fn send(&mut self, text: impl Into<String>) -> Result<String, LlmError> {
        self.messages.push(ChatMessage::user(text));
        match self.client.chat(&self.messages).await {
            Ok(response) => {
                let reply = response.message.content;
                self.messages.push(ChatMessage::assistant(reply.clone()));
                Ok(reply)
            }
            Err(err) => {
                self.messages.pop();
                Err(err)
            }
        }
    }

    /// Returns every message so far.
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Returns the number of completed user turns.
    #[must_use]
    pub fn turns(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role == MessageRole::Assistant)
            .count()
    }

    /// Forgets all turns, keeping the system prompt.
    pub fn clear(&mut self) {
        self.messages.retain(|m| m.role == MessageRole::System);
    }
}
