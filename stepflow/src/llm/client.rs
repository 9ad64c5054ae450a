//! The language-model client trait.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::fmt::Debug;

use super::types::{ChatDelta, ChatMessage, ChatResponse, CompletionResponse};
use crate::errors::LlmError;

/// A stream of reply increments.
pub type ChatStream = BoxStream<'static, Result<ChatDelta, LlmError>>;

/// A chat-capable language model.
///
/// Clients are shared between steps as `Arc<dyn LlmClient>`.
#[async_trait]
pub trait LlmClient: Send + Sync + Debug {
    /// Returns the model name requests are sent to.
    fn model(&self) -> &str;

    /// Sends a conversation and returns the assistant reply.
    async fn chat(&self, messages: &[ChatMessage]) -> Result<ChatResponse, LlmError>;

    /// Completes a single prompt.
    ///
    /// The default implementation sends the prompt as one user message.
    async fn complete(&self, prompt: &str) -> Result<CompletionResponse, LlmError> {
        let response = self.chat(&[ChatMessage::user(prompt)]).await?;
        Ok(CompletionResponse {
            text: response.message.content,
            model: response.model,
            usage: response.usage,
        })
    }

    /// Streams the assistant reply.
    ///
    /// The default implementation yields the whole reply as one delta.
    async fn stream_chat(&self, messages: &[ChatMessage]) -> Result<ChatStream, LlmError> {
        let response = self.chat(messages).await?;
        let delta = ChatDelta::text(response.message.content)
            .with_finish_reason(response.finish_reason.unwrap_or_else(|| "stop".to_string()));
        Ok(stream::iter([Ok(delta)]).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Echo;

    #[async_trait]
    impl LlmClient for Echo {
        fn model(&self) -> &str {
            "echo"
        }

        async fn chat(&self, messages: &[ChatMessage]) -> Result<ChatResponse, LlmError> {
            let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            Ok(ChatResponse::assistant(last, "echo"))
        }
    }

    #[tokio::test]
    async fn test_default_complete_uses_chat() {
        let response = Echo.complete("hello").await.unwrap();
        assert_eq!(response.text, "hello");
        assert_eq!(response.model, "echo");
    }

    #[tokio::test]
    async fn test_default_stream_yields_one_delta() {
        let deltas: Vec<_> = Echo
            .stream_chat(&[ChatMessage::user("hi there")])
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(deltas.len(), 1);
        let delta = deltas[0].as_ref().unwrap();
        assert_eq!(delta.delta, "hi there");
        assert!(delta.is_final());
    }
}
