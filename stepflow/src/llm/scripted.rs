//! Deterministic in-process LLM client.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use std::collections::VecDeque;

use super::client::{ChatStream, LlmClient};
use super::types::{ChatDelta, ChatMessage, ChatResponse};
use crate::errors::LlmError;

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Status(u16),
}

/// An [`LlmClient`] that replays queued replies in order.
///
/// Every request is recorded so tests can inspect the prompts a step built.
/// When the queue is empty the fallback reply is used, or
/// [`LlmError::Exhausted`] is returned if none was set.
#[derive(Debug)]
pub struct ScriptedLlm {
    model: String,
    replies: Mutex<VecDeque<Reply>>,
    fallback: Option<String>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedLlm {
    /// Creates a client replaying `replies`.
    #[must_use]
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            model: "scripted".to_string(),
            replies: Mutex::new(replies.into_iter().map(|r| Reply::Text(r.into())).collect()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Creates a client that always answers `reply`.
    #[must_use]
    pub fn always(reply: impl Into<String>) -> Self {
        Self::new(Vec::<String>::new()).with_fallback(reply)
    }

    /// Sets the reply used once the queue is empty.
    #[must_use]
    pub fn with_fallback(mut self, reply: impl Into<String>) -> Self {
        self.fallback = Some(reply.into());
        self
    }

    /// Sets the reported model name.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Queues another reply.
    pub fn push(&self, reply: impl Into<String>) {
        self.replies.lock().push_back(Reply::Text(reply.into()));
    }

    /// Queues a provider error with the given HTTP status.
    pub fn push_status_error(&self, status: u16) {
        self.replies.lock().push_back(Reply::Status(status));
    }

    /// Returns every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().clone()
    }

    /// Returns the content of the last message of the last request.
    #[must_use]
    pub fn last_prompt(&self) -> Option<String> {
        self.requests
            .lock()
            .last()
            .and_then(|messages| messages.last())
            .map(|m| m.content.clone())
    }

    /// Returns the number of requests received.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Returns the number of queued replies left.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.replies.lock().len()
    }

    fn next_reply(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let request_number = {
            let mut requests = self.requests.lock();
            requests.push(messages.to_vec());
            requests.len()
        };

        match self.replies.lock().pop_front() {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Status(status)) => Err(LlmError::Status {
                status,
                body: "scripted failure".to_string(),
            }),
            None => self
                .fallback
                .clone()
                .ok_or(LlmError::Exhausted(request_number)),
        }
    }
}

/// Splits text into word-sized deltas that concatenate back to the input.
fn word_deltas(text: &str) -> Vec<ChatDelta> {
    let mut deltas: Vec<ChatDelta> = text.split_inclusive(' ').map(ChatDelta::text).collect();
    match deltas.last_mut() {
        Some(last) => last.finish_reason = Some("stop".to_string()),
        None => deltas.push(ChatDelta::text("").with_finish_reason("stop")),
    }
    deltas
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Result<ChatResponse, LlmError> {
        let text = self.next_reply(messages)?;
        Ok(ChatResponse::assistant(text, self.model.clone()))
    }

    async fn stream_chat(&self, messages: &[ChatMessage]) -> Result<ChatStream, LlmError> {
        let text = self.next_reply(messages)?;
        Ok(stream::iter(word_deltas(&text).into_iter().map(Ok)).boxed())
    }
}
