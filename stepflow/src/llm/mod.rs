//! Language-model clients.
//!
//! Steps receive an `Arc<dyn LlmClient>` through their constructors:
//! - [`ScriptedLlm`] replays canned replies and records prompts
//! - `OpenAiClient` (feature `openai`) talks to an OpenAI-compatible API
//! - [`Conversation`] keeps multi-turn history on top of either

mod client;
mod config;
mod conversation;
mod memory;
#[cfg(feature = "openai")]
mod openai;
mod retry;
mod scripted;
pub mod sse;
mod types;

pub use client::{ChatStream, LlmClient};
pub use config::{LlmConfig, API_KEY_ENV, BASE_URL_ENV, MODEL_ENV};
pub use conversation::Conversation;
pub use memory::{estimate_tokens, ChatMemoryBuffer};
#[cfg(feature = "openai")]
pub use openai::OpenAiClient;
pub use retry::{with_retry, BackoffStrategy, JitterStrategy, RetryConfig};
pub use scripted::ScriptedLlm;
pub use types::{ChatDelta, ChatMessage, ChatResponse, CompletionResponse, MessageRole, TokenUsage};
