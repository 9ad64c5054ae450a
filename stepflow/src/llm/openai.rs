//! OpenAI-compatible chat-completions client.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};

use super::client::{ChatStream, LlmClient};
use super::config::LlmConfig;
use super::retry::with_retry;
use super::sse::{SseFrame, SseParser};
use super::types::{ChatDelta, ChatMessage, ChatResponse, TokenUsage};
use crate::errors::LlmError;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    model: String,
    choices: Vec<CompletionChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: WireMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

fn parse_completion(body: &str) -> Result<ChatResponse, LlmError> {
    let completion: ChatCompletion =
        serde_json::from_str(body).map_err(|e| LlmError::Decode(e.to_string()))?;
    let choice = completion
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::Decode("response contained no choices".to_string()))?;

    Ok(ChatResponse {
        message: ChatMessage::assistant(choice.message.content.unwrap_or_default()),
        model: completion.model,
        finish_reason: choice.finish_reason,
        usage: completion.usage.map(|u| TokenUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        }),
    })
}

/// Turns one SSE frame into a delta. Role-only and empty chunks yield `None`.
fn decode_frame(frame: SseFrame) -> Option<Result<ChatDelta, LlmError>> {
    let SseFrame::Data(data) = frame else {
        return None;
    };
    let chunk: StreamChunk = match serde_json::from_str(&data) {
        Ok(chunk) => chunk,
        Err(e) => return Some(Err(LlmError::Decode(e.to_string()))),
    };
    let choice = chunk.choices.into_iter().next()?;
    if choice.delta.content.is_none() && choice.finish_reason.is_none() {
        return None;
    }
    Some(Ok(ChatDelta {
        delta: choice.delta.content.unwrap_or_default(),
        finish_reason: choice.finish_reason,
    }))
}

fn parse_embeddings(body: &str, expected: usize) -> Result<Vec<Vec<f32>>, LlmError> {
    let mut response: EmbeddingResponse =
        serde_json::from_str(body).map_err(|e| LlmError::Decode(e.to_string()))?;
    if response.data.len() != expected {
        return Err(LlmError::Decode(format!(
            "expected {expected} embeddings, got {}",
            response.data.len()
        )));
    }
    response.data.sort_by_key(|d| d.index);
    Ok(response.data.into_iter().map(|d| d.embedding).collect())
}

/// Client for the `/chat/completions` and `/embeddings` endpoints.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    config: LlmConfig,
    http: reqwest::Client,
}

impl OpenAiClient {
    /// Creates a client from explicit settings.
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        if config.api_key.is_empty() {
            return Err(LlmError::Config("API key is empty".to_string()));
        }
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| LlmError::Config(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    /// Creates a client configured from the environment.
    pub fn from_env() -> Result<Self, LlmError> {
        Self::new(LlmConfig::from_env()?)
    }

    /// Returns the settings.
    #[must_use]
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    async fn post<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, LlmError> {
        let response = self
            .http
            .post(self.config.endpoint(path))
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(LlmError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn post_for_text<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<String, LlmError> {
        self.post(path, body)
            .await?
            .text()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))
    }

    fn chat_request<'a>(&'a self, messages: &'a [ChatMessage], stream: bool) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            stream,
        }
    }

    /// Embeds `texts` with the configured embedding model, in input order.
    pub async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let request = EmbeddingRequest {
            model: &self.config.embedding_model,
            input: texts,
        };
        let body = with_retry(&self.config.retry, || self.post_for_text("embeddings", &request)).await?;
        parse_embeddings(&body, texts.len())
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn model(&self) -> &str {
        &self.config.model
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Result<ChatResponse, LlmError> {
        let request = self.chat_request(messages, false);
        let started = std::time::Instant::now();
        let body = with_retry(&self.config.retry, || self.post_for_text("chat/completions", &request))
            .await?;
        let response = parse_completion(&body)?;

        tracing::debug!(
            model = %response.model,
            latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            output_tokens = response.usage.map(|u| u.output_tokens),
            "Chat completion received"
        );
        Ok(response)
    }

    async fn stream_chat(&self, messages: &[ChatMessage]) -> Result<ChatStream, LlmError> {
        let request = self.chat_request(messages, true);
        let response = with_retry(&self.config.retry, || self.post("chat/completions", &request)).await?;

        let deltas = response
            .bytes_stream()
            .scan(SseParser::new(), |parser, chunk| {
                let items: Vec<Result<ChatDelta, LlmError>> = match chunk {
                    Ok(bytes) => parser.push(&bytes).into_iter().filter_map(decode_frame).collect(),
                    Err(e) => vec![Err(LlmError::Transport(e.to_string()))],
                };
                futures::future::ready(Some(stream::iter(items)))
            })
            .flatten();
        Ok(deltas.boxed())
    }
}
