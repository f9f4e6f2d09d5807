//! Remote chat-model backends.
//!
//! - [`ollama`]: local Ollama server (`/api/chat`)
//! - [`openai`]: OpenAI-compatible chat completions API
//!
//! Backends are injected into the chat service as `Arc<dyn ChatBackend>`.

pub mod ollama;
pub mod openai;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{truncate_body, BackendError};
use crate::memory::MessageTurn;

pub use ollama::OllamaBackend;
pub use openai::OpenAiBackend;

/// Messages sent to a backend: memory context followed by the new prompt.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub messages: Vec<MessageTurn>,
}

impl ChatRequest {
    pub fn new(messages: Vec<MessageTurn>) -> Self {
        Self { messages }
    }

    /// A single user prompt with no history.
    pub fn prompt(text: impl Into<String>) -> Self {
        Self {
            messages: vec![MessageTurn::user(text)],
        }
    }
}

/// Generated text and the metadata reported alongside it.
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub content: String,
    pub metadata: ResponseMetadata,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ResponseMetadata {
    /// Model that produced the response, as reported by the service.
    pub model: String,
    pub rate_limit: RateLimit,
    pub usage: Option<Usage>,
}

/// Rate-limit counters. Services that do not report them leave every field
/// empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RateLimit {
    pub requests_limit: Option<u64>,
    pub requests_remaining: Option<u64>,
    pub tokens_limit: Option<u64>,
    pub tokens_remaining: Option<u64>,
}

impl RateLimit {
    /// Read the `x-ratelimit-*` headers used by OpenAI-compatible services.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            requests_limit: header_u64(headers, "x-ratelimit-limit-requests"),
            requests_remaining: header_u64(headers, "x-ratelimit-remaining-requests"),
            tokens_limit: header_u64(headers, "x-ratelimit-limit-tokens"),
            tokens_remaining: header_u64(headers, "x-ratelimit-remaining-tokens"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A remote chat model.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Display name used in errors, logs and metrics.
    fn name(&self) -> &'static str;

    /// Model requested from the service.
    fn model(&self) -> &str;

    /// Send the conversation and wait for the reply.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, BackendError>;
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
}

/// Shared HTTP client for backends. The overall deadline is applied by the
/// chat service, so only connection setup is bounded here.
pub(crate) fn build_http_client(backend: &'static str) -> Result<Client, BackendError> {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()
        .map_err(|source| BackendError::Request { backend, source })
}

/// Turn a non-success response into [`BackendError::Status`].
pub(crate) async fn check_status(
    response: Response,
    backend: &'static str,
) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(BackendError::Status {
        backend,
        status: status.as_u16(),
        body: truncate_body(body),
    })
}

/// Read the whole body, then decode it. A failed read is a transport error,
/// a body that does not parse is a decode error.
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: Response,
    backend: &'static str,
) -> Result<T, BackendError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|source| BackendError::Request { backend, source })?;
    serde_json::from_slice(&bytes).map_err(|e| BackendError::Decode {
        backend,
        message: e.to_string(),
    })
}
