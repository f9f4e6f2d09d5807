//! Ollama chat backend.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::{
    build_http_client, check_status, read_json, ChatBackend, ChatRequest, ChatResponse,
    RateLimit, ResponseMetadata, Usage,
};
use crate::config::OllamaConfig;
use crate::error::BackendError;

const NAME: &str = "Ollama";

/// Client for a local Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaBackend {
    client: Client,
    base_url: String,
    model: String,
    temperature: Option<f32>,
}

impl OllamaBackend {
    pub fn new(config: &OllamaConfig) -> Result<Self, BackendError> {
        Ok(Self {
            client: build_http_client(NAME)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Serialize)]
struct OllamaMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    model: String,
    #[serde(default)]
    message: Option<OllamaResponseMessage>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Deserialize)]
struct OllamaResponseMessage {
    #[serde(default)]
    content: String,
}

#[async_trait]
impl ChatBackend for OllamaBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, BackendError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = OllamaChatRequest {
            model: &self.model,
            messages: request
                .messages
                .iter()
                .map(|turn| OllamaMessage {
                    role: turn.role.as_str(),
                    content: &turn.content,
                })
                .collect(),
            stream: false,
            options: self.temperature.map(|temperature| OllamaOptions { temperature }),
        };

        debug!(model = %self.model, messages = body.messages.len(), "Sending Ollama chat request");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|source| BackendError::Request { backend: NAME, source })?;
        let response = check_status(response, NAME).await?;

        let parsed: OllamaChatResponse = read_json(response, NAME).await?;

        let content = parsed.message.map(|m| m.content).unwrap_or_default();
        if content.trim().is_empty() {
            return Err(BackendError::EmptyResponse { backend: NAME });
        }

        let usage = match (parsed.prompt_eval_count, parsed.eval_count) {
            (None, None) => None,
            (prompt, completion) => {
                let prompt_tokens = prompt.unwrap_or(0);
                let completion_tokens = completion.unwrap_or(0);
                Some(Usage {
                    prompt_tokens,
                    completion_tokens,
                    total_tokens: prompt_tokens.saturating_add(completion_tokens),
                })
            }
        };

        Ok(ChatResponse {
            content,
            metadata: ResponseMetadata {
                model: parsed.model,
                rate_limit: RateLimit::default(),
                usage,
            },
        })
    }
}
