//! OpenAI chat completions backend.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::{
    build_http_client, check_status, read_json, ChatBackend, ChatRequest, ChatResponse,
    RateLimit, ResponseMetadata, Usage,
};
use crate::config::OpenAiConfig;
use crate::error::BackendError;

const NAME: &str = "OpenAI";

/// Client for the OpenAI API or any compatible service.
#[derive(Clone)]
pub struct OpenAiBackend {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: Option<f32>,
}

impl OpenAiBackend {
    /// Fails with [`BackendError::NotConfigured`] when no API key is set in
    /// the config or the environment.
    pub fn new(config: &OpenAiConfig) -> Result<Self, BackendError> {
        let api_key = config
            .resolved_api_key()
            .ok_or_else(|| BackendError::NotConfigured {
                backend: NAME,
                reason: "no API key".to_string(),
            })?;

        Ok(Self {
            client: build_http_client(NAME)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }
}

// Keep the key out of debug output.
impl std::fmt::Debug for OpenAiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiBackend")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct OpenAiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    model: String,
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    fn name(&self) -> &'static str {
        NAME
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, BackendError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = OpenAiRequest {
            model: &self.model,
            messages: request
                .messages
                .iter()
                .map(|turn| OpenAiMessage {
                    role: turn.role.as_str(),
                    content: &turn.content,
                })
                .collect(),
            temperature: self.temperature,
        };

        debug!(model = %self.model, messages = body.messages.len(), "Sending OpenAI chat request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|source| BackendError::Request { backend: NAME, source })?;
        let response = check_status(response, NAME).await?;

        let rate_limit = RateLimit::from_headers(response.headers());
        let parsed: OpenAiResponse = read_json(response, NAME).await?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(BackendError::EmptyResponse { backend: NAME });
        }

        Ok(ChatResponse {
            content,
            metadata: ResponseMetadata {
                model: parsed.model,
                rate_limit,
                usage: parsed.usage.map(|u| Usage {
                    prompt_tokens: u.prompt_tokens,
                    completion_tokens: u.completion_tokens,
                    total_tokens: u.total_tokens,
                }),
            },
        })
    }
}
