//! Shared test helpers.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use prompt_relay::backend::{ChatBackend, ChatRequest, ChatResponse, RateLimit, ResponseMetadata};
use prompt_relay::BackendError;

/// Scripted reply for [`ScriptedBackend`].
pub enum Step {
    /// Answer with this text.
    Reply(&'static str),
    /// Answer with the last user message, prefixed with "echo: ".
    Echo,
    /// Fail with an HTTP 500 from upstream.
    Fail,
    /// Answer with an empty message.
    Empty,
    /// Sleep before echoing.
    Delay(Duration),
}

/// Backend that plays back scripted steps and records every request. Once
/// the script is exhausted it echoes.
pub struct ScriptedBackend {
    name: &'static str,
    steps: Mutex<VecDeque<Step>>,
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedBackend {
    pub fn new(name: &'static str, steps: Vec<Step>) -> Self {
        Self {
            name,
            steps: Mutex::new(steps.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn echo(name: &'static str) -> Self {
        Self::new(name, Vec::new())
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<ChatRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        self.name
    }

    fn model(&self) -> &str {
        "scripted-1"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, BackendError> {
        let step = self.steps.lock().unwrap().pop_front().unwrap_or(Step::Echo);
        let last = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.requests.lock().unwrap().push(request);

        let content = match step {
            Step::Reply(text) => text.to_string(),
            Step::Echo => format!("echo: {last}"),
            Step::Fail => {
                return Err(BackendError::Status {
                    backend: self.name,
                    status: 500,
                    body: "upstream exploded".to_string(),
                })
            }
            Step::Empty => return Err(BackendError::EmptyResponse { backend: self.name }),
            Step::Delay(duration) => {
                tokio::time::sleep(duration).await;
                format!("echo: {last}")
            }
        };

        Ok(ChatResponse {
            content,
            metadata: ResponseMetadata {
                model: "scripted-1".to_string(),
                rate_limit: RateLimit {
                    requests_limit: Some(100),
                    ..Default::default()
                },
                usage: None,
            },
        })
    }
}
