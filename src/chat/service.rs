//! Chat orchestration: template → memory → remote model → memory.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::backend::{ChatBackend, ChatRequest, ChatResponse};
use crate::error::{BackendError, ChatError};
use crate::memory::{ConversationId, ConversationMemory, MessageTurn};
use crate::prompt::{PlaceholderValues, PromptTemplate};

/// One remote backend plus the shared conversation memory.
///
/// Turns are recorded only after the backend answers successfully: a failed,
/// timed-out or cancelled call leaves the conversation untouched.
#[derive(Clone)]
pub struct ChatService {
    backend: Arc<dyn ChatBackend>,
    memory: Arc<ConversationMemory>,
    timeout: Duration,
}

impl ChatService {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        memory: Arc<ConversationMemory>,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            memory,
            timeout,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn model(&self) -> &str {
        self.backend.model()
    }

    pub fn memory(&self) -> &Arc<ConversationMemory> {
        &self.memory
    }

    /// Send a single prompt without conversation context.
    pub async fn call(&self, prompt: &str) -> Result<ChatResponse, ChatError> {
        Ok(self.send(ChatRequest::prompt(prompt)).await?)
    }

    /// Render `template` with `values` and send the result.
    pub async fn call_template<V>(
        &self,
        template: &PromptTemplate,
        values: &V,
    ) -> Result<ChatResponse, ChatError>
    where
        V: PlaceholderValues + Sync + ?Sized,
    {
        let prompt = template.render(values)?;
        self.call(prompt.as_str()).await
    }

    /// Send `prompt` with the conversation's window as context, then record
    /// the exchange.
    pub async fn converse(
        &self,
        conversation: &ConversationId,
        prompt: &str,
    ) -> Result<ChatResponse, ChatError> {
        let mut messages = self.memory.snapshot(conversation);
        let history = messages.len();
        messages.push(MessageTurn::user(prompt));

        debug!(
            conversation = %conversation,
            history,
            backend = self.backend_name(),
            "Sending prompt with conversation context"
        );

        let response = self.send(ChatRequest::new(messages)).await?;

        self.memory.append_all(
            conversation,
            [
                MessageTurn::user(prompt),
                MessageTurn::assistant(response.content.clone()),
            ],
        );
        Ok(response)
    }

    async fn send(&self, request: ChatRequest) -> Result<ChatResponse, BackendError> {
        let started = Instant::now();
        match tokio::time::timeout(self.timeout, self.backend.chat(request)).await {
            Ok(result) => result,
            Err(_) => {
                let elapsed = started.elapsed();
                warn!(backend = self.backend_name(), ?elapsed, "Remote model call timed out");
                Err(BackendError::Timeout {
                    backend: self.backend_name(),
                    elapsed,
                })
            }
        }
    }
}

impl std::fmt::Debug for ChatService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatService")
            .field("backend", &self.backend.name())
            .field("model", &self.backend.model())
            .field("timeout", &self.timeout)
            .finish()
    }
}
