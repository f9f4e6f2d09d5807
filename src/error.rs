//! Error types for each layer of the relay.
//!
//! - [`CoreError`]: deterministic failures of the templating/memory core
//! - [`BackendError`]: failures talking to a remote LLM service
//! - [`ChatError`]: either of the above, as seen by the chat service

use std::time::Duration;

/// Errors raised by the template renderer and the conversation memory.
///
/// None of these are retried: they depend only on their inputs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// Structural defect in a template string.
    #[error("malformed template at byte {position}: {reason}")]
    MalformedTemplate { position: usize, reason: String },

    /// A placeholder in the template has no value.
    #[error("missing value for placeholder `{name}`")]
    MissingPlaceholderValue { name: String },

    /// A window bound that is zero or negative.
    #[error("invalid window capacity {requested}: must be a positive integer")]
    InvalidCapacity { requested: i64 },
}

impl CoreError {
    pub(crate) fn malformed<S: Into<String>>(position: usize, reason: S) -> Self {
        Self::MalformedTemplate {
            position,
            reason: reason.into(),
        }
    }
}

/// Errors raised by a remote chat backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The request could not be sent or the connection failed.
    #[error("{backend} request failed: {source}")]
    Request {
        backend: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status.
    #[error("{backend} returned HTTP {status}: {body}")]
    Status {
        backend: &'static str,
        status: u16,
        body: String,
    },

    /// The response body did not match the expected schema.
    #[error("{backend} response could not be decoded: {message}")]
    Decode {
        backend: &'static str,
        message: String,
    },

    /// The service answered but produced no text.
    #[error("No response from {backend} API")]
    EmptyResponse { backend: &'static str },

    /// The call did not complete within the configured timeout.
    #[error("{backend} call timed out after {elapsed:?}")]
    Timeout {
        backend: &'static str,
        elapsed: Duration,
    },

    /// The backend is not available (e.g. missing API key).
    #[error("{backend} backend is not configured: {reason}")]
    NotConfigured {
        backend: &'static str,
        reason: String,
    },
}

/// Errors surfaced by the chat service.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Truncate an error body so large upstream pages do not end up in logs.
pub(crate) fn truncate_body(body: String) -> String {
    const MAX_ERROR_BODY: usize = 512;
    if body.len() <= MAX_ERROR_BODY {
        return body;
    }
    let mut cut = MAX_ERROR_BODY;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}... [truncated]", &body[..cut])
}
