//! Mapping of relay errors onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::error::{BackendError, ChatError, CoreError};

/// Error returned by route handlers. The body is the error message as plain
/// text.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error("{0}")]
    Internal(String),
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self::Chat(ChatError::Core(err))
    }
}

impl From<BackendError> for ApiError {
    fn from(err: BackendError) -> Self {
        Self::Chat(ChatError::Backend(err))
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Chat(ChatError::Core(_)) => StatusCode::BAD_REQUEST,
            Self::Chat(ChatError::Backend(err)) => match err {
                BackendError::Request { .. }
                | BackendError::Status { .. }
                | BackendError::Decode { .. } => StatusCode::BAD_GATEWAY,
                BackendError::EmptyResponse { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                BackendError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                BackendError::NotConfigured { .. } => StatusCode::SERVICE_UNAVAILABLE,
            },
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Label used for the request outcome metric.
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Chat(ChatError::Core(_)) => "invalid_request",
            Self::Chat(ChatError::Backend(BackendError::Timeout { .. })) => "timeout",
            Self::Chat(ChatError::Backend(BackendError::EmptyResponse { .. })) => "empty",
            Self::Chat(ChatError::Backend(_)) => "backend_error",
            Self::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}
