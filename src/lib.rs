//! prompt-relay: HTTP relay for Ollama and OpenAI chat models.
//!
//! Prompts arrive over HTTP, are optionally rendered from a template and
//! enriched with a bounded window of earlier turns, then forwarded to a
//! remote chat model:
//!   request → [`prompt`] → [`memory`] → [`backend`] → [`memory`] → response
//!
//! The templating and memory core is synchronous and free of I/O; the
//! [`chat`] service and [`server`] handle the network side.

pub mod backend;
pub mod chat;
pub mod config;
pub mod error;
pub mod memory;
pub mod metrics;
pub mod prompt;
pub mod server;

pub use error::{BackendError, ChatError, CoreError};
