//! Chat service composing the prompt renderer, conversation memory and a
//! remote backend.

pub mod service;

pub use service::ChatService;
