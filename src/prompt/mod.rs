//! Prompt templating.
//!
//! - [`template`]: `{name}` placeholder substitution
//! - [`library`]: templates shipped with the relay

pub mod library;
pub mod template;

pub use template::{render, PlaceholderValues, PromptTemplate, RenderedPrompt};
