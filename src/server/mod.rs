//! HTTP server exposing the relay endpoints.
//!
//! - [`routes`]: AppState, router and route handlers
//! - [`error`]: error to status-code mapping

pub mod error;
pub mod routes;
