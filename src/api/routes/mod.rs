//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`comments`] - Remote comment sync and stored comment lookup
//! - [`system`] - Health and OpenAPI

mod comments;
mod system;

// Re-export all handlers so `routes::function_name` works
pub use comments::*;
pub use system::*;
