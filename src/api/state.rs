//! Application state for the API server

use crate::CommentSync;
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clone).
#[derive(Clone)]
pub struct AppState {
    /// The comment sync service
    pub sync: Arc<CommentSync>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(sync: Arc<CommentSync>) -> Self {
        Self { sync }
    }
}
