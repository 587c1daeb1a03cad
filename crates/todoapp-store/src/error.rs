//! Failure normalization.
//!
//! Every rejected gateway call ends up here before it reaches the store
//! state, so the view layer only ever sees a [`StoreError`] with a message it
//! can render as-is.

use std::fmt;

use crate::gateway::GatewayError;

pub const FETCH_FAILED: &str = "Failed to fetch todos";
pub const CREATE_FAILED: &str = "Failed to create todo";
pub const UPDATE_FAILED: &str = "Failed to update todo";
pub const DELETE_FAILED: &str = "Failed to delete todo";
pub const TOGGLE_FAILED: &str = "Failed to toggle todo status";
pub const COMPLETE_FAILED: &str = "Failed to complete todo";

/// Displayable error kept in the store until cleared or overwritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    pub message: String,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Picks the most useful text out of a gateway failure, or `fallback` when
/// it carries none.
pub fn normalize_error(err: &GatewayError, fallback: &str) -> StoreError {
    match err.message.as_deref().map(str::trim) {
        Some(message) if !message.is_empty() => StoreError::new(message),
        _ => StoreError::new(fallback),
    }
}
