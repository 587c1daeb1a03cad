use crate::TodoStatus;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest title the task API accepts.
pub const TITLE_MAX_LEN: usize = 200;

/// Input rejected before any request is made.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Title is required")]
    EmptyTitle,

    #[error("Title cannot exceed {TITLE_MAX_LEN} characters")]
    TitleTooLong,

    #[error("A new todo cannot be created as completed")]
    CreatedCompleted,

    #[error("Nothing to update")]
    EmptyUpdate,
}

/// Request to create a new todo
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateTodoInput {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TodoStatus>,
}

impl CreateTodoInput {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_status(mut self, status: TodoStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title(&self.title)?;
        if self.status == Some(TodoStatus::Completed) {
            return Err(ValidationError::CreatedCompleted);
        }
        Ok(())
    }
}

/// Partial update of an existing todo. Absent fields stay as they are on
/// the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateTodoInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TodoStatus>,
    pub is_completed: Option<bool>,
}

impl UpdateTodoInput {
    pub fn completion(is_completed: bool) -> Self {
        Self {
            is_completed: Some(is_completed),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.is_completed.is_none()
    }

    /// The status this update asks for. An explicit status wins over the
    /// completion flag, and clearing the flag means pending.
    pub fn target_status(&self) -> Option<TodoStatus> {
        self.status.or(match self.is_completed {
            Some(true) => Some(TodoStatus::Completed),
            Some(false) => Some(TodoStatus::Pending),
            None => None,
        })
    }

    /// `Some` when the update changes nothing but the status.
    pub fn status_change(&self) -> Option<TodoStatus> {
        if self.title.is_some() || self.description.is_some() {
            return None;
        }
        self.target_status()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::EmptyUpdate);
        }
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        Ok(())
    }
}

fn validate_title(title: &str) -> Result<(), ValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    if trimmed.chars().count() > TITLE_MAX_LEN {
        return Err(ValidationError::TitleTooLong);
    }
    Ok(())
}
