use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

mod filters;
mod input;

pub use filters::{
    DEFAULT_PAGE_SIZE, Filters, FiltersPatch, PageRequest, Pagination, SortBy, SortOrder, Stats,
    StatusFilter,
};
pub use input::{CreateTodoInput, TITLE_MAX_LEN, UpdateTodoInput, ValidationError};

/// Server-assigned identifier of a todo.
///
/// The remote API hands out integer keys, but views tend to pass ids around
/// as strings. Both forms are normalized here so the rest of the code only
/// ever compares `TodoId`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawId", into = "i64")]
pub struct TodoId(i64);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid todo id: {0:?}")]
pub struct InvalidTodoId(pub String);

impl TodoId {
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for TodoId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<u32> for TodoId {
    fn from(id: u32) -> Self {
        Self(i64::from(id))
    }
}

impl From<TodoId> for i64 {
    fn from(id: TodoId) -> Self {
        id.0
    }
}

impl FromStr for TodoId {
    type Err = InvalidTodoId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<i64>() {
            Ok(id) if id > 0 => Ok(Self(id)),
            _ => Err(InvalidTodoId(s.to_string())),
        }
    }
}

impl TryFrom<&str> for TodoId {
    type Error = InvalidTodoId;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl TryFrom<String> for TodoId {
    type Error = InvalidTodoId;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Accepts `7` as well as `"7"` on the wire.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(i64),
    Text(String),
}

impl TryFrom<RawId> for TodoId {
    type Error = InvalidTodoId;

    fn try_from(raw: RawId) -> Result<Self, Self::Error> {
        match raw {
            RawId::Number(id) if id > 0 => Ok(Self(id)),
            RawId::Number(id) => Err(InvalidTodoId(id.to_string())),
            RawId::Text(text) => text.parse(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TodoStatus {
    pub fn is_completed(self) -> bool {
        self == TodoStatus::Completed
    }
}

impl fmt::Display for TodoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TodoStatus::Pending => "pending",
            TodoStatus::InProgress => "in_progress",
            TodoStatus::Completed => "completed",
        };
        f.write_str(label)
    }
}

/// A single task as the store sees it.
///
/// `is_completed` mirrors `status == Completed` and `completed_at` is only
/// present while completed. Go through the `mark_*`/`set_status` methods to
/// keep that true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: TodoId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: TodoStatus,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Todo {
    pub fn new(id: TodoId, title: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            title: title.into(),
            description: String::new(),
            status: TodoStatus::Pending,
            is_completed: false,
            created_at,
            completed_at: None,
        }
    }

    /// Moves the todo to `status`. Re-entering the current status is a no-op,
    /// so an already completed todo keeps its original `completed_at`.
    pub fn set_status(&mut self, status: TodoStatus, at: DateTime<Utc>) {
        if self.status == status {
            return;
        }
        self.status = status;
        self.is_completed = status.is_completed();
        self.completed_at = if self.is_completed { Some(at) } else { None };
    }

    pub fn mark_completed(&mut self, at: DateTime<Utc>) {
        self.set_status(TodoStatus::Completed, at);
    }

    pub fn mark_pending(&mut self) {
        self.status = TodoStatus::Pending;
        self.is_completed = false;
        self.completed_at = None;
    }

    /// Returns a copy with the completion flag flipped: completed todos go
    /// back to pending, anything else becomes completed.
    pub fn toggled(&self, at: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        if self.is_completed {
            next.mark_pending();
        } else {
            next.mark_completed(at);
        }
        next
    }

    pub fn is_consistent(&self) -> bool {
        self.is_completed == self.status.is_completed()
            && self.completed_at.is_some() == self.is_completed
    }
}
