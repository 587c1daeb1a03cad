use async_trait::async_trait;
use thiserror::Error;
use todoapp_model::{
    CreateTodoInput, Filters, PageRequest, Todo, TodoId, TodoStatus, UpdateTodoInput,
};

/// One page of todos as handed back by [`TodoGateway::list`]. `limit` is
/// the page size the server actually used, which may differ from the one
/// requested.
#[derive(Debug, Clone, PartialEq)]
pub struct ListPage {
    pub items: Vec<Todo>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

/// A rejected gateway call. Every field is optional: a transport failure has
/// no status, an unreadable error body has no message.
#[derive(Debug, Clone, Default, Error, PartialEq, Eq)]
#[error("{}", self.message.as_deref().unwrap_or("gateway request failed"))]
pub struct GatewayError {
    pub message: Option<String>,
    pub code: Option<String>,
    pub status: Option<u16>,
}

pub type GatewayResult<T> = Result<T, GatewayError>;

impl GatewayError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    /// A failure carrying nothing readable.
    pub fn unknown() -> Self {
        Self::default()
    }

    /// The request never produced a response.
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            code: Some("network_error".to_string()),
            status: None,
        }
    }

    pub fn http(status: u16, message: Option<String>, code: Option<String>) -> Self {
        Self {
            message,
            code,
            status: Some(status),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            code: Some("invalid_response".to_string()),
            status: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

/// Remote task service as the store consumes it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TodoGateway: Send + Sync {
    async fn list(&self, filters: &Filters, page: PageRequest) -> GatewayResult<ListPage>;

    async fn create(&self, input: &CreateTodoInput) -> GatewayResult<Todo>;

    /// Applies a partial update and returns the stored todo. A completed
    /// todo only accepts a new description this way.
    async fn update(&self, id: TodoId, input: &UpdateTodoInput) -> GatewayResult<Todo>;

    /// Moves a todo to `status`, including out of completed.
    async fn change_status(&self, id: TodoId, status: TodoStatus) -> GatewayResult<Todo>;

    /// Deletes a todo and echoes back its id.
    async fn delete(&self, id: TodoId) -> GatewayResult<TodoId>;

    /// Dedicated "mark completed" action.
    async fn complete(&self, id: TodoId) -> GatewayResult<Todo>;
}
