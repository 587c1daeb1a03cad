use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use todoapp_model::{
    CreateTodoInput, Filters, PageRequest, SortBy, SortOrder, StatusFilter, Todo, TodoId,
    TodoStatus, UpdateTodoInput,
};

/// Status codes as the task API spells them
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TaskStatus {
    #[serde(rename = "pendiente")]
    Pending,
    #[serde(rename = "en_progreso")]
    InProgress,
    #[serde(rename = "completada")]
    Completed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pendiente",
            TaskStatus::InProgress => "en_progreso",
            TaskStatus::Completed => "completada",
        }
    }
}

impl From<TodoStatus> for TaskStatus {
    fn from(status: TodoStatus) -> Self {
        match status {
            TodoStatus::Pending => TaskStatus::Pending,
            TodoStatus::InProgress => TaskStatus::InProgress,
            TodoStatus::Completed => TaskStatus::Completed,
        }
    }
}

impl From<TaskStatus> for TodoStatus {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Pending => TodoStatus::Pending,
            TaskStatus::InProgress => TodoStatus::InProgress,
            TaskStatus::Completed => TodoStatus::Completed,
        }
    }
}

/// A task as returned by the API (detail and list representations)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskDto {
    pub id: TodoId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: TaskStatus,
    #[serde(default)]
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Page-number paginated list response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskPage {
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<TaskDto>,
}

/// Request to create a new task
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TaskStatus,
}

/// Partial update of an existing task
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UpdateTaskRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
}

/// Body of the change-status action
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangeStatusRequest {
    pub status: TaskStatus,
}

impl From<TodoStatus> for ChangeStatusRequest {
    fn from(status: TodoStatus) -> Self {
        ChangeStatusRequest {
            status: status.into(),
        }
    }
}

/// Error body. The API answers with `detail`, other layers with `message`,
/// and serializer failures with messages keyed by field name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl ErrorBody {
    pub fn message(&self) -> Option<&str> {
        non_blank(self.detail.as_deref())
            .or_else(|| non_blank(self.message.as_deref()))
            .or_else(|| self.fields.values().find_map(first_text))
    }
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.filter(|text| !text.trim().is_empty())
}

// `"text"` or the first entry of `["text", ...]`
fn first_text(value: &Value) -> Option<&str> {
    match value {
        Value::String(text) => non_blank(Some(text.as_str())),
        Value::Array(items) => items.iter().find_map(first_text),
        _ => None,
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConversionError {
    #[error("task {0} has an empty title")]
    EmptyTitle(TodoId),
}

impl TryFrom<TaskDto> for Todo {
    type Error = ConversionError;

    fn try_from(dto: TaskDto) -> Result<Self, Self::Error> {
        if dto.title.trim().is_empty() {
            return Err(ConversionError::EmptyTitle(dto.id));
        }
        let status = TodoStatus::from(dto.status);
        let is_completed = status.is_completed();
        let completed_at = if is_completed {
            // Older rows may lack the timestamp; fall back to the last write
            dto.completed_at.or(dto.updated_at).or(Some(dto.created_at))
        } else {
            None
        };
        Ok(Todo {
            id: dto.id,
            title: dto.title,
            description: dto.description.unwrap_or_default(),
            status,
            is_completed,
            created_at: dto.created_at,
            completed_at,
        })
    }
}

impl From<&CreateTodoInput> for CreateTaskRequest {
    fn from(input: &CreateTodoInput) -> Self {
        CreateTaskRequest {
            title: input.title.trim().to_string(),
            description: input
                .description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            status: input.status.unwrap_or_default().into(),
        }
    }
}

impl From<&UpdateTodoInput> for UpdateTaskRequest {
    fn from(input: &UpdateTodoInput) -> Self {
        // The API has no completion flag
        UpdateTaskRequest {
            title: input.title.as_ref().map(|t| t.trim().to_string()),
            description: input.description.clone(),
            status: input.target_status().map(TaskStatus::from),
        }
    }
}

/// Query string pairs for `GET /tasks/`
pub fn list_query(filters: &Filters, page: PageRequest) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("page", page.page.to_string()),
        ("page_size", page.limit.to_string()),
    ];
    match filters.status {
        StatusFilter::All => {}
        StatusFilter::Pending => query.push(("status", TaskStatus::Pending.as_str().to_string())),
        StatusFilter::Completed => {
            query.push(("status", TaskStatus::Completed.as_str().to_string()))
        }
    }
    if let Some(search) = filters.search.as_deref().map(str::trim) {
        if !search.is_empty() {
            query.push(("search", search.to_string()));
        }
    }
    let field = match filters.sort_by {
        SortBy::CreatedAt => "created_at",
        SortBy::Title => "title",
    };
    let ordering = match filters.sort_order {
        SortOrder::Asc => field.to_string(),
        SortOrder::Desc => format!("-{field}"),
    };
    query.push(("ordering", ordering));
    query
}

#[cfg(test)]
mod tests {
    use super::*;
    use todoapp_model::FiltersPatch;

    const TASK_JSON: &str = r#"{
        "id": 7,
        "title": "Buy milk",
        "description": null,
        "status": "completada",
        "status_display": "Completada",
        "is_completed": true,
        "created_at": "2024-01-01T10:00:00Z",
        "updated_at": "2024-01-02T10:00:00Z",
        "completed_at": "2024-01-02T10:00:00Z"
    }"#;

    #[test]
    fn test_task_into_todo() {
        let dto: TaskDto = serde_json::from_str(TASK_JSON).unwrap();
        let todo = Todo::try_from(dto).unwrap();

        assert_eq!(todo.id, TodoId::new(7));
        assert_eq!(todo.status, TodoStatus::Completed);
        assert!(todo.is_completed);
        assert!(todo.description.is_empty());
        assert!(todo.is_consistent());
    }

    #[test]
    fn test_status_wins_over_stale_flags() {
        let json = r#"{
            "id": "3",
            "title": "Write report",
            "status": "en_progreso",
            "is_completed": true,
            "created_at": "2024-01-01T10:00:00Z",
            "completed_at": "2024-01-02T10:00:00Z"
        }"#;
        let todo = Todo::try_from(serde_json::from_str::<TaskDto>(json).unwrap()).unwrap();

        assert_eq!(todo.id, TodoId::new(3));
        assert_eq!(todo.status, TodoStatus::InProgress);
        assert!(!todo.is_completed);
        assert!(todo.completed_at.is_none());
    }

    #[test]
    fn test_empty_title_is_rejected() {
        let mut dto: TaskDto = serde_json::from_str(TASK_JSON).unwrap();
        dto.title = " ".to_string();
        assert_eq!(
            Todo::try_from(dto),
            Err(ConversionError::EmptyTitle(TodoId::new(7)))
        );
    }

    #[test]
    fn test_update_request_maps_completion_flag() {
        let body = serde_json::to_value(UpdateTaskRequest::from(&UpdateTodoInput::completion(
            true,
        )))
        .unwrap();
        assert_eq!(body, serde_json::json!({ "status": "completada" }));

        let explicit = UpdateTodoInput {
            status: Some(TodoStatus::InProgress),
            is_completed: Some(false),
            ..UpdateTodoInput::default()
        };
        assert_eq!(
            UpdateTaskRequest::from(&explicit).status,
            Some(TaskStatus::InProgress)
        );
    }

    #[test]
    fn test_create_request_defaults_to_pending() {
        let request = CreateTaskRequest::from(&CreateTodoInput::new("  Buy milk ").with_description(""));
        assert_eq!(request.title, "Buy milk");
        assert_eq!(request.status, TaskStatus::Pending);
        assert!(request.description.is_none());
    }

    #[test]
    fn test_list_query() {
        let filters = Filters::default()
            .merged(FiltersPatch::status(StatusFilter::Completed))
            .merged(FiltersPatch::search("milk"))
            .merged(FiltersPatch::sort(SortBy::Title, SortOrder::Asc));
        let query = list_query(&filters, PageRequest { page: 2, limit: 10 });

        assert_eq!(
            query,
            vec![
                ("page", "2".to_string()),
                ("page_size", "10".to_string()),
                ("status", "completada".to_string()),
                ("search", "milk".to_string()),
                ("ordering", "title".to_string()),
            ]
        );

        let default_query = list_query(&Filters::default(), PageRequest::default());
        assert!(default_query.contains(&("ordering", "-created_at".to_string())));
        assert!(!default_query.iter().any(|(key, _)| *key == "status"));
    }

    #[test]
    fn test_error_body_message() {
        let body: ErrorBody = serde_json::from_str(r#"{"detail": "Not found."}"#).unwrap();
        assert_eq!(body.message(), Some("Not found."));

        let body: ErrorBody = serde_json::from_str(r#"{"message": "boom", "code": "E1"}"#).unwrap();
        assert_eq!(body.message(), Some("boom"));

        assert_eq!(ErrorBody::default().message(), None);
    }

    #[test]
    fn test_error_body_skips_blank_detail() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"detail": "  ", "message": "boom"}"#).unwrap();
        assert_eq!(body.message(), Some("boom"));
    }

    #[test]
    fn test_error_body_reads_field_errors() {
        let body: ErrorBody = serde_json::from_str(
            r#"{"non_field_errors": "Solo se puede actualizar la descripción."}"#,
        )
        .unwrap();
        assert_eq!(
            body.message(),
            Some("Solo se puede actualizar la descripción.")
        );

        let body: ErrorBody = serde_json::from_str(
            r#"{"title": ["El título debe tener al menos 3 caracteres."]}"#,
        )
        .unwrap();
        assert_eq!(
            body.message(),
            Some("El título debe tener al menos 3 caracteres.")
        );

        let body: ErrorBody = serde_json::from_str(r#"{"count": 3}"#).unwrap();
        assert_eq!(body.message(), None);
    }

    #[test]
    fn test_change_status_request_body() {
        let body = serde_json::to_value(ChangeStatusRequest::from(TodoStatus::Pending)).unwrap();
        assert_eq!(body, serde_json::json!({ "status": "pendiente" }));
    }
}
