use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use todoapp_model::{
    CreateTodoInput, Filters, PageRequest, Todo, TodoId, TodoStatus, UpdateTodoInput,
};
use todoapp_transfer::{
    ChangeStatusRequest, CreateTaskRequest, ErrorBody, TaskDto, TaskPage, UpdateTaskRequest,
    list_query,
};
use tracing::{error, info};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::gateway::{GatewayError, GatewayResult, ListPage, TodoGateway};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// [`TodoGateway`] over the task REST API.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpGateway {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        let gateway = Self::new(&config.api_base);
        match &config.token {
            Some(token) => gateway.with_token(token.clone()),
            None => gateway,
        }
    }

    /// Bearer token sent with every request. Obtaining and refreshing it is
    /// up to the caller.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> (RequestBuilder, Uuid) {
        let request_id = Uuid::new_v4();
        let mut builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path))
            .header(REQUEST_ID_HEADER, request_id.to_string());
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        (builder, request_id)
    }

    async fn send(&self, builder: RequestBuilder, request_id: Uuid) -> GatewayResult<Response> {
        let response = builder.send().await.map_err(|e| {
            error!(error = %e, %request_id, "Request to task API failed");
            GatewayError::network(e.to_string())
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.json::<ErrorBody>().await.unwrap_or_default();
        error!(status = status.as_u16(), %request_id, "Task API rejected request");
        Err(GatewayError::http(
            status.as_u16(),
            body.message().map(str::to_string),
            body.code,
        ))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        request_id: Uuid,
    ) -> GatewayResult<T> {
        let response = self.send(builder, request_id).await?;
        response.json::<T>().await.map_err(|e| {
            error!(error = %e, %request_id, "Failed to deserialize task API response");
            GatewayError::decode(e.to_string())
        })
    }

    async fn send_task(&self, builder: RequestBuilder, request_id: Uuid) -> GatewayResult<Todo> {
        let task: TaskDto = self.send_json(builder, request_id).await?;
        into_todo(task)
    }
}

fn into_todo(task: TaskDto) -> GatewayResult<Todo> {
    Todo::try_from(task).map_err(|e| GatewayError::decode(e.to_string()))
}

/// Page size the server used for `body`. The server may ignore the
/// requested size, so it is read back from the page itself: a page with a
/// successor is full, and a last page `p` holds what is left after `p - 1`
/// full pages.
fn served_page_size(request: PageRequest, body: &TaskPage) -> u32 {
    let served = body.results.len() as u64;
    if served == 0 {
        return request.limit;
    }
    if body.next.is_some() {
        return u32::try_from(served).unwrap_or(request.limit);
    }
    if request.page > 1 {
        let before = u64::from(request.page - 1);
        let rest = body.count.saturating_sub(served);
        if rest > 0 && rest % before == 0 {
            return u32::try_from(rest / before).unwrap_or(request.limit);
        }
        return request.limit;
    }
    request.limit.max(u32::try_from(served).unwrap_or(u32::MAX))
}

#[async_trait]
impl TodoGateway for HttpGateway {
    async fn list(&self, filters: &Filters, page: PageRequest) -> GatewayResult<ListPage> {
        let (builder, request_id) = self.request(Method::GET, "/tasks/");
        info!(page = page.page, limit = page.limit, %request_id, "Fetching todos from API");
        let builder = builder.query(&list_query(filters, page));
        let body: TaskPage = self.send_json(builder, request_id).await?;
        let limit = served_page_size(page, &body);
        if limit != page.limit {
            info!(
                requested = page.limit,
                served = limit,
                %request_id,
                "Server used its own page size"
            );
        }

        let items = body
            .results
            .into_iter()
            .map(into_todo)
            .collect::<GatewayResult<Vec<_>>>()?;
        Ok(ListPage {
            items,
            page: page.page,
            limit,
            total: body.count,
            has_next: body.next.is_some(),
            has_prev: body.previous.is_some(),
        })
    }

    async fn create(&self, input: &CreateTodoInput) -> GatewayResult<Todo> {
        let (builder, request_id) = self.request(Method::POST, "/tasks/");
        info!(title = %input.title, %request_id, "Creating todo via API");
        let builder = builder.json(&CreateTaskRequest::from(input));
        self.send_task(builder, request_id).await
    }

    async fn update(&self, id: TodoId, input: &UpdateTodoInput) -> GatewayResult<Todo> {
        let (builder, request_id) = self.request(Method::PATCH, &format!("/tasks/{id}/"));
        info!(%id, %request_id, "Updating todo via API");
        let builder = builder.json(&UpdateTaskRequest::from(input));
        self.send_task(builder, request_id).await
    }

    async fn change_status(&self, id: TodoId, status: TodoStatus) -> GatewayResult<Todo> {
        let (builder, request_id) =
            self.request(Method::PATCH, &format!("/tasks/{id}/change_status/"));
        info!(%id, %status, %request_id, "Changing todo status via API");
        let builder = builder.json(&ChangeStatusRequest::from(status));
        self.send_task(builder, request_id).await
    }

    async fn delete(&self, id: TodoId) -> GatewayResult<TodoId> {
        let (builder, request_id) = self.request(Method::DELETE, &format!("/tasks/{id}/"));
        info!(%id, %request_id, "Deleting todo via API");
        self.send(builder, request_id).await?;
        Ok(id)
    }

    async fn complete(&self, id: TodoId) -> GatewayResult<Todo> {
        let (builder, request_id) =
            self.request(Method::PATCH, &format!("/tasks/{id}/mark_completed/"));
        info!(%id, %request_id, "Completing todo via API");
        self.send_task(builder, request_id).await
    }
}
