//! The client-side todo store.
//!
//! # Design
//! `TodoStore` owns the canonical collection and every piece of view state
//! (filters, pagination, selection, loading and error flags) inside a
//! `tokio::sync::watch` channel. Each write is a single `send_modify` closure
//! that never spans an `.await`, so readers always see a whole state and
//! subscribers are woken once per transition.
//!
//! Entry points suspend only at the gateway call. Two calls touching the same
//! todo may interleave there; whichever response lands last wins. That
//! includes reverts: when two toggles of one todo are in flight and both are
//! rejected in order, the entry ends at the second toggle's pre-image, which
//! is the first toggle's guess.
//!
//! `is_loading` stays set while any `fetch` is in flight, not just the most
//! recent one.
//!
//! Gateway failures never escape: they are normalized into
//! [`StoreState::error`] and the entry point returns `None`. Only input
//! validation is reported to the caller, and it happens before any request.

use chrono::Utc;
use tokio::sync::watch;
use todoapp_model::{
    CreateTodoInput, DEFAULT_PAGE_SIZE, Filters, FiltersPatch, PageRequest, Pagination, Stats,
    Todo, TodoId, UpdateTodoInput, ValidationError,
};
use tracing::{debug, info, warn};

use crate::error::{
    COMPLETE_FAILED, CREATE_FAILED, DELETE_FAILED, FETCH_FAILED, StoreError, TOGGLE_FAILED,
    UPDATE_FAILED, normalize_error,
};
use crate::gateway::{GatewayError, TodoGateway};
use crate::query;

/// Coarse lifecycle derived from the loading and error flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreState {
    /// Server-reconciled collection, unfiltered.
    pub todos: Vec<Todo>,
    pub current_todo: Option<Todo>,
    pub filters: Filters,
    pub pagination: Pagination,
    pub is_loading: bool,
    pub error: Option<StoreError>,
    fetches_in_flight: usize,
}

impl StoreState {
    fn with_page_size(limit: u32) -> Self {
        Self {
            pagination: Pagination {
                limit,
                ..Pagination::default()
            },
            ..Self::default()
        }
    }

    pub fn phase(&self) -> Phase {
        if self.is_loading {
            Phase::Loading
        } else if self.error.is_some() {
            Phase::Failed
        } else {
            Phase::Idle
        }
    }

    // A reset while a fetch is in flight already zeroed the count
    fn finish_fetch(&mut self) {
        self.fetches_in_flight = self.fetches_in_flight.saturating_sub(1);
        self.is_loading = self.fetches_in_flight > 0;
    }

    fn is_selected(&self, id: TodoId) -> bool {
        self.current_todo.as_ref().is_some_and(|todo| todo.id == id)
    }
}

/// What a todo looked like before an optimistic write.
#[derive(Debug)]
struct PreImage {
    entry: Todo,
}

impl PreImage {
    /// Puts the saved entry back, and into the selection if it points at it.
    fn restore(self, state: &mut StoreState) {
        let id = self.entry.id;
        if state.is_selected(id) {
            state.current_todo = Some(self.entry.clone());
        }
        if let Some(slot) = state.todos.iter_mut().find(|todo| todo.id == id) {
            *slot = self.entry;
        }
    }
}

pub struct TodoStore<G> {
    gateway: G,
    state: watch::Sender<StoreState>,
    page_size: u32,
}

impl<G: TodoGateway> TodoStore<G> {
    pub fn new(gateway: G) -> Self {
        Self::with_page_size(gateway, DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(gateway: G, page_size: u32) -> Self {
        let (state, _) = watch::channel(StoreState::with_page_size(page_size));
        Self {
            gateway,
            state,
            page_size,
        }
    }

    /// A consistent copy of the current state.
    pub fn snapshot(&self) -> StoreState {
        self.state.borrow().clone()
    }

    /// Receiver notified after every state transition.
    pub fn subscribe(&self) -> watch::Receiver<StoreState> {
        self.state.subscribe()
    }

    /// Back to the freshly constructed state. Subscribers stay attached.
    pub fn reset(&self) {
        self.state.send_replace(StoreState::with_page_size(self.page_size));
    }

    /// Loads one page from the gateway, replacing the collection.
    ///
    /// `filters` is merged over the stored criteria for this request only.
    /// On failure the previous collection stays in place.
    pub async fn fetch(
        &self,
        filters: Option<FiltersPatch>,
        page: Option<PageRequest>,
    ) -> Option<Pagination> {
        let (filters, request) = {
            let state = self.state.borrow();
            let filters = match filters {
                Some(patch) => state.filters.merged(patch),
                None => state.filters.clone(),
            };
            (filters, page.unwrap_or_else(|| state.pagination.request()))
        };

        info!(page = request.page, limit = request.limit, "Fetching todos");
        self.state.send_modify(|state| {
            state.fetches_in_flight += 1;
            state.is_loading = true;
            state.error = None;
        });

        match self.gateway.list(&filters, request).await {
            Ok(page) => {
                let pagination = Pagination::from_page(
                    page.page,
                    page.limit,
                    page.total,
                    page.has_next,
                    page.has_prev,
                );
                self.state.send_modify(|state| {
                    let refreshed = state
                        .current_todo
                        .as_ref()
                        .and_then(|selected| query::find_by_id(&page.items, selected.id))
                        .cloned();
                    if refreshed.is_some() {
                        state.current_todo = refreshed;
                    }
                    state.todos = page.items;
                    state.pagination = pagination;
                    state.finish_fetch();
                });
                Some(pagination)
            }
            Err(err) => {
                let error = report(&err, FETCH_FAILED);
                self.state.send_modify(|state| {
                    state.error = Some(error);
                    state.finish_fetch();
                });
                None
            }
        }
    }

    /// Persists a new todo and puts the server's copy at the front.
    pub async fn create(&self, input: CreateTodoInput) -> Result<Option<Todo>, ValidationError> {
        input.validate()?;
        info!(title = %input.title, "Creating todo");

        match self.gateway.create(&input).await {
            Ok(todo) => {
                self.state.send_modify(|state| state.todos.insert(0, todo.clone()));
                Ok(Some(todo))
            }
            Err(err) => {
                self.fail(&err, CREATE_FAILED);
                Ok(None)
            }
        }
    }

    /// Confirmed write: the local entry only changes once the server answers.
    ///
    /// An update that only moves the status goes through the gateway's
    /// status change, which also reopens completed todos.
    pub async fn update(
        &self,
        id: impl Into<TodoId>,
        input: UpdateTodoInput,
    ) -> Result<Option<Todo>, ValidationError> {
        let id = id.into();
        input.validate()?;
        info!(%id, "Updating todo");

        let result = match input.status_change() {
            Some(status) => self.gateway.change_status(id, status).await,
            None => self.gateway.update(id, &input).await,
        };
        match result {
            Ok(todo) => {
                self.reconcile(&todo);
                Ok(Some(todo))
            }
            Err(err) => {
                self.fail(&err, UPDATE_FAILED);
                Ok(None)
            }
        }
    }

    pub async fn delete(&self, id: impl Into<TodoId>) -> Option<TodoId> {
        let id = id.into();
        info!(%id, "Deleting todo");

        match self.gateway.delete(id).await {
            Ok(deleted) => {
                let mut removed = false;
                self.state.send_modify(|state| {
                    let before = state.todos.len();
                    state.todos.retain(|todo| todo.id != id);
                    removed = state.todos.len() != before;
                    if state.is_selected(id) {
                        state.current_todo = None;
                    }
                });
                if !removed {
                    warn!(%id, "Deleted todo was not in the local collection");
                }
                Some(deleted)
            }
            Err(err) => {
                self.fail(&err, DELETE_FAILED);
                None
            }
        }
    }

    /// Flips completion right away, then asks the server to agree.
    ///
    /// The server's answer replaces the guess; a rejection restores the
    /// entry exactly as it was before the flip. A todo missing from the
    /// collection is left alone and no request is made.
    pub async fn toggle_status(&self, id: impl Into<TodoId>) -> Option<Todo> {
        let id = id.into();
        let now = Utc::now();
        let Some((pre_image, guess)) = self.apply_optimistic(id, |todo| todo.toggled(now)) else {
            warn!(%id, "Todo not in the local collection, nothing to toggle");
            return None;
        };
        debug!(%id, is_completed = guess.is_completed, "Applied optimistic toggle");

        match self.gateway.change_status(id, guess.status).await {
            Ok(todo) => {
                self.reconcile(&todo);
                Some(todo)
            }
            Err(err) => {
                let error = report(&err, TOGGLE_FAILED);
                debug!(%id, "Reverting optimistic toggle");
                self.state.send_modify(|state| {
                    pre_image.restore(state);
                    state.error = Some(error);
                });
                None
            }
        }
    }

    pub async fn mark_completed(&self, id: impl Into<TodoId>) -> Option<Todo> {
        let id = id.into();
        info!(%id, "Completing todo");

        match self.gateway.complete(id).await {
            Ok(todo) => {
                self.reconcile(&todo);
                Some(todo)
            }
            Err(err) => {
                self.fail(&err, COMPLETE_FAILED);
                None
            }
        }
    }

    /// Merges criteria and goes back to the first page.
    pub fn set_filters(&self, patch: FiltersPatch) {
        self.state.send_modify(|state| {
            state.filters.merge(patch);
            state.pagination.page = 1;
        });
    }

    pub fn clear_filters(&self) {
        self.state.send_modify(|state| {
            state.filters = Filters::default();
            state.pagination.page = 1;
        });
    }

    /// Page the next `fetch` without explicit pagination will ask for.
    pub fn set_page(&self, page: u32) {
        self.state.send_modify(|state| state.pagination.page = page.max(1));
    }

    pub fn clear_error(&self) {
        self.state.send_if_modified(|state| state.error.take().is_some());
    }

    /// Makes a loaded todo the current one. Unknown ids leave the selection
    /// untouched.
    pub fn select(&self, id: impl Into<TodoId>) -> Option<Todo> {
        let id = id.into();
        let mut selected = None;
        self.state.send_if_modified(|state| {
            selected = query::find_by_id(&state.todos, id).cloned();
            if selected.is_some() {
                state.current_todo = selected.clone();
            }
            selected.is_some()
        });
        selected
    }

    pub fn clear_selection(&self) {
        self.state.send_if_modified(|state| state.current_todo.take().is_some());
    }

    pub fn filtered_view(&self) -> Vec<Todo> {
        let state = self.state.borrow();
        query::filtered_view(&state.todos, &state.filters)
    }

    pub fn stats(&self) -> Stats {
        query::stats(&self.state.borrow().todos, Utc::now().date_naive())
    }

    pub fn find_by_id(&self, id: impl Into<TodoId>) -> Option<Todo> {
        query::find_by_id(&self.state.borrow().todos, id.into()).cloned()
    }

    /// Swaps the local guess for `guess(entry)` and hands back what it
    /// replaced. `None` when the todo is not loaded.
    fn apply_optimistic(
        &self,
        id: TodoId,
        guess: impl FnOnce(&Todo) -> Todo,
    ) -> Option<(PreImage, Todo)> {
        let mut guess = Some(guess);
        let mut applied = None;
        self.state.send_if_modified(|state| {
            let (Some(slot), Some(guess)) = (
                state.todos.iter_mut().find(|todo| todo.id == id),
                guess.take(),
            ) else {
                return false;
            };
            let next = guess(slot);
            let previous = std::mem::replace(slot, next.clone());
            if state.is_selected(id) {
                state.current_todo = Some(next.clone());
            }
            applied = Some((PreImage { entry: previous }, next));
            true
        });
        applied
    }

    /// Replaces the local entry (and the selection) with the server's copy.
    fn reconcile(&self, todo: &Todo) {
        let mut found = false;
        self.state.send_modify(|state| {
            if let Some(slot) = state.todos.iter_mut().find(|entry| entry.id == todo.id) {
                *slot = todo.clone();
                found = true;
            }
            if state.is_selected(todo.id) {
                state.current_todo = Some(todo.clone());
            }
        });
        if !found {
            warn!(id = %todo.id, "Todo not in the local collection, skipping reconcile");
        }
    }

    fn fail(&self, err: &GatewayError, fallback: &str) {
        let error = report(err, fallback);
        self.state.send_modify(|state| state.error = Some(error));
    }
}

fn report(err: &GatewayError, fallback: &str) -> StoreError {
    let error = normalize_error(err, fallback);
    warn!(
        error = %error,
        status = ?err.status,
        code = ?err.code,
        "Todo operation failed"
    );
    error
}
