//! The domain store: an observable state container over a [`RemoteService`].
//!
//! # Design
//! State lives in a `tokio::sync::watch` channel. Every transition goes
//! through [`Store::dispatch`], which applies the pure reducer while holding
//! the channel's write lock, so subscribers only ever see whole transitions.
//!
//! Operations call the remote first and dispatch only once it confirms;
//! nothing is applied optimistically. A failure is recorded in
//! `StoreState::error` and also returned to the caller.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::StoreConfig;
use crate::coordinator::FetchPolicy;
use crate::error::{ApiError, StoreError};
use crate::filters::{FilterPatch, Filters};
use crate::reducer::{reduce, Action, StoreState};
use crate::remote::{HttpRemote, RemoteService};
use crate::types::{Category, CategoryInput, Todo, TodoInput, TodosPage};

/// Cloneable handle to a shared store.
pub struct Store<R> {
    pub(crate) inner: Arc<Inner<R>>,
}

pub(crate) struct Inner<R> {
    pub(crate) remote: R,
    state: watch::Sender<StoreState>,
    pub(crate) policy: FetchPolicy,
    todos_in_flight: AtomicUsize,
    categories_in_flight: AtomicUsize,
    /// Token of the newest filter-triggered list fetch.
    pub(crate) list_fetch: Mutex<Option<CancellationToken>>,
}

impl<R> Clone for Store<R> {
    fn clone(&self) -> Self {
        Store {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Decrements an in-flight counter when the fetch ends, even if the future
/// is dropped early.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        InFlight(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Store<HttpRemote> {
    /// A store talking HTTP to `config.base_url`.
    pub fn connect(config: &StoreConfig) -> Self {
        Store::with_config(HttpRemote::new(&config.base_url), config)
    }
}

impl<R: RemoteService> Store<R> {
    pub fn new(remote: R) -> Self {
        Store::with_parts(remote, Filters::default(), FetchPolicy::default())
    }

    pub fn with_config(remote: R, config: &StoreConfig) -> Self {
        Store::with_parts(
            remote,
            Filters::with_page_size(config.page_size),
            config.fetch_policy,
        )
    }

    pub fn with_parts(remote: R, filters: Filters, policy: FetchPolicy) -> Self {
        let (state, _) = watch::channel(StoreState::new(filters));
        Store {
            inner: Arc::new(Inner {
                remote,
                state,
                policy,
                todos_in_flight: AtomicUsize::new(0),
                categories_in_flight: AtomicUsize::new(0),
                list_fetch: Mutex::new(None),
            }),
        }
    }

    pub fn remote(&self) -> &R {
        &self.inner.remote
    }

    pub fn fetch_policy(&self) -> FetchPolicy {
        self.inner.policy
    }

    /// A receiver that is notified after every transition.
    pub fn subscribe(&self) -> watch::Receiver<StoreState> {
        self.inner.state.subscribe()
    }

    pub fn snapshot(&self) -> StoreState {
        self.inner.state.borrow().clone()
    }

    pub fn filters(&self) -> Filters {
        self.inner.state.borrow().filters.clone()
    }

    /// Applies one transition atomically and notifies subscribers.
    pub fn dispatch(&self, action: Action) {
        debug!(action = action.name(), "store.dispatch");
        self.inner.state.send_modify(|state| {
            let current = std::mem::take(state);
            *state = reduce(current, action);
        });
    }

    /// Dispatches `SetFilters` and returns the merged filters from the same
    /// transition.
    pub(crate) fn dispatch_filters(&self, patch: FilterPatch) -> Filters {
        let action = Action::SetFilters { patch };
        debug!(action = action.name(), "store.dispatch");
        let mut merged = Filters::default();
        self.inner.state.send_modify(|state| {
            let current = std::mem::take(state);
            *state = reduce(current, action);
            merged = state.filters.clone();
        });
        merged
    }

    /// Records a failure in state and hands it back for the caller.
    fn fail(&self, op: &'static str, err: ApiError) -> ApiError {
        warn!(op, error = %err, "store.operation.failed");
        self.dispatch(Action::FetchError {
            error: StoreError::from(&err),
        });
        err
    }

    /// Runs a confirmed-write operation: on success the transition built
    /// from the server's value is dispatched, on failure only the error is.
    fn settle<T>(
        &self,
        op: &'static str,
        result: Result<T, ApiError>,
        transition: impl FnOnce(&T) -> Action,
    ) -> Result<T, ApiError> {
        match result {
            Ok(value) => {
                debug!(op, "store.operation.ok");
                self.dispatch(transition(&value));
                Ok(value)
            }
            Err(err) => Err(self.fail(op, err)),
        }
    }

    /// Loads categories and the first page of todos concurrently.
    ///
    /// Categories are fetched here and nowhere else automatically.
    pub async fn init(&self) -> Result<(), ApiError> {
        let filters = self.filters();
        let (categories, todos) = tokio::join!(self.list_categories(), self.list_todos(filters));
        categories?;
        todos?;
        Ok(())
    }

    /// Fetches one page of todos and replaces the local list with it.
    pub async fn list_todos(&self, filters: Filters) -> Result<TodosPage, ApiError> {
        let _guard = InFlight::enter(&self.inner.todos_in_flight);
        self.dispatch(Action::FetchStart);
        let result = self.inner.remote.list_todos(&filters).await;
        self.settle("list_todos", result, |page| Action::FetchTodosSuccess {
            todos: page.data.clone(),
            pagination: page.pagination,
        })
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        let _guard = InFlight::enter(&self.inner.categories_in_flight);
        self.dispatch(Action::FetchStart);
        let result = self.inner.remote.list_categories().await;
        self.settle("list_categories", result, |categories| {
            Action::FetchCategoriesSuccess {
                categories: categories.clone(),
            }
        })
    }

    /// Re-fetches todos with the current filters. Returns `Ok(None)` without
    /// issuing a request while another todo fetch is in flight.
    pub async fn refresh_todos(&self) -> Result<Option<TodosPage>, ApiError> {
        if self.inner.todos_in_flight.load(Ordering::SeqCst) > 0 {
            debug!("store.refresh_todos.skipped");
            return Ok(None);
        }
        self.list_todos(self.filters()).await.map(Some)
    }

    pub async fn refresh_categories(&self) -> Result<Option<Vec<Category>>, ApiError> {
        if self.inner.categories_in_flight.load(Ordering::SeqCst) > 0 {
            debug!("store.refresh_categories.skipped");
            return Ok(None);
        }
        self.list_categories().await.map(Some)
    }

    /// Creates a todo and prepends the server's copy to the list. Callers
    /// validate the input first.
    pub async fn create_todo(&self, input: TodoInput) -> Result<Todo, ApiError> {
        let result = self.inner.remote.create_todo(&input).await;
        self.settle("create_todo", result, |todo| Action::AddTodo { todo: todo.clone() })
    }

    /// Fails with [`ApiError::NotFound`] if the server has no such todo.
    pub async fn update_todo(&self, id: i64, input: TodoInput) -> Result<Todo, ApiError> {
        let result = self.inner.remote.update_todo(id, &input).await;
        self.settle("update_todo", result, |todo| Action::UpdateTodo { todo: todo.clone() })
    }

    pub async fn delete_todo(&self, id: i64) -> Result<(), ApiError> {
        let result = self.inner.remote.delete_todo(id).await;
        self.settle("delete_todo", result, |_| Action::RemoveTodo { id })
    }

    /// The server flips the flag; the local copy takes whatever it returns.
    pub async fn toggle_todo_complete(&self, id: i64) -> Result<Todo, ApiError> {
        let result = self.inner.remote.toggle_todo_complete(id).await;
        self.settle("toggle_todo_complete", result, |todo| Action::UpdateTodo {
            todo: todo.clone(),
        })
    }

    pub async fn create_category(&self, input: CategoryInput) -> Result<Category, ApiError> {
        let result = self.inner.remote.create_category(&input).await;
        self.settle("create_category", result, |category| Action::AddCategory {
            category: category.clone(),
        })
    }

    pub async fn update_category(
        &self,
        id: i64,
        input: CategoryInput,
    ) -> Result<Category, ApiError> {
        let result = self.inner.remote.update_category(id, &input).await;
        self.settle("update_category", result, |category| Action::UpdateCategory {
            category: category.clone(),
        })
    }

    pub async fn delete_category(&self, id: i64) -> Result<(), ApiError> {
        let result = self.inner.remote.delete_category(id).await;
        self.settle("delete_category", result, |_| Action::RemoveCategory { id })
    }
}
