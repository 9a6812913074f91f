//! Store state and the pure transition function over it.
//!
//! # Design
//! Every change to [`StoreState`] is an [`Action`] fed through [`reduce`].
//! The reducer does no I/O and never fails, so it can be exercised without a
//! runtime or a server. Fetched collections and pagination are replaced
//! wholesale; single-entity actions touch only the matching element.

use crate::error::StoreError;
use crate::filters::{FilterPatch, Filters};
use crate::types::{Category, Pagination, Todo};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreState {
    pub todos: Vec<Todo>,
    pub categories: Vec<Category>,
    /// Metadata of the most recent successful list fetch.
    pub pagination: Option<Pagination>,
    pub loading: bool,
    pub error: Option<StoreError>,
    pub filters: Filters,
}

impl StoreState {
    /// Nothing fetched yet, so the state starts out loading.
    pub fn new(filters: Filters) -> Self {
        StoreState {
            todos: Vec::new(),
            categories: Vec::new(),
            pagination: None,
            loading: true,
            error: None,
            filters,
        }
    }

    pub fn todo(&self, id: i64) -> Option<&Todo> {
        self.todos.iter().find(|todo| todo.id == id)
    }

    pub fn category(&self, id: i64) -> Option<&Category> {
        self.categories.iter().find(|category| category.id == id)
    }
}

impl Default for StoreState {
    fn default() -> Self {
        StoreState::new(Filters::default())
    }
}

/// Every transition the store can make.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    FetchStart,
    FetchTodosSuccess {
        todos: Vec<Todo>,
        pagination: Pagination,
    },
    FetchCategoriesSuccess {
        categories: Vec<Category>,
    },
    /// Records a failure. Data already on screen is kept.
    FetchError {
        error: StoreError,
    },
    SetFilters {
        patch: FilterPatch,
    },
    /// Prepends, whatever the active sort.
    AddTodo {
        todo: Todo,
    },
    UpdateTodo {
        todo: Todo,
    },
    RemoveTodo {
        id: i64,
    },
    AddCategory {
        category: Category,
    },
    UpdateCategory {
        category: Category,
    },
    RemoveCategory {
        id: i64,
    },
}

impl Action {
    /// Short name used in log events.
    pub fn name(&self) -> &'static str {
        match self {
            Action::FetchStart => "fetch_start",
            Action::FetchTodosSuccess { .. } => "fetch_todos_success",
            Action::FetchCategoriesSuccess { .. } => "fetch_categories_success",
            Action::FetchError { .. } => "fetch_error",
            Action::SetFilters { .. } => "set_filters",
            Action::AddTodo { .. } => "add_todo",
            Action::UpdateTodo { .. } => "update_todo",
            Action::RemoveTodo { .. } => "remove_todo",
            Action::AddCategory { .. } => "add_category",
            Action::UpdateCategory { .. } => "update_category",
            Action::RemoveCategory { .. } => "remove_category",
        }
    }
}

pub fn reduce(mut state: StoreState, action: Action) -> StoreState {
    match action {
        Action::FetchStart => {
            state.loading = true;
            state.error = None;
        }
        Action::FetchTodosSuccess { todos, pagination } => {
            state.loading = false;
            state.todos = todos;
            state.pagination = Some(pagination);
        }
        Action::FetchCategoriesSuccess { categories } => {
            state.loading = false;
            state.categories = categories;
        }
        Action::FetchError { error } => {
            state.loading = false;
            state.error = Some(error);
        }
        Action::SetFilters { patch } => {
            state.filters = state.filters.apply(&patch);
        }
        Action::AddTodo { todo } => {
            state.todos.insert(0, todo);
        }
        Action::UpdateTodo { todo } => {
            if let Some(slot) = state.todos.iter_mut().find(|t| t.id == todo.id) {
                *slot = todo;
            }
        }
        Action::RemoveTodo { id } => {
            state.todos.retain(|t| t.id != id);
        }
        Action::AddCategory { category } => {
            state.categories.push(category);
        }
        Action::UpdateCategory { category } => {
            if let Some(slot) = state.categories.iter_mut().find(|c| c.id == category.id) {
                *slot = category;
            }
        }
        Action::RemoveCategory { id } => {
            state.categories.retain(|c| c.id != id);
        }
    }
    state
}
