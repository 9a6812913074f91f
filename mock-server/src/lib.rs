use std::{cmp::Ordering, collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tokio::{net::TcpListener, sync::RwLock};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A todo as rendered to clients, with its category embedded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    pub category: Option<Category>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub current_page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_pages: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TodosPage {
    pub data: Vec<Todo>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TodoBody {
    pub todo: Todo,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoriesBody {
    pub categories: Vec<Category>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryBody {
    pub category: Category,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Create and update share one payload; every field is optional and
/// `due_date`/`category_id` accept an explicit `null` to clear them.
#[derive(Debug, Default, Deserialize)]
pub struct TodoPayload {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "nullable")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "nullable")]
    pub category_id: Option<Option<i64>>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryPayload {
    pub name: String,
    pub color: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
    pub category_id: Option<i64>,
    pub completed: Option<bool>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort: Option<String>,
}

fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Clone, Debug)]
struct TodoRecord {
    id: i64,
    title: String,
    description: String,
    completed: bool,
    priority: Priority,
    due_date: Option<DateTime<Utc>>,
    category_id: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct Records {
    todos: BTreeMap<i64, TodoRecord>,
    categories: BTreeMap<i64, Category>,
    next_todo_id: i64,
    next_category_id: i64,
}

impl Records {
    fn render(&self, record: &TodoRecord) -> Todo {
        Todo {
            id: record.id,
            title: record.title.clone(),
            description: record.description.clone(),
            completed: record.completed,
            priority: record.priority,
            due_date: record.due_date,
            category: record
                .category_id
                .and_then(|id| self.categories.get(&id).cloned()),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }

    fn check_category(&self, category_id: Option<i64>) -> Result<(), ApiFailure> {
        match category_id {
            Some(id) if !self.categories.contains_key(&id) => {
                Err(bad_request(format!("category {id} does not exist")))
            }
            _ => Ok(()),
        }
    }
}

pub type Db = Arc<RwLock<Records>>;

type ApiFailure = (StatusCode, Json<ErrorBody>);

fn failure(status: StatusCode, message: impl Into<String>) -> ApiFailure {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

fn bad_request(message: impl Into<String>) -> ApiFailure {
    failure(StatusCode::BAD_REQUEST, message)
}

fn not_found(kind: &str, id: i64) -> ApiFailure {
    failure(StatusCode::NOT_FOUND, format!("{kind} {id} not found"))
}

pub fn is_hex_color(value: &str) -> bool {
    let Some(digits) = value.strip_prefix('#') else {
        return false;
    };
    matches!(digits.len(), 3 | 6) && digits.chars().all(|c| c.is_ascii_hexdigit())
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Records::default()));
    let api = Router::new()
        .route("/todos", get(list_todos).post(create_todo))
        .route("/todos/{id}", put(update_todo).delete(delete_todo))
        .route("/todos/{id}/complete", patch(toggle_complete))
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/{id}",
            put(update_category).delete(delete_category),
        )
        .with_state(db);
    Router::new().nest("/api", api)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

// --- todos ---

type Comparator = fn(&TodoRecord, &TodoRecord) -> Ordering;

fn by_created_at(a: &TodoRecord, b: &TodoRecord) -> Ordering {
    a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id))
}

fn by_priority(a: &TodoRecord, b: &TodoRecord) -> Ordering {
    a.priority.cmp(&b.priority).then(a.id.cmp(&b.id))
}

fn by_title(a: &TodoRecord, b: &TodoRecord) -> Ordering {
    a.title
        .to_lowercase()
        .cmp(&b.title.to_lowercase())
        .then(a.id.cmp(&b.id))
}

/// Resolves a sort key to its ascending comparator and direction.
fn comparator(sort: &str) -> Option<(Comparator, bool)> {
    let (field, descending) = match sort.strip_prefix('-') {
        Some(field) => (field, true),
        None => (sort, false),
    };
    let cmp: Comparator = match field {
        "created_at" => by_created_at,
        "priority" => by_priority,
        "title" => by_title,
        _ => return None,
    };
    Some((cmp, descending))
}

fn sort_records(records: &mut [&TodoRecord], cmp: Comparator, descending: bool) {
    records.sort_by(|a, b| {
        let ordering = cmp(*a, *b);
        if descending {
            ordering.reverse()
        } else {
            ordering
        }
    });
}

async fn list_todos(
    State(db): State<Db>,
    Query(params): Query<ListParams>,
) -> Result<Json<TodosPage>, ApiFailure> {
    let sort = params.sort.as_deref().unwrap_or("-created_at");
    let (cmp, descending) =
        comparator(sort).ok_or_else(|| bad_request(format!("unknown sort key: {sort}")))?;
    let per_page = params
        .page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let page = params.page.unwrap_or(1).max(1);
    let needle = params
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    let store = db.read().await;
    let mut matching: Vec<&TodoRecord> = store
        .todos
        .values()
        .filter(|t| needle.as_ref().map_or(true, |n| t.title.to_lowercase().contains(n.as_str())))
        .filter(|t| params.category_id.map_or(true, |id| t.category_id == Some(id)))
        .filter(|t| params.completed.map_or(true, |c| t.completed == c))
        .collect();
    sort_records(&mut matching, cmp, descending);

    let total = matching.len() as u64;
    let total_pages = total.div_ceil(u64::from(per_page)) as u32;
    let offset = (page as usize - 1) * per_page as usize;
    let data = matching
        .into_iter()
        .skip(offset)
        .take(per_page as usize)
        .map(|record| store.render(record))
        .collect();

    Ok(Json(TodosPage {
        data,
        pagination: Pagination {
            current_page: page,
            per_page,
            total,
            total_pages,
        },
    }))
}

async fn create_todo(
    State(db): State<Db>,
    Json(input): Json<TodoPayload>,
) -> Result<(StatusCode, Json<TodoBody>), ApiFailure> {
    let title = input
        .title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| bad_request("title is required"))?;
    let mut store = db.write().await;
    let category_id = input.category_id.flatten();
    store.check_category(category_id)?;

    store.next_todo_id += 1;
    let now = Utc::now();
    let record = TodoRecord {
        id: store.next_todo_id,
        title,
        description: input.description.unwrap_or_default(),
        completed: input.completed.unwrap_or(false),
        priority: input.priority.unwrap_or(Priority::Medium),
        due_date: input.due_date.flatten(),
        category_id,
        created_at: now,
        updated_at: now,
    };
    tracing::debug!(id = record.id, "todo.created");
    store.todos.insert(record.id, record.clone());
    Ok((
        StatusCode::CREATED,
        Json(TodoBody {
            todo: store.render(&record),
        }),
    ))
}

async fn update_todo(
    State(db): State<Db>,
    Path(id): Path<i64>,
    Json(input): Json<TodoPayload>,
) -> Result<Json<TodoBody>, ApiFailure> {
    let mut store = db.write().await;
    if !store.todos.contains_key(&id) {
        return Err(not_found("todo", id));
    }
    if let Some(category_id) = input.category_id {
        store.check_category(category_id)?;
    }
    if matches!(&input.title, Some(t) if t.trim().is_empty()) {
        return Err(bad_request("title must not be empty"));
    }
    let record = store.todos.get_mut(&id).ok_or_else(|| not_found("todo", id))?;
    if let Some(title) = input.title {
        record.title = title;
    }
    if let Some(description) = input.description {
        record.description = description;
    }
    if let Some(completed) = input.completed {
        record.completed = completed;
    }
    if let Some(priority) = input.priority {
        record.priority = priority;
    }
    if let Some(due_date) = input.due_date {
        record.due_date = due_date;
    }
    if let Some(category_id) = input.category_id {
        record.category_id = category_id;
    }
    record.updated_at = Utc::now();
    let record = record.clone();
    Ok(Json(TodoBody {
        todo: store.render(&record),
    }))
}

async fn delete_todo(
    State(db): State<Db>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiFailure> {
    let mut store = db.write().await;
    store
        .todos
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| not_found("todo", id))
}

async fn toggle_complete(
    State(db): State<Db>,
    Path(id): Path<i64>,
) -> Result<Json<TodoBody>, ApiFailure> {
    let mut store = db.write().await;
    let record = store.todos.get_mut(&id).ok_or_else(|| not_found("todo", id))?;
    record.completed = !record.completed;
    record.updated_at = Utc::now();
    let record = record.clone();
    Ok(Json(TodoBody {
        todo: store.render(&record),
    }))
}

// --- categories ---

fn check_category_payload(input: &CategoryPayload) -> Result<(), ApiFailure> {
    if input.name.trim().is_empty() {
        return Err(bad_request("name is required"));
    }
    if !is_hex_color(&input.color) {
        return Err(bad_request(format!("invalid color: {}", input.color)));
    }
    Ok(())
}

async fn list_categories(State(db): State<Db>) -> Json<CategoriesBody> {
    let store = db.read().await;
    Json(CategoriesBody {
        categories: store.categories.values().cloned().collect(),
    })
}

async fn create_category(
    State(db): State<Db>,
    Json(input): Json<CategoryPayload>,
) -> Result<(StatusCode, Json<CategoryBody>), ApiFailure> {
    check_category_payload(&input)?;
    let mut store = db.write().await;
    store.next_category_id += 1;
    let now = Utc::now();
    let category = Category {
        id: store.next_category_id,
        name: input.name,
        color: input.color,
        created_at: now,
        updated_at: now,
    };
    tracing::debug!(id = category.id, "category.created");
    store.categories.insert(category.id, category.clone());
    Ok((StatusCode::CREATED, Json(CategoryBody { category })))
}

async fn update_category(
    State(db): State<Db>,
    Path(id): Path<i64>,
    Json(input): Json<CategoryPayload>,
) -> Result<Json<CategoryBody>, ApiFailure> {
    check_category_payload(&input)?;
    let mut store = db.write().await;
    let category = store
        .categories
        .get_mut(&id)
        .ok_or_else(|| not_found("category", id))?;
    category.name = input.name;
    category.color = input.color;
    category.updated_at = Utc::now();
    Ok(Json(CategoryBody {
        category: category.clone(),
    }))
}

/// Todos in a deleted category become uncategorized.
async fn delete_category(
    State(db): State<Db>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiFailure> {
    let mut store = db.write().await;
    store
        .categories
        .remove(&id)
        .ok_or_else(|| not_found("category", id))?;
    for todo in store.todos.values_mut() {
        if todo.category_id == Some(id) {
            todo.category_id = None;
        }
    }
    Ok(StatusCode::NO_CONTENT)
}
