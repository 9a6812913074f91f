//! Stateless HTTP request builder and response parser for the tasks API.
//!
//! # Design
//! `TodoClient` holds only a `base_url` and carries no mutable state between
//! calls. Each endpoint is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`.
//! A [`crate::remote::Transport`] executes the round-trip in between, keeping
//! this module deterministic and free of I/O.

use serde::de::DeserializeOwned;
use serde::Serialize;
use url::form_urlencoded;

use crate::error::ApiError;
use crate::filters::Filters;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{
    CategoriesEnvelope, Category, CategoryEnvelope, CategoryInput, Todo, TodoEnvelope, TodoInput,
    TodosPage,
};

/// Synchronous, stateless client for the tasks API.
#[derive(Debug, Clone)]
pub struct TodoClient {
    base_url: String,
}

impl TodoClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // --- todos ---

    pub fn build_list_todos(&self, filters: &Filters) -> HttpRequest {
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(filters.query_pairs())
            .finish();
        self.request(HttpMethod::Get, format!("/todos?{query}"))
    }

    pub fn build_create_todo(&self, input: &TodoInput) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/todos".to_string(), input)
    }

    pub fn build_update_todo(&self, id: i64, input: &TodoInput) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Put, format!("/todos/{id}"), input)
    }

    pub fn build_delete_todo(&self, id: i64) -> HttpRequest {
        self.request(HttpMethod::Delete, format!("/todos/{id}"))
    }

    pub fn build_toggle_todo(&self, id: i64) -> HttpRequest {
        self.request(HttpMethod::Patch, format!("/todos/{id}/complete"))
    }

    pub fn parse_list_todos(&self, response: HttpResponse) -> Result<TodosPage, ApiError> {
        parse_json(response)
    }

    pub fn parse_create_todo(&self, response: HttpResponse) -> Result<Todo, ApiError> {
        parse_json::<TodoEnvelope>(response).map(|envelope| envelope.todo)
    }

    pub fn parse_update_todo(&self, response: HttpResponse) -> Result<Todo, ApiError> {
        parse_json::<TodoEnvelope>(response).map(|envelope| envelope.todo)
    }

    pub fn parse_delete_todo(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }

    pub fn parse_toggle_todo(&self, response: HttpResponse) -> Result<Todo, ApiError> {
        parse_json::<TodoEnvelope>(response).map(|envelope| envelope.todo)
    }

    // --- categories ---

    pub fn build_list_categories(&self) -> HttpRequest {
        self.request(HttpMethod::Get, "/categories".to_string())
    }

    pub fn build_create_category(&self, input: &CategoryInput) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/categories".to_string(), input)
    }

    pub fn build_update_category(
        &self,
        id: i64,
        input: &CategoryInput,
    ) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Put, format!("/categories/{id}"), input)
    }

    pub fn build_delete_category(&self, id: i64) -> HttpRequest {
        self.request(HttpMethod::Delete, format!("/categories/{id}"))
    }

    pub fn parse_list_categories(&self, response: HttpResponse) -> Result<Vec<Category>, ApiError> {
        parse_json::<CategoriesEnvelope>(response).map(|envelope| envelope.categories)
    }

    pub fn parse_create_category(&self, response: HttpResponse) -> Result<Category, ApiError> {
        parse_json::<CategoryEnvelope>(response).map(|envelope| envelope.category)
    }

    pub fn parse_update_category(&self, response: HttpResponse) -> Result<Category, ApiError> {
        parse_json::<CategoryEnvelope>(response).map(|envelope| envelope.category)
    }

    pub fn parse_delete_category(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }

    fn request(&self, method: HttpMethod, path: String) -> HttpRequest {
        HttpRequest {
            method,
            path: format!("{}{path}", self.base_url),
            headers: Vec::new(),
            body: None,
        }
    }

    fn json_request<T: Serialize>(
        &self,
        method: HttpMethod,
        path: String,
        input: &T,
    ) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(input).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(HttpRequest {
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(body),
            ..self.request(method, path)
        })
    }
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    if response.status == 404 {
        return Err(ApiError::NotFound);
    }
    Err(ApiError::Http {
        status: response.status,
        body: response.body.clone(),
    })
}

fn parse_json<T: DeserializeOwned>(response: HttpResponse) -> Result<T, ApiError> {
    check_status(&response)?;
    serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::{FilterPatch, StatusFilter};
    use crate::types::Priority;

    const TODO_JSON: &str = r#"{"id":1,"title":"Test","description":"","completed":false,
        "priority":"low","created_at":"2024-01-01T00:00:00Z","updated_at":"2024-01-01T00:00:00Z"}"#;

    fn client() -> TodoClient {
        TodoClient::new("http://localhost:3000/api")
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    #[test]
    fn build_list_todos_encodes_default_filters() {
        let req = client().build_list_todos(&Filters::default());
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(
            req.path,
            "http://localhost:3000/api/todos?page=1&page_size=10&sort=-created_at"
        );
        assert!(req.body.is_none());
        assert!(req.headers.is_empty());
    }

    #[test]
    fn build_list_todos_encodes_search_text() {
        let filters = Filters::default()
            .apply(&FilterPatch::search_for("milk & eggs"))
            .apply(&FilterPatch::with_status(StatusFilter::Active));
        let req = client().build_list_todos(&filters);
        assert_eq!(
            req.path,
            "http://localhost:3000/api/todos?search=milk+%26+eggs&completed=false&page=1&page_size=10&sort=-created_at"
        );
    }

    #[test]
    fn build_create_todo_produces_correct_request() {
        let req = client()
            .build_create_todo(&TodoInput::new("Buy milk", Priority::Low))
            .unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "http://localhost:3000/api/todos");
        assert_eq!(
            req.headers,
            vec![("content-type".to_string(), "application/json".to_string())]
        );
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["title"], "Buy milk");
        assert_eq!(body["priority"], "low");
        assert!(body.get("completed").is_none());
    }

    #[test]
    fn build_update_todo_sends_only_present_fields() {
        let input = TodoInput {
            completed: Some(true),
            ..TodoInput::default()
        };
        let req = client().build_update_todo(7, &input).unwrap();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.path, "http://localhost:3000/api/todos/7");
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({"completed": true}));
    }

    #[test]
    fn build_toggle_todo_is_bodyless_patch() {
        let req = client().build_toggle_todo(3);
        assert_eq!(req.method, HttpMethod::Patch);
        assert_eq!(req.path, "http://localhost:3000/api/todos/3/complete");
        assert!(req.body.is_none());
    }

    #[test]
    fn build_category_requests() {
        let c = client();
        assert_eq!(c.build_list_categories().path, "http://localhost:3000/api/categories");
        let req = c
            .build_update_category(2, &CategoryInput::new("Work", "#fff"))
            .unwrap();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.path, "http://localhost:3000/api/categories/2");
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, serde_json::json!({"name": "Work", "color": "#fff"}));
        assert_eq!(c.build_delete_category(2).method, HttpMethod::Delete);
    }

    #[test]
    fn parse_list_todos_success() {
        let body = format!(
            r#"{{"data":[{TODO_JSON}],"pagination":{{"current_page":1,"per_page":10,"total":1,"total_pages":1}}}}"#
        );
        let page = client().parse_list_todos(response(200, &body)).unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].title, "Test");
        assert_eq!(page.pagination.total, 1);
    }

    #[test]
    fn parse_create_todo_unwraps_envelope() {
        let body = format!(r#"{{"todo":{TODO_JSON}}}"#);
        let todo = client().parse_create_todo(response(201, &body)).unwrap();
        assert_eq!(todo.id, 1);
        assert_eq!(todo.priority, Priority::Low);
    }

    #[test]
    fn parse_create_todo_wrong_status() {
        let err = client()
            .parse_create_todo(response(500, "internal error"))
            .unwrap_err();
        assert!(matches!(err, ApiError::Http { status: 500, .. }));
    }

    #[test]
    fn parse_update_todo_not_found() {
        let err = client().parse_update_todo(response(404, "")).unwrap_err();
        assert!(matches!(err, ApiError::NotFound));
    }

    #[test]
    fn parse_delete_accepts_empty_success() {
        assert!(client().parse_delete_todo(response(204, "")).is_ok());
        assert!(client().parse_delete_category(response(200, "")).is_ok());
    }

    #[test]
    fn parse_list_categories_bad_json() {
        let err = client()
            .parse_list_categories(response(200, "not json"))
            .unwrap_err();
        assert!(matches!(err, ApiError::Deserialization(_)));
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let client = TodoClient::new("http://localhost:3000/api/");
        assert_eq!(client.base_url(), "http://localhost:3000/api");
        let req = client.build_list_categories();
        assert_eq!(req.path, "http://localhost:3000/api/categories");
    }
}
