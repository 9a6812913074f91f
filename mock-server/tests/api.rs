use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_server::{app, CategoriesBody, CategoryBody, TodoBody, TodosPage};
use tower::{Service, ServiceExt};

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(String::new())
        .unwrap()
}

/// Sends one request through a shared router instance.
async fn send(app: &mut Router, request: Request<String>) -> axum::response::Response {
    ServiceExt::<Request<String>>::ready(app)
        .await
        .unwrap()
        .call(request)
        .await
        .unwrap()
}

async fn create(app: &mut Router, body: &str) -> TodoBody {
    let resp = send(app, json_request("POST", "/api/todos", body)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    body_json(resp).await
}

async fn list(app: &mut Router, query: &str) -> TodosPage {
    let resp = send(app, empty_request("GET", &format!("/api/todos{query}"))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    body_json(resp).await
}

// --- list ---

#[tokio::test]
async fn list_todos_empty() {
    let resp = app()
        .oneshot(empty_request("GET", "/api/todos"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let page: TodosPage = body_json(resp).await;
    assert!(page.data.is_empty());
    assert_eq!(page.pagination.current_page, 1);
    assert_eq!(page.pagination.per_page, 10);
    assert_eq!(page.pagination.total, 0);
    assert_eq!(page.pagination.total_pages, 0);
}

#[tokio::test]
async fn list_todos_unknown_sort_returns_400() {
    let resp = app()
        .oneshot(empty_request("GET", "/api/todos?sort=due_date"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_todos_filters_and_paginates() {
    let mut app = app();
    for (title, priority) in [
        ("Buy milk", "low"),
        ("Buy eggs", "high"),
        ("Walk dog", "medium"),
    ] {
        create(
            &mut app,
            &format!(r#"{{"title":"{title}","priority":"{priority}"}}"#),
        )
        .await;
    }

    let page = list(&mut app, "?search=BUY&sort=title").await;
    let titles: Vec<&str> = page.data.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["Buy eggs", "Buy milk"]);
    assert_eq!(page.pagination.total, 2);

    let page = list(&mut app, "?sort=-priority&page=2&page_size=2").await;
    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].title, "Buy milk");
    assert_eq!(page.pagination.current_page, 2);
    assert_eq!(page.pagination.total_pages, 2);

    let page = list(&mut app, "?completed=true").await;
    assert!(page.data.is_empty());
}

// --- create ---

#[tokio::test]
async fn create_todo_returns_201_with_defaults() {
    let resp = app()
        .oneshot(json_request("POST", "/api/todos", r#"{"title":"Buy milk"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: TodoBody = body_json(resp).await;
    assert_eq!(body.todo.id, 1);
    assert_eq!(body.todo.title, "Buy milk");
    assert!(!body.todo.completed);
    assert_eq!(body.todo.description, "");
    assert!(body.todo.category.is_none());
}

#[tokio::test]
async fn create_todo_blank_title_returns_400() {
    let resp = app()
        .oneshot(json_request("POST", "/api/todos", r#"{"title":"  "}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_todo_unknown_category_returns_400() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/api/todos",
            r#"{"title":"Orphan","category_id":42}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- update / toggle / delete ---

#[tokio::test]
async fn update_todo_not_found() {
    let resp = app()
        .oneshot(json_request("PUT", "/api/todos/999", r#"{"title":"Nope"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_missing_todo_is_404_even_with_unknown_category() {
    let resp = app()
        .oneshot(json_request(
            "PUT",
            "/api/todos/999",
            r#"{"title":"Nope","category_id":42}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_existing_todo_with_unknown_category_is_400() {
    let mut app = app();
    let id = create(&mut app, r#"{"title":"Keep me"}"#).await.todo.id;

    let resp = send(
        &mut app,
        json_request("PUT", &format!("/api/todos/{id}"), r#"{"category_id":42}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn toggle_flips_completed_each_time() {
    let mut app = app();
    let id = create(&mut app, r#"{"title":"Flip me"}"#).await.todo.id;

    let resp = send(&mut app, empty_request("PATCH", &format!("/api/todos/{id}/complete"))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: TodoBody = body_json(resp).await;
    assert!(body.todo.completed);

    let resp = send(&mut app, empty_request("PATCH", &format!("/api/todos/{id}/complete"))).await;
    let body: TodoBody = body_json(resp).await;
    assert!(!body.todo.completed);
}

#[tokio::test]
async fn toggle_unknown_todo_returns_404() {
    let resp = app()
        .oneshot(empty_request("PATCH", "/api/todos/5/complete"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_todo_not_found() {
    let resp = app()
        .oneshot(empty_request("DELETE", "/api/todos/999"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bad_id_returns_400() {
    let resp = app()
        .oneshot(empty_request("DELETE", "/api/todos/not-a-number"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- categories ---

#[tokio::test]
async fn create_category_rejects_color_without_hash() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/api/categories",
            r##"{"name":"Work","color":"FF5733"}"##,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn category_lifecycle_detaches_todos() {
    let mut app = app();

    let resp = send(
        &mut app,
        json_request("POST", "/api/categories", r##"{"name":"Work","color":"#fff"}"##),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: CategoryBody = body_json(resp).await;
    let cat_id = created.category.id;

    let todo = create(
        &mut app,
        &format!(r#"{{"title":"Report","category_id":{cat_id}}}"#),
    )
    .await
    .todo;
    assert_eq!(todo.category.as_ref().unwrap().name, "Work");

    let page = list(&mut app, &format!("?category_id={cat_id}")).await;
    assert_eq!(page.data.len(), 1);

    // rename: embedded snapshots pick up the new name on the next read
    let resp = send(
        &mut app,
        json_request(
            "PUT",
            &format!("/api/categories/{cat_id}"),
            r##"{"name":"Office","color":"#ABCDEF"}"##,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: CategoryBody = body_json(resp).await;
    assert_eq!(updated.category.name, "Office");
    let page = list(&mut app, "").await;
    assert_eq!(page.data[0].category.as_ref().unwrap().name, "Office");

    let resp = send(&mut app, empty_request("DELETE", &format!("/api/categories/{cat_id}"))).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    let resp = send(&mut app, empty_request("GET", "/api/categories")).await;
    let categories: CategoriesBody = body_json(resp).await;
    assert!(categories.categories.is_empty());

    let page = list(&mut app, "").await;
    assert!(page.data[0].category.is_none());
}

// --- full CRUD lifecycle ---

#[tokio::test]
async fn crud_lifecycle() {
    let mut app = app();

    // create
    let created = create(&mut app, r#"{"title":"Walk dog","priority":"high"}"#)
        .await
        .todo;
    let id = created.id;

    // list should contain the one todo
    let page = list(&mut app, "").await;
    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].id, id);

    // update: partial: only completed
    let resp = send(
        &mut app,
        json_request("PUT", &format!("/api/todos/{id}"), r#"{"completed":true}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: TodoBody = body_json(resp).await;
    assert_eq!(updated.todo.title, "Walk dog"); // unchanged
    assert!(updated.todo.completed);

    // update: partial: only title
    let resp = send(
        &mut app,
        json_request("PUT", &format!("/api/todos/{id}"), r#"{"title":"Walk cat"}"#),
    )
    .await;
    let updated: TodoBody = body_json(resp).await;
    assert_eq!(updated.todo.title, "Walk cat");
    assert!(updated.todo.completed); // unchanged from previous update

    // delete
    let resp = send(&mut app, empty_request("DELETE", &format!("/api/todos/{id}"))).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    // delete again is a 404
    let resp = send(&mut app, empty_request("DELETE", &format!("/api/todos/{id}"))).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // list after delete is empty
    let page = list(&mut app, "").await;
    assert!(page.data.is_empty());
}
