//! The remote service seam the store depends on, and its HTTP implementation.
//!
//! # Design
//! [`RemoteService`] is the narrow interface: one async method per endpoint,
//! returning unwrapped payloads. [`HttpRemote`] implements it by pairing the
//! stateless [`TodoClient`] with a [`Transport`] that performs the I/O, so
//! tests can swap either half.

use async_trait::async_trait;
use tracing::debug;

use crate::client::TodoClient;
use crate::error::ApiError;
use crate::filters::Filters;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{Category, CategoryInput, Todo, TodoInput, TodosPage};

/// CRUD operations against the todo and category resources.
#[async_trait]
pub trait RemoteService: Send + Sync {
    async fn list_todos(&self, filters: &Filters) -> Result<TodosPage, ApiError>;
    async fn create_todo(&self, input: &TodoInput) -> Result<Todo, ApiError>;
    async fn update_todo(&self, id: i64, input: &TodoInput) -> Result<Todo, ApiError>;
    async fn delete_todo(&self, id: i64) -> Result<(), ApiError>;
    /// Flips `completed` server-side and returns the resulting todo.
    async fn toggle_todo_complete(&self, id: i64) -> Result<Todo, ApiError>;
    async fn list_categories(&self) -> Result<Vec<Category>, ApiError>;
    async fn create_category(&self, input: &CategoryInput) -> Result<Category, ApiError>;
    async fn update_category(&self, id: i64, input: &CategoryInput) -> Result<Category, ApiError>;
    async fn delete_category(&self, id: i64) -> Result<(), ApiError>;
}

/// Executes a plain-data request. Non-2xx statuses are returned as data;
/// only failing to obtain a response is an error.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// Blocking `ureq` agent driven from tokio's blocking pool.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        // Status codes are interpreted by `TodoClient`, not by ureq.
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for UreqTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let agent = self.agent.clone();
        tokio::task::spawn_blocking(move || execute_blocking(&agent, request))
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?
    }
}

fn execute_blocking(agent: &ureq::Agent, req: HttpRequest) -> Result<HttpResponse, ApiError> {
    let method = req.method;
    let path = req.path;
    let result = match (method, req.body) {
        (HttpMethod::Get, _) => agent.get(&path).call(),
        (HttpMethod::Delete, _) => agent.delete(&path).call(),
        (HttpMethod::Post, Some(body)) => {
            agent.post(&path).content_type("application/json").send(body.as_bytes())
        }
        (HttpMethod::Post, None) => agent.post(&path).send_empty(),
        (HttpMethod::Put, Some(body)) => {
            agent.put(&path).content_type("application/json").send(body.as_bytes())
        }
        (HttpMethod::Put, None) => agent.put(&path).send_empty(),
        (HttpMethod::Patch, Some(body)) => {
            agent.patch(&path).content_type("application/json").send(body.as_bytes())
        }
        (HttpMethod::Patch, None) => agent.patch(&path).send_empty(),
    };
    let mut response = result.map_err(|e| ApiError::Transport(e.to_string()))?;

    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                value.to_str().unwrap_or_default().to_string(),
            )
        })
        .collect();
    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|e| ApiError::Transport(e.to_string()))?;

    debug!(%method, %path, status, "http.response");
    Ok(HttpResponse {
        status,
        headers,
        body,
    })
}

/// [`RemoteService`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRemote<T = UreqTransport> {
    client: TodoClient,
    transport: T,
}

impl HttpRemote<UreqTransport> {
    pub fn new(base_url: &str) -> Self {
        Self::with_transport(base_url, UreqTransport::new())
    }
}

impl<T: Transport> HttpRemote<T> {
    pub fn with_transport(base_url: &str, transport: T) -> Self {
        Self {
            client: TodoClient::new(base_url),
            transport,
        }
    }

    pub fn client(&self) -> &TodoClient {
        &self.client
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!(method = %request.method, path = %request.path, "http.request");
        self.transport.execute(request).await
    }
}

#[async_trait]
impl<T: Transport> RemoteService for HttpRemote<T> {
    async fn list_todos(&self, filters: &Filters) -> Result<TodosPage, ApiError> {
        let response = self.send(self.client.build_list_todos(filters)).await?;
        self.client.parse_list_todos(response)
    }

    async fn create_todo(&self, input: &TodoInput) -> Result<Todo, ApiError> {
        let response = self.send(self.client.build_create_todo(input)?).await?;
        self.client.parse_create_todo(response)
    }

    async fn update_todo(&self, id: i64, input: &TodoInput) -> Result<Todo, ApiError> {
        let response = self.send(self.client.build_update_todo(id, input)?).await?;
        self.client.parse_update_todo(response)
    }

    async fn delete_todo(&self, id: i64) -> Result<(), ApiError> {
        let response = self.send(self.client.build_delete_todo(id)).await?;
        self.client.parse_delete_todo(response)
    }

    async fn toggle_todo_complete(&self, id: i64) -> Result<Todo, ApiError> {
        let response = self.send(self.client.build_toggle_todo(id)).await?;
        self.client.parse_toggle_todo(response)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        let response = self.send(self.client.build_list_categories()).await?;
        self.client.parse_list_categories(response)
    }

    async fn create_category(&self, input: &CategoryInput) -> Result<Category, ApiError> {
        let response = self.send(self.client.build_create_category(input)?).await?;
        self.client.parse_create_category(response)
    }

    async fn update_category(&self, id: i64, input: &CategoryInput) -> Result<Category, ApiError> {
        let response = self.send(self.client.build_update_category(id, input)?).await?;
        self.client.parse_update_category(response)
    }

    async fn delete_category(&self, id: i64) -> Result<(), ApiError> {
        let response = self.send(self.client.build_delete_category(id)).await?;
        self.client.parse_delete_category(response)
    }
}
