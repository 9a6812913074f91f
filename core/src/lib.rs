//! Client-side state store for the tasks service.
//!
//! # Overview
//! Mediates between a presentation layer and the REST API for todos and
//! categories. The presentation layer reads immutable [`StoreState`]
//! snapshots and invokes store operations; the store calls the API and
//! applies a pure transition once the server has confirmed.
//!
//! # Design
//! - `TodoClient` is stateless and does no I/O: `build_*` produces an
//!   `HttpRequest`, `parse_*` consumes an `HttpResponse`.
//! - `RemoteService` is the seam the store depends on; `HttpRemote` pairs the
//!   client with a `Transport` (`UreqTransport` by default).
//! - `Store` owns all state behind a `tokio::sync::watch` channel and
//!   mutates it only through `reduce`.
//! - Changing filters through `Store::set_filters` re-fetches the list; see
//!   [`coordinator`] for how overlapping fetches are resolved.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod filters;
pub mod http;
pub mod reducer;
pub mod remote;
pub mod store;
pub mod types;
pub mod validation;

pub use client::TodoClient;
pub use config::StoreConfig;
pub use coordinator::{FetchPolicy, ListFetch};
pub use error::{ApiError, StoreError};
pub use filters::{FilterPatch, Filters, SortKey, StatusFilter};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use reducer::{reduce, Action, StoreState};
pub use remote::{HttpRemote, RemoteService, Transport, UreqTransport};
pub use store::Store;
pub use types::{
    CategoriesEnvelope, Category, CategoryEnvelope, CategoryInput, Pagination, Priority, Todo,
    TodoEnvelope, TodoInput, TodosPage,
};
pub use validation::{is_hex_color, validate_category_input, validate_todo_input, ValidationError};
