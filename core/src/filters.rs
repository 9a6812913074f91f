//! Todo list filter state and partial updates to it.
//!
//! `Filters` is always fully defined. Changes arrive as a `FilterPatch` and
//! are shallow-merged by [`Filters::apply`]: exactly the fields present in
//! the patch are overwritten. The constructors on `FilterPatch` mirror the
//! list controls, which reset the page whenever what is shown changes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::nullable;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Sort order accepted by `GET /todos`. A leading `-` on the wire means
/// descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortKey {
    #[serde(rename = "created_at")]
    CreatedAt,
    #[default]
    #[serde(rename = "-created_at")]
    CreatedAtDesc,
    #[serde(rename = "priority")]
    Priority,
    #[serde(rename = "-priority")]
    PriorityDesc,
    #[serde(rename = "title")]
    Title,
    #[serde(rename = "-title")]
    TitleDesc,
}

impl SortKey {
    pub const ALL: [SortKey; 6] = [
        SortKey::CreatedAtDesc,
        SortKey::CreatedAt,
        SortKey::Priority,
        SortKey::PriorityDesc,
        SortKey::Title,
        SortKey::TitleDesc,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::CreatedAt => "created_at",
            SortKey::CreatedAtDesc => "-created_at",
            SortKey::Priority => "priority",
            SortKey::PriorityDesc => "-priority",
            SortKey::Title => "title",
            SortKey::TitleDesc => "-title",
        }
    }

    pub fn is_descending(self) -> bool {
        self.as_str().starts_with('-')
    }

    /// Label shown in the sort picker.
    pub fn label(self) -> &'static str {
        match self {
            SortKey::CreatedAtDesc => "Newest First",
            SortKey::CreatedAt => "Oldest First",
            SortKey::Priority => "Priority (asc)",
            SortKey::PriorityDesc => "Priority (desc)",
            SortKey::Title => "Title (A-Z)",
            SortKey::TitleDesc => "Title (Z-A)",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sort key: {0}")]
pub struct UnknownSortKey(pub String);

impl FromStr for SortKey {
    type Err = UnknownSortKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| UnknownSortKey(s.to_string()))
    }
}

/// Status picker values. Maps onto the tri-state `completed` filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    All,
    Active,
    Completed,
}

impl StatusFilter {
    pub fn as_completed(self) -> Option<bool> {
        match self {
            StatusFilter::All => None,
            StatusFilter::Active => Some(false),
            StatusFilter::Completed => Some(true),
        }
    }

    pub fn from_completed(completed: Option<bool>) -> Self {
        match completed {
            None => StatusFilter::All,
            Some(false) => StatusFilter::Active,
            Some(true) => StatusFilter::Completed,
        }
    }
}

/// The active list filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filters {
    pub search: Option<String>,
    pub category_id: Option<i64>,
    pub completed: Option<bool>,
    pub page: u32,
    pub page_size: u32,
    pub sort: SortKey,
}

impl Default for Filters {
    fn default() -> Self {
        Filters {
            search: None,
            category_id: None,
            completed: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort: SortKey::default(),
        }
    }
}

impl Filters {
    pub fn with_page_size(page_size: u32) -> Self {
        Filters {
            page_size: page_size.max(1),
            ..Filters::default()
        }
    }

    /// Shallow merge. Page numbers and sizes are clamped to at least 1.
    pub fn apply(&self, patch: &FilterPatch) -> Filters {
        let mut next = self.clone();
        if let Some(search) = &patch.search {
            next.search = search.clone();
        }
        if let Some(category_id) = patch.category_id {
            next.category_id = category_id;
        }
        if let Some(completed) = patch.completed {
            next.completed = completed;
        }
        if let Some(page) = patch.page {
            next.page = page.max(1);
        }
        if let Some(page_size) = patch.page_size {
            next.page_size = page_size.max(1);
        }
        if let Some(sort) = patch.sort {
            next.sort = sort;
        }
        next
    }

    /// Query parameters for `GET /todos`, in a stable order. Unset optional
    /// filters are left out.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(6);
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        if let Some(category_id) = self.category_id {
            pairs.push(("category_id", category_id.to_string()));
        }
        if let Some(completed) = self.completed {
            pairs.push(("completed", completed.to_string()));
        }
        pairs.push(("page", self.page.to_string()));
        pairs.push(("page_size", self.page_size.to_string()));
        pairs.push(("sort", self.sort.as_str().to_string()));
        pairs
    }

    pub fn status(&self) -> StatusFilter {
        StatusFilter::from_completed(self.completed)
    }
}

/// A partial filter update. `None` leaves a field alone; for the nullable
/// fields `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterPatch {
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub search: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub completed: Option<Option<bool>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortKey>,
}

impl FilterPatch {
    pub fn is_empty(&self) -> bool {
        *self == FilterPatch::default()
    }

    /// Search by title and go back to the first page. Blank text clears the
    /// search but is still sent as an empty term.
    pub fn search_for(text: impl Into<String>) -> Self {
        FilterPatch {
            search: Some(Some(text.into())),
            page: Some(1),
            ..FilterPatch::default()
        }
    }

    pub fn for_category(category_id: Option<i64>) -> Self {
        FilterPatch {
            category_id: Some(category_id),
            page: Some(1),
            ..FilterPatch::default()
        }
    }

    pub fn with_status(status: StatusFilter) -> Self {
        FilterPatch {
            completed: Some(status.as_completed()),
            page: Some(1),
            ..FilterPatch::default()
        }
    }

    /// Changing the sort keeps the current page.
    pub fn sorted_by(sort: SortKey) -> Self {
        FilterPatch {
            sort: Some(sort),
            ..FilterPatch::default()
        }
    }

    pub fn go_to_page(page: u32) -> Self {
        FilterPatch {
            page: Some(page),
            ..FilterPatch::default()
        }
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn completed(mut self, completed: Option<bool>) -> Self {
        self.completed = Some(completed);
        self
    }
}
