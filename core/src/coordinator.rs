//! Re-fetching the todo list whenever the filters change.
//!
//! # Design
//! [`Store::set_filters`] merges the patch and spawns exactly one list fetch
//! for the merged filters, even when they equal the previous value, so a
//! resubmitted search refreshes the list. Only an empty patch is a no-op.
//! Fetches are not queued or coalesced. What happens when they overlap is decided by
//! [`FetchPolicy`]:
//!
//! - `LastWriteWins`: every fetch runs to completion and whichever resolves
//!   last owns `todos`/`pagination`.
//! - `SupersedePrevious`: each fetch carries a cancellation token. A newer
//!   filter change cancels the older fetch and its result is dropped.

use std::fmt;
use std::str::FromStr;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::ApiError;
use crate::filters::FilterPatch;
use crate::remote::RemoteService;
use crate::store::Store;
use crate::types::TodosPage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchPolicy {
    #[default]
    LastWriteWins,
    SupersedePrevious,
}

impl FetchPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            FetchPolicy::LastWriteWins => "last-write-wins",
            FetchPolicy::SupersedePrevious => "supersede",
        }
    }
}

impl fmt::Display for FetchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown fetch policy: {0}")]
pub struct UnknownFetchPolicy(pub String);

impl FromStr for FetchPolicy {
    type Err = UnknownFetchPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "last-write-wins" => Ok(FetchPolicy::LastWriteWins),
            "supersede" => Ok(FetchPolicy::SupersedePrevious),
            other => Err(UnknownFetchPolicy(other.to_string())),
        }
    }
}

/// Outcome of a filter-triggered fetch. `Ok(None)` means a newer filter
/// change superseded it before it resolved.
pub type ListFetch = JoinHandle<Result<Option<TodosPage>, ApiError>>;

impl<R: RemoteService + 'static> Store<R> {
    /// Merges `patch` into the filters and re-fetches the list. Returns the
    /// handle of the spawned fetch, or `None` for an empty patch.
    ///
    /// Must be called from within a tokio runtime.
    pub fn set_filters(&self, patch: FilterPatch) -> Option<ListFetch> {
        if patch.is_empty() {
            return None;
        }
        let filters = self.dispatch_filters(patch);
        debug!(?filters, policy = %self.inner.policy, "coordinator.filters_set");

        let store = self.clone();
        let handle = match self.inner.policy {
            FetchPolicy::LastWriteWins => {
                tokio::spawn(async move { store.list_todos(filters).await.map(Some) })
            }
            FetchPolicy::SupersedePrevious => {
                let token = self.supersede_list_fetch();
                tokio::spawn(async move {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => {
                            debug!("coordinator.fetch_superseded");
                            Ok(None)
                        }
                        result = store.list_todos(filters) => result.map(Some),
                    }
                })
            }
        };
        Some(handle)
    }

    /// Installs a fresh token for the newest fetch and cancels the previous.
    fn supersede_list_fetch(&self) -> CancellationToken {
        let token = CancellationToken::new();
        let previous = self
            .inner
            .list_fetch
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .replace(token.clone());
        if let Some(previous) = previous {
            previous.cancel();
        }
        token
    }
}
