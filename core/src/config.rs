//! Store configuration.
//!
//! Defaults match a locally running mock server. `from_env` overrides them
//! from `TASKS_API_URL`, `TASKS_PAGE_SIZE` and `TASKS_FETCH_POLICY`.

use tracing::warn;

use crate::coordinator::FetchPolicy;
use crate::filters::DEFAULT_PAGE_SIZE;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:3000/api";

pub const API_URL_VAR: &str = "TASKS_API_URL";
pub const PAGE_SIZE_VAR: &str = "TASKS_PAGE_SIZE";
pub const FETCH_POLICY_VAR: &str = "TASKS_FETCH_POLICY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub base_url: String,
    /// Initial `page_size` filter.
    pub page_size: u32,
    pub fetch_policy: FetchPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            base_url: DEFAULT_API_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            fetch_policy: FetchPolicy::default(),
        }
    }
}

impl StoreConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unparseable values are logged and replaced by defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = StoreConfig::default();

        if let Some(url) = lookup(API_URL_VAR).filter(|url| !url.trim().is_empty()) {
            config.base_url = url.trim().to_string();
        }

        if let Some(raw) = lookup(PAGE_SIZE_VAR) {
            match raw.trim().parse::<u32>() {
                Ok(size) if size > 0 => config.page_size = size,
                _ => warn!(var = PAGE_SIZE_VAR, value = %raw, "config.invalid_page_size"),
            }
        }

        if let Some(raw) = lookup(FETCH_POLICY_VAR) {
            match raw.trim().parse::<FetchPolicy>() {
                Ok(policy) => config.fetch_policy = policy,
                Err(err) => warn!(var = FETCH_POLICY_VAR, error = %err, "config.invalid_fetch_policy"),
            }
        }

        config
    }
}
