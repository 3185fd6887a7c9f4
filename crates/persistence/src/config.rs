//! Filter layer settings.

use serde::{Deserialize, Serialize};

/// What to do when the search index fails while resolving a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IndexFailurePolicy {
    /// Surface the failure to the caller.
    #[default]
    Propagate,
    /// Treat the failed lookup as matching nothing.
    NoMatches,
}

/// Settings for parsing filters and resolving index lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    /// Index tokens shorter than this many characters are dropped.
    pub min_token_length: usize,

    /// Behavior when an index lookup fails.
    pub index_failure_policy: IndexFailurePolicy,

    /// Page size used when the caller does not ask for one.
    pub default_page_size: u32,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            min_token_length: 3,
            index_failure_policy: IndexFailurePolicy::Propagate,
            default_page_size: 25,
        }
    }
}

impl FilterSettings {
    /// Sets the minimum index token length.
    pub fn with_min_token_length(mut self, length: usize) -> Self {
        self.min_token_length = length;
        self
    }

    /// Sets the index failure policy.
    pub fn with_index_failure_policy(mut self, policy: IndexFailurePolicy) -> Self {
        self.index_failure_policy = policy;
        self
    }

    /// Validates the settings, collecting every problem found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.min_token_length == 0 {
            errors.push("min_token_length must be at least 1".to_string());
        }

        if self.default_page_size == 0 {
            errors.push("default_page_size must be at least 1".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
