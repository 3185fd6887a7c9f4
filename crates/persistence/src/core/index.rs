//! Search index collaborator.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::IndexError;
use crate::types::RecordId;

/// A lookup against one search index field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexQuery {
    /// The index field key (`search`, `batch`, `meta`, ...).
    pub field: String,

    /// Sub-key within the field, e.g. a metadata key or property name.
    pub sub_key: Option<String>,

    /// Normalized tokens, all of which must match.
    ///
    /// An empty list asks for records that have the field (or sub-key) at all.
    pub tokens: Vec<String>,
}

impl IndexQuery {
    /// Creates a lookup for all tokens on a field.
    pub fn new(field: impl Into<String>, tokens: Vec<String>) -> Self {
        Self {
            field: field.into(),
            sub_key: None,
            tokens,
        }
    }

    /// Sets the sub-key.
    pub fn with_sub_key(mut self, sub_key: impl Into<String>) -> Self {
        self.sub_key = Some(sub_key.into());
        self
    }

    /// Returns true if this lookup only checks that the field exists.
    pub fn is_existence(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl fmt::Display for IndexQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.field)?;
        if let Some(sub_key) = &self.sub_key {
            write!(f, ".{}", sub_key)?;
        }
        write!(f, ":[{}]", self.tokens.join(" "))
    }
}

/// Resolves index lookups into matching process ids.
///
/// Implementations talk to the full-text index the records are mirrored into.
#[async_trait]
pub trait IndexSearcher: Send + Sync {
    /// Returns a short name for log output.
    fn name(&self) -> &'static str;

    /// Returns the ids of all processes matching the lookup.
    async fn search_ids(&self, query: &IndexQuery) -> Result<Vec<RecordId>, IndexError>;
}
