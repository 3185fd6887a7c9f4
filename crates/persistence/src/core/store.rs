//! Record store collaborator.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::types::QueryParameters;

/// Executes compiled statements against the relational store.
///
/// Statements use `:name` placeholders, dotted path navigation and the
/// `FROM`/`WHERE`/`ORDER BY` clauses rendered by the query builder.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// The row type returned by [`fetch`](RecordStore::fetch).
    type Record: Send;

    /// Runs a count statement.
    async fn count(&self, statement: &str, parameters: &QueryParameters)
    -> Result<u64, StoreError>;

    /// Runs a fetch statement, returning at most `limit` rows after skipping `offset`.
    async fn fetch(
        &self,
        statement: &str,
        parameters: &QueryParameters,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<Self::Record>, StoreError>;
}
