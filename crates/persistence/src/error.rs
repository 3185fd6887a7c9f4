//! Error types for the filter layer.
//!
//! The filter grammar itself never fails: unparsable input degrades to a less
//! specific search. Errors only arise from programming or configuration
//! mistakes in the query builder and from the external collaborators (search
//! index and record store).

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

use crate::types::RecordKind;

/// The umbrella error type for filter operations.
#[derive(Error, Debug)]
pub enum FilterError {
    /// Query builder misuse
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Search index failures
    #[error(transparent)]
    Index(#[from] IndexError),

    /// Record store failures
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors raised by the query builder.
///
/// These indicate a programming or configuration mistake, never bad user input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// A structural restriction has no relational template for the record kind.
    #[error("{operation}() is not implemented for record kind {kind}")]
    UnsupportedRecordKind {
        operation: &'static str,
        kind: RecordKind,
    },

    /// Parameters were requested before all index lookups were resolved.
    #[error("index searches not yet performed: {pending} lookup(s) pending")]
    PendingIndexSearches { pending: usize },
}

/// Errors reported by a search index collaborator.
#[derive(Error, Debug)]
pub enum IndexError {
    /// The index could not be reached or refused the request.
    #[error("search index unavailable: {message}")]
    Unavailable { message: String },

    /// The index does not know the requested field.
    #[error("unknown index field: {field}")]
    UnknownField { field: String },

    /// The index answered with something that could not be interpreted.
    #[error("invalid index response: {message}")]
    InvalidResponse { message: String },
}

/// Errors reported by a record store collaborator.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("record store unavailable: {message}")]
    Unavailable { message: String },

    /// The statement was rejected or failed while executing.
    #[error("query execution failed: {message}")]
    QueryFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Result type alias for filter operations.
pub type FilterResult<T> = Result<T, FilterError>;

/// Result type alias for query builder operations.
pub type QueryResult<T> = Result<T, QueryError>;
