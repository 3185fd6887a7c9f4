//! Core types for the filter layer.
//!
//! - [`RecordKind`], [`RecordId`] - What a query is rooted at
//! - [`QueryValue`], [`QueryParameters`] - Bound parameter values
//! - [`SortDirection`] - Fetch ordering
//! - [`Pagination`], [`Page`] - Offset pagination for fetched records
//!
//! # Examples
//!
//! ```
//! use folio_persistence::types::{QueryParameters, QueryValue, RecordKind};
//!
//! assert_eq!(RecordKind::Task.variable(), "task");
//!
//! let mut params = QueryParameters::new();
//! params.insert("sessionClientId".to_string(), QueryValue::from(1));
//! ```

mod pagination;
mod record_kind;
mod values;

pub use pagination::{MAX_PAGE_SIZE, Page, Pagination};
pub use record_kind::{RecordId, RecordKind};
pub use values::{QueryParameters, QueryValue, SortDirection};
