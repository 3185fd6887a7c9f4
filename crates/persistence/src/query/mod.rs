//! Statement building.
//!
//! - [`QueryBuilder`] - Accumulates restrictions and renders count/fetch statements
//! - [`Restriction`] - A fragment with its bound parameters and pending lookups
//!
//! # Example
//!
//! ```
//! use folio_persistence::query::QueryBuilder;
//! use folio_persistence::search::FilterParser;
//! use folio_persistence::types::{RecordKind, SortDirection};
//!
//! let parser = FilterParser::default();
//! let mut query = QueryBuilder::new(RecordKind::Process);
//! query
//!     .restrict_to_client(1)
//!     .unwrap()
//!     .restrict_with_user_filter(&parser.parse("project:Example -id:3"))
//!     .define_sorting("title", SortDirection::Descending);
//!
//! assert_eq!(
//!     query.form_count_query(),
//!     "SELECT COUNT(*) FROM Process AS process \
//!      WHERE process.project.client.id = :sessionClientId \
//!      AND process.project.title = :userFilter1 AND process.id != :userFilter2"
//! );
//! ```

mod builder;
mod restriction;

pub use builder::{COMPLETED_STATE, NO_HIT, QueryBuilder};
pub use restriction::{PendingLookup, Restriction, SQL_FALSE};
