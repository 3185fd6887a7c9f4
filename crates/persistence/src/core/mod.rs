//! Collaborator traits.
//!
//! The filter layer compiles statements but executes nothing itself:
//!
//! - [`IndexSearcher`] - Resolves index lookups into process ids
//! - [`RecordStore`] - Runs count and fetch statements
//!
//! ```text
//! filter string ─► parser ─► QueryBuilder ─► pending lookups ─► IndexSearcher
//!                                   │
//!                                   └──► statements + parameters ─► RecordStore
//! ```

mod index;
mod store;

pub use index::{IndexQuery, IndexSearcher};
pub use store::RecordStore;
