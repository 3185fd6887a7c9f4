//! Folio Persistence Filter Layer
//!
//! This crate turns the single filter line users type above process and task
//! lists into executable statements. A filter such as
//! `project:Example -step:done "id: 12-45"` is parsed into typed atoms, each
//! atom is rendered into a restriction for the queried record kind, and atoms
//! that need the full-text index are resolved into process ids before the
//! statements are handed to the record store.
//!
//! # Features
//!
//! - **Forgiving grammar**: Quoting, `|` alternatives, negation and English
//!   and German field names. Nothing the user types is rejected.
//! - **Typed atoms**: Text comparisons with a per-field LIKE policy, id
//!   ranges and lists, and index lookups with sub-keys.
//! - **Statement builder**: Count and fetch statements for processes, tasks
//!   and the other record kinds, with session scoping and sorting.
//! - **Pluggable collaborators**: The search index and the record store are
//!   traits; an in-memory index ships for tests and tooling.
//!
//! # Architecture
//!
//! - [`search`] - Field registry, parser, atoms and token normalization
//! - [`query`] - Query builder and restriction fragments
//! - [`service`] - Orchestration of parse, index resolution and execution
//! - [`core`] - Collaborator traits for the search index and record store
//! - [`backends`] - Collaborator implementations
//! - [`types`] - Record kinds, parameter values and pagination
//! - [`config`] - Filter settings
//! - [`error`] - Error types for all operations
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use folio_persistence::backends::memory::{IndexDocument, MemoryIndex};
//! use folio_persistence::config::FilterSettings;
//! use folio_persistence::service::{FilterService, QueryScope};
//! use folio_persistence::types::{QueryValue, RecordKind};
//!
//! # async fn example() -> Result<(), folio_persistence::error::FilterError> {
//! let index = MemoryIndex::from_documents([
//!     IndexDocument::new(7).with_entry("meta", "author", "Goethe"),
//! ]);
//! let service = FilterService::new(Arc::new(index), FilterSettings::default());
//!
//! let compiled = service
//!     .compile(
//!         RecordKind::Process,
//!         "metadata:author:goethe -stepdone:Export",
//!         &QueryScope::new().with_client(1),
//!     )
//!     .await?;
//!
//! assert_eq!(
//!     compiled.parameters["userFilter1"],
//!     QueryValue::IntegerList(vec![7])
//! );
//! # Ok(())
//! # }
//! ```
//!
//! # Filter Grammar
//!
//! | Input | Meaning |
//! |---|---|
//! | `faust` | free text in the search index |
//! | `project:Example` | project title equals `Example` |
//! | `title:Fau*` | title LIKE `Fau%` |
//! | `-step:done` | no task titled `done` |
//! | `"id: 12-45"` | process id between 12 and 45 |
//! | `"id: 5-9\|id: 20"` | process id between 5 and 9, or 20 |
//! | `metadata:author:goethe` | metadata entry `author` contains `goethe` |
//! | `batch:` | process belongs to any batch |

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod config;
pub mod core;
pub mod error;
pub mod query;
pub mod search;
pub mod service;
pub mod types;

// Re-export commonly used types at the crate root
pub use config::{FilterSettings, IndexFailurePolicy};
pub use error::{FilterError, FilterResult, IndexError, QueryError, StoreError};
pub use query::QueryBuilder;
pub use search::{FieldRegistry, FilterAtom, FilterField, FilterParser, ParsedFilter};
pub use service::{CompiledQuery, FilterService, QueryScope};
pub use types::{QueryParameters, QueryValue, RecordId, RecordKind};
