//! The user filter language.
//!
//! - [`registry`] - Known field names and how each field is queried
//! - [`parser`] - Filter string to [`ParsedFilter`]
//! - [`atoms`] - Typed filter terms and their rendering
//! - [`normalize`] - Index token normalization
//!
//! # Example
//!
//! ```
//! use folio_persistence::search::{FilterAtom, FilterField, FilterParser};
//!
//! let parser = FilterParser::default();
//! let filter = parser.parse("project:Example -step:done \"id: 12-45\"");
//!
//! assert_eq!(
//!     filter.fields(),
//!     vec![FilterField::Project, FilterField::Task, FilterField::ProcessId]
//! );
//! assert!(matches!(
//!     filter.get(FilterField::ProcessId).unwrap()[0],
//!     FilterAtom::Identifier(_)
//! ));
//! ```

pub mod atoms;
pub mod normalize;
pub mod parser;
pub mod registry;

pub use atoms::{FilterAtom, IdentifierAtom, Identifiers, IndexAtom, RelationalAtom};
pub use normalize::TokenNormalizer;
pub use parser::{FilterParser, ParsedFilter};
pub use registry::{FieldDescriptor, FieldRegistry, FilterField, LikeSearch};
