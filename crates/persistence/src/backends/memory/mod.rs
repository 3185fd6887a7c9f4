//! In-memory collaborators for tests and the command-line tool.

mod index;

pub use index::{FieldValue, IndexDocument, MemoryIndex};
