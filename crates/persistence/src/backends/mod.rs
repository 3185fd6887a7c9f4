//! Collaborator implementations.
//!
//! | Backend | Implements | Description |
//! |---------|------------|-------------|
//! | [`memory::MemoryIndex`] | [`IndexSearcher`](crate::core::IndexSearcher) | Search index kept in memory, seeded from JSON |
//!
//! Production deployments supply their own index client and record store.

pub mod memory;
