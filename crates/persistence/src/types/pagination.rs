//! Pagination types for list results.
//!
//! List views page through results by offset; the page size is capped so a
//! single request cannot pull an entire table.

use serde::{Deserialize, Serialize};

/// Largest page a single fetch may request.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Offset-based pagination for a fetch statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Number of records to skip.
    pub offset: u32,

    /// Maximum number of records to return.
    pub limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 25,
        }
    }
}

impl Pagination {
    /// Creates pagination with the given offset and limit.
    ///
    /// The limit is clamped to `1..=MAX_PAGE_SIZE`.
    pub fn new(offset: u32, limit: u32) -> Self {
        Self {
            offset,
            limit: limit.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Creates pagination for the first page of the given size.
    pub fn first(limit: u32) -> Self {
        Self::new(0, limit)
    }

    /// Returns the pagination for the following page.
    pub fn next(&self) -> Self {
        Self {
            offset: self.offset.saturating_add(self.limit),
            limit: self.limit,
        }
    }
}

/// A page of fetched records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    /// The records on this page.
    pub items: Vec<T>,

    /// Total number of matching records, when it was counted.
    pub total: Option<u64>,

    /// The pagination that produced this page.
    pub pagination: Pagination,
}

impl<T> Page<T> {
    /// Creates a new page.
    pub fn new(items: Vec<T>, pagination: Pagination) -> Self {
        Self {
            items,
            total: None,
            pagination,
        }
    }

    /// Sets the total count.
    pub fn with_total(mut self, total: u64) -> Self {
        self.total = Some(total);
        self
    }

    /// Returns true if there are more matches after this page.
    ///
    /// Without a total, a full page is assumed to have a successor.
    pub fn has_more(&self) -> bool {
        let end = u64::from(self.pagination.offset) + self.items.len() as u64;
        match self.total {
            Some(total) => end < total,
            None => self.items.len() as u32 >= self.pagination.limit,
        }
    }

    /// Returns the number of items on this page.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the page is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
