//! Test infrastructure for the filter layer.
//!
//! Provides collaborator doubles for the search index and the record store,
//! and a seeded in-memory index shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use folio_persistence::backends::memory::{IndexDocument, MemoryIndex};
use folio_persistence::config::FilterSettings;
use folio_persistence::core::{IndexQuery, IndexSearcher, RecordStore};
use folio_persistence::error::{IndexError, StoreError};
use folio_persistence::service::FilterService;
use folio_persistence::types::{QueryParameters, RecordId};

/// Returns an index with a handful of processes.
///
/// | id | content |
/// |----|---------|
/// | 10 | "Faust", author Goethe, batch "Spring Delivery" |
/// | 11 | "Faust Zweiter Teil", author Goethe |
/// | 12 | "Die Räuber", author Schiller, property Digitized |
pub fn seeded_index() -> MemoryIndex {
    MemoryIndex::from_documents([
        IndexDocument::new(10)
            .with_text("search", "Faust")
            .with_entry("meta", "author", "Johann Wolfgang Goethe")
            .with_text("batch", "Spring Delivery"),
        IndexDocument::new(11)
            .with_text("search", "Faust Zweiter Teil")
            .with_entry("meta", "author", "Johann Wolfgang Goethe"),
        IndexDocument::new(12)
            .with_text("search", "Die Räuber")
            .with_entry("meta", "author", "Friedrich Schiller")
            .with_entry("property", "Digitized", "yes"),
    ])
}

/// Returns a service over [`seeded_index`] with default settings.
pub fn seeded_service() -> FilterService {
    FilterService::new(Arc::new(seeded_index()), FilterSettings::default())
}

/// A statement received by [`RecordingStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub statement: String,
    pub parameters: QueryParameters,
    pub page: Option<(u32, u32)>,
}

/// Record store serving a fixed list of ids and remembering every statement.
#[derive(Debug, Default)]
pub struct RecordingStore {
    records: Vec<RecordId>,
    calls: Mutex<Vec<Call>>,
}

impl RecordingStore {
    pub fn new(records: impl IntoIterator<Item = RecordId>) -> Self {
        Self {
            records: records.into_iter().collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn fetch_calls(&self) -> usize {
        self.calls.lock().iter().filter(|c| c.page.is_some()).count()
    }
}

#[async_trait]
impl RecordStore for RecordingStore {
    type Record = RecordId;

    async fn count(
        &self,
        statement: &str,
        parameters: &QueryParameters,
    ) -> Result<u64, StoreError> {
        self.calls.lock().push(Call {
            statement: statement.to_string(),
            parameters: parameters.clone(),
            page: None,
        });
        Ok(self.records.len() as u64)
    }

    async fn fetch(
        &self,
        statement: &str,
        parameters: &QueryParameters,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<RecordId>, StoreError> {
        self.calls.lock().push(Call {
            statement: statement.to_string(),
            parameters: parameters.clone(),
            page: Some((offset, limit)),
        });
        Ok(self
            .records
            .iter()
            .copied()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }
}

/// Record store that cannot be reached.
#[derive(Debug, Default)]
pub struct UnavailableStore;

#[async_trait]
impl RecordStore for UnavailableStore {
    type Record = RecordId;

    async fn count(&self, _: &str, _: &QueryParameters) -> Result<u64, StoreError> {
        Err(StoreError::Unavailable {
            message: "connection refused".to_string(),
        })
    }

    async fn fetch(
        &self,
        _: &str,
        _: &QueryParameters,
        _: u32,
        _: u32,
    ) -> Result<Vec<RecordId>, StoreError> {
        Err(StoreError::Unavailable {
            message: "connection refused".to_string(),
        })
    }
}

/// Search index that fails every lookup and counts the attempts.
#[derive(Debug, Default)]
pub struct FailingIndex {
    attempts: AtomicUsize,
}

impl FailingIndex {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IndexSearcher for FailingIndex {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn search_ids(&self, _query: &IndexQuery) -> Result<Vec<RecordId>, IndexError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(IndexError::Unavailable {
            message: "index offline".to_string(),
        })
    }
}
