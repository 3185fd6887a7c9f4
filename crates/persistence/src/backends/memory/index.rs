//! In-memory search index.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{IndexQuery, IndexSearcher};
use crate::error::IndexError;
use crate::search::TokenNormalizer;
use crate::types::RecordId;

/// Index field that matches text in any field.
const SEARCH_FIELD: &str = "search";

/// A value of an indexed document field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Plain text.
    Text(String),
    /// Keyed text, e.g. metadata entries or properties.
    Keyed(BTreeMap<String, String>),
}

/// A process as mirrored into the search index.
///
/// Serialized flat: `{"id": 7, "search": "Faust", "meta": {"author": "Goethe"}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDocument {
    /// Process id.
    pub id: RecordId,

    /// Indexed fields by index key.
    #[serde(flatten)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl IndexDocument {
    /// Creates a document without fields.
    pub fn new(id: RecordId) -> Self {
        Self {
            id,
            fields: BTreeMap::new(),
        }
    }

    /// Adds a text field.
    pub fn with_text(mut self, field: impl Into<String>, text: impl Into<String>) -> Self {
        self.fields.insert(field.into(), FieldValue::Text(text.into()));
        self
    }

    /// Adds a keyed entry to a field.
    pub fn with_entry(
        mut self,
        field: impl Into<String>,
        key: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        let entry = self
            .fields
            .entry(field.into())
            .or_insert_with(|| FieldValue::Keyed(BTreeMap::new()));
        match entry {
            FieldValue::Keyed(map) => {
                map.insert(key.into(), text.into());
            }
            FieldValue::Text(_) => {
                let mut map = BTreeMap::new();
                map.insert(key.into(), text.into());
                *entry = FieldValue::Keyed(map);
            }
        }
        self
    }
}

#[derive(Debug)]
struct Entry {
    field: String,
    sub_key: Option<String>,
    tokens: HashSet<String>,
}

/// Search index kept in memory.
///
/// Documents are tokenized with the same normalization the parser applies to
/// user input, without a minimum length. A lookup matches a document when all
/// tokens occur in the addressed field (or any field, for `search`), narrowed
/// to the sub-key if one is given.
///
/// # Example
///
/// ```
/// use folio_persistence::backends::memory::{IndexDocument, MemoryIndex};
/// use folio_persistence::core::{IndexQuery, IndexSearcher};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let index = MemoryIndex::new();
/// index.insert(IndexDocument::new(7).with_entry("meta", "author", "Goethe"));
///
/// let query = IndexQuery::new("meta", vec!["goethe".to_string()]).with_sub_key("author");
/// assert_eq!(index.search_ids(&query).await?, vec![7]);
/// # Ok(())
/// # }
/// ```
pub struct MemoryIndex {
    documents: RwLock<BTreeMap<RecordId, Vec<Entry>>>,
    normalizer: TokenNormalizer,
}

impl MemoryIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(BTreeMap::new()),
            normalizer: TokenNormalizer::new(1),
        }
    }

    /// Creates an index holding the given documents.
    pub fn from_documents(documents: impl IntoIterator<Item = IndexDocument>) -> Self {
        let index = Self::new();
        for document in documents {
            index.insert(document);
        }
        index
    }

    /// Creates an index from a JSON array of documents.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let documents: Vec<IndexDocument> = serde_json::from_str(json)?;
        Ok(Self::from_documents(documents))
    }

    /// Adds or replaces a document.
    pub fn insert(&self, document: IndexDocument) {
        let mut entries = Vec::new();
        for (field, value) in document.fields {
            match value {
                FieldValue::Text(text) => entries.push(Entry {
                    tokens: self.tokens(&text),
                    field,
                    sub_key: None,
                }),
                FieldValue::Keyed(map) => {
                    for (key, text) in map {
                        entries.push(Entry {
                            field: field.clone(),
                            sub_key: Some(key.to_lowercase()),
                            tokens: self.tokens(&text),
                        });
                    }
                }
            }
        }
        self.documents.write().insert(document.id, entries);
    }

    /// Removes a document, returning true if it was present.
    pub fn remove(&self, id: RecordId) -> bool {
        self.documents.write().remove(&id).is_some()
    }

    /// Returns the number of documents.
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    /// Returns true if the index holds no documents.
    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    fn tokens(&self, text: &str) -> HashSet<String> {
        self.normalizer.normalize(text).into_iter().collect()
    }

    fn matches(entries: &[Entry], query: &IndexQuery) -> bool {
        let sub_key = query.sub_key.as_ref().map(|k| k.to_lowercase());
        let mut candidates = entries
            .iter()
            .filter(|e| query.field == SEARCH_FIELD || e.field == query.field)
            .filter(|e| sub_key.is_none() || e.sub_key == sub_key)
            .peekable();

        if query.tokens.is_empty() {
            return candidates.peek().is_some();
        }

        let available: HashSet<&str> = candidates
            .flat_map(|e| e.tokens.iter().map(String::as_str))
            .collect();
        query.tokens.iter().all(|t| available.contains(t.as_str()))
    }
}

impl Default for MemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryIndex")
            .field("documents", &self.len())
            .finish()
    }
}

#[async_trait]
impl IndexSearcher for MemoryIndex {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn search_ids(&self, query: &IndexQuery) -> Result<Vec<RecordId>, IndexError> {
        let documents = self.documents.read();
        let ids: Vec<RecordId> = documents
            .iter()
            .filter(|(_, entries)| Self::matches(entries, query))
            .map(|(id, _)| *id)
            .collect();
        debug!(%query, hits = ids.len(), "memory index lookup");
        Ok(ids)
    }
}
