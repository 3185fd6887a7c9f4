//! Filter field registry.
//!
//! The registry maps the field names users type in front of a colon
//! (`project:`, `schritt:`, `vorlage:`, ...) to a closed set of
//! [`FilterField`]s. Each field carries a static [`FieldDescriptor`] that says
//! how a value for it is queried: through a relational template per record
//! kind, through the search index, or both.
//!
//! # Templates
//!
//! Relational templates use four placeholders:
//!
//! | Placeholder | Replaced with |
//! |---|---|
//! | `~` | the record variable, e.g. `process` |
//! | `$` | the compared column (identifier or text column, chosen by the atom) |
//! | `#` | the comparison operand, e.g. `= :p` or `BETWEEN :p AND :pUpTo` |
//! | `:queryObject` | the parameter holding the fixed comparison value |

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::RecordKind;

/// Whether and how a relational text comparison may use `LIKE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum LikeSearch {
    /// Always compare with `=`; `*` is taken literally.
    #[default]
    No,
    /// Use `LIKE` only when the value contains a `*` wildcard.
    Allowed,
    /// Always use `LIKE`, with a wildcard appended on the right.
    AlwaysRight,
}

/// Static description of one filterable attribute.
#[derive(Debug, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Canonical key.
    pub key: &'static str,

    /// Lower-case names accepted in front of the colon.
    pub aliases: &'static [&'static str],

    /// Relational template for process-rooted queries.
    pub process_template: Option<&'static str>,

    /// Relational template for task-rooted queries.
    pub task_template: Option<&'static str>,

    /// Column compared by identifier atoms. Fields without one never parse ids.
    pub id_column: Option<&'static str>,

    /// Column compared by relational text atoms.
    pub text_column: Option<&'static str>,

    /// LIKE policy for text comparisons.
    pub like_search: LikeSearch,

    /// Fixed value bound as `:queryObject` regardless of user input.
    pub query_object: Option<i32>,

    /// Field key in the search index.
    pub index_key: Option<&'static str>,

    /// Domain tag of divisible fields, whose values may carry a `key:value` pair.
    pub domain: Option<&'static str>,
}

impl FieldDescriptor {
    /// Returns the relational template for a record kind.
    pub fn template(&self, kind: RecordKind) -> Option<&'static str> {
        match kind {
            RecordKind::Process => self.process_template,
            RecordKind::Task => self.task_template,
            _ => None,
        }
    }

    /// Returns true if the field is queried through the search index only.
    pub fn is_index_only(&self) -> bool {
        self.process_template.is_none() && self.task_template.is_none()
    }

    /// Returns true if values may carry a `key:value` pair.
    pub fn is_divisible(&self) -> bool {
        self.domain.is_some()
    }

    /// Returns true if numeric values are parsed as identifiers.
    pub fn accepts_identifiers(&self) -> bool {
        self.id_column.is_some()
    }
}

const PROCESS_TASK_TEMPLATE: &str = "EXISTS (SELECT 1 FROM ~.tasks t WHERE t.$ #)";
const PROCESS_TASK_STATUS_TEMPLATE: &str =
    "EXISTS (SELECT 1 FROM ~.tasks t WHERE t.processingStatus = :queryObject AND t.$ #)";
const TASK_STATUS_TEMPLATE: &str = "(~.processingStatus = :queryObject AND ~.$ #)";

static SEARCH: FieldDescriptor = FieldDescriptor {
    key: "search",
    aliases: &["", "search", "suche"],
    process_template: None,
    task_template: None,
    id_column: None,
    text_column: None,
    like_search: LikeSearch::No,
    query_object: None,
    index_key: Some("search"),
    domain: None,
};

static PROCESS_ID: FieldDescriptor = FieldDescriptor {
    key: "processId",
    aliases: &["id", "processid", "vorgangsid"],
    process_template: Some("~.$ #"),
    task_template: Some("~.process.$ #"),
    id_column: Some("id"),
    text_column: Some("title"),
    like_search: LikeSearch::AlwaysRight,
    query_object: None,
    index_key: None,
    domain: None,
};

static PARENT_PROCESS_ID: FieldDescriptor = FieldDescriptor {
    key: "parentProcessId",
    aliases: &["parentprocessid", "elternvorgangsid"],
    process_template: Some("~.parent.$ #"),
    task_template: Some("~.process.parent.$ #"),
    id_column: Some("id"),
    text_column: None,
    like_search: LikeSearch::No,
    query_object: None,
    index_key: None,
    domain: None,
};

static PROCESS_TITLE: FieldDescriptor = FieldDescriptor {
    key: "processTitle",
    aliases: &["process", "prozess", "title", "titel"],
    process_template: Some("~.$ #"),
    task_template: Some("~.process.$ #"),
    id_column: None,
    text_column: Some("title"),
    like_search: LikeSearch::Allowed,
    query_object: None,
    index_key: None,
    domain: None,
};

static PROJECT: FieldDescriptor = FieldDescriptor {
    key: "project",
    aliases: &["project", "projekt"],
    process_template: Some("~.project.$ #"),
    task_template: Some("~.process.project.$ #"),
    id_column: Some("id"),
    text_column: Some("title"),
    like_search: LikeSearch::Allowed,
    query_object: None,
    index_key: None,
    domain: None,
};

static BATCH: FieldDescriptor = FieldDescriptor {
    key: "batch",
    aliases: &["batch", "gruppe"],
    process_template: Some("EXISTS (SELECT 1 FROM ~.batches b WHERE b.$ #)"),
    task_template: Some("EXISTS (SELECT 1 FROM ~.process.batches b WHERE b.$ #)"),
    id_column: Some("id"),
    text_column: None,
    like_search: LikeSearch::No,
    query_object: None,
    index_key: Some("batch"),
    domain: None,
};

static TASK: FieldDescriptor = FieldDescriptor {
    key: "task",
    aliases: &["step", "schritt", "task", "aufgabe"],
    process_template: Some(PROCESS_TASK_TEMPLATE),
    task_template: Some("~.$ #"),
    id_column: Some("ordering"),
    text_column: Some("title"),
    like_search: LikeSearch::Allowed,
    query_object: None,
    index_key: None,
    domain: None,
};

static TASK_UNREADY: FieldDescriptor = FieldDescriptor {
    key: "taskUnready",
    aliases: &["steplocked", "schrittgesperrt"],
    process_template: Some(PROCESS_TASK_STATUS_TEMPLATE),
    task_template: Some(TASK_STATUS_TEMPLATE),
    id_column: Some("ordering"),
    text_column: Some("title"),
    like_search: LikeSearch::Allowed,
    query_object: Some(0),
    index_key: None,
    domain: None,
};

static TASK_READY: FieldDescriptor = FieldDescriptor {
    key: "taskReady",
    aliases: &["stepopen", "schrittoffen"],
    process_template: Some(PROCESS_TASK_STATUS_TEMPLATE),
    task_template: Some(TASK_STATUS_TEMPLATE),
    id_column: Some("ordering"),
    text_column: Some("title"),
    like_search: LikeSearch::Allowed,
    query_object: Some(1),
    index_key: None,
    domain: None,
};

static TASK_ONGOING: FieldDescriptor = FieldDescriptor {
    key: "taskOngoing",
    aliases: &["stepinwork", "schrittinarbeit"],
    process_template: Some(PROCESS_TASK_STATUS_TEMPLATE),
    task_template: Some(TASK_STATUS_TEMPLATE),
    id_column: Some("ordering"),
    text_column: Some("title"),
    like_search: LikeSearch::Allowed,
    query_object: Some(2),
    index_key: None,
    domain: None,
};

static TASK_FINISHED: FieldDescriptor = FieldDescriptor {
    key: "taskFinished",
    aliases: &["stepdone", "schrittabgeschlossen"],
    process_template: Some(PROCESS_TASK_STATUS_TEMPLATE),
    task_template: Some(TASK_STATUS_TEMPLATE),
    id_column: Some("ordering"),
    text_column: Some("title"),
    like_search: LikeSearch::Allowed,
    query_object: Some(3),
    index_key: None,
    domain: None,
};

static TASK_FINISHED_USER: FieldDescriptor = FieldDescriptor {
    key: "taskFinishedUser",
    aliases: &["stepdoneuser", "abgeschlossenerschrittbenutzer"],
    process_template: Some(PROCESS_TASK_STATUS_TEMPLATE),
    task_template: Some(TASK_STATUS_TEMPLATE),
    id_column: None,
    text_column: Some("processingUser.login"),
    like_search: LikeSearch::AlwaysRight,
    query_object: Some(3),
    index_key: None,
    domain: None,
};

static TASK_AUTOMATIC: FieldDescriptor = FieldDescriptor {
    key: "taskAutomatic",
    aliases: &["stepautomatic", "schrittautomatisch"],
    process_template: Some(
        "EXISTS (SELECT 1 FROM ~.tasks t WHERE t.processingStatus = :queryObject AND t.typeAutomatic = true AND t.$ #)",
    ),
    task_template: Some("(~.processingStatus = :queryObject AND ~.typeAutomatic = true AND ~.$ #)"),
    id_column: Some("ordering"),
    text_column: Some("title"),
    like_search: LikeSearch::Allowed,
    query_object: Some(1),
    index_key: None,
    domain: None,
};

static PROPERTY: FieldDescriptor = FieldDescriptor {
    key: "property",
    aliases: &["property", "eigenschaft", "processproperty", "prozesseigenschaft"],
    process_template: None,
    task_template: None,
    id_column: None,
    text_column: None,
    like_search: LikeSearch::No,
    query_object: None,
    index_key: Some("property"),
    domain: Some("property"),
};

static TEMPLATE: FieldDescriptor = FieldDescriptor {
    key: "template",
    aliases: &["template", "vorlage"],
    process_template: None,
    task_template: None,
    id_column: None,
    text_column: None,
    like_search: LikeSearch::No,
    query_object: None,
    index_key: Some("template"),
    domain: Some("template"),
};

static WORKPIECE: FieldDescriptor = FieldDescriptor {
    key: "workpiece",
    aliases: &["workpiece", "werkstueck"],
    process_template: None,
    task_template: None,
    id_column: None,
    text_column: None,
    like_search: LikeSearch::No,
    query_object: None,
    index_key: Some("workpiece"),
    domain: Some("workpiece"),
};

static METADATA: FieldDescriptor = FieldDescriptor {
    key: "metadata",
    aliases: &["metadata", "metadaten"],
    process_template: None,
    task_template: None,
    id_column: None,
    text_column: None,
    like_search: LikeSearch::No,
    query_object: None,
    index_key: Some("meta"),
    domain: Some("meta"),
};

/// The closed set of filterable fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterField {
    /// Free-text fall-through field.
    Search,
    /// Process id, or process title when the value is not numeric.
    ProcessId,
    /// Id of the parent process.
    ParentProcessId,
    /// Process title.
    ProcessTitle,
    /// Project id or title.
    Project,
    /// Batch id, or batch text through the index.
    Batch,
    /// Task ordering or title, in any status.
    Task,
    /// Task that is locked.
    TaskUnready,
    /// Task that is open.
    TaskReady,
    /// Task that is in work.
    TaskOngoing,
    /// Task that is done.
    TaskFinished,
    /// Login of the user who finished a task.
    TaskFinishedUser,
    /// Open automatic task.
    TaskAutomatic,
    /// Process property, optionally `name:value`.
    Property,
    /// Template property, optionally `name:value`.
    Template,
    /// Workpiece property, optionally `name:value`.
    Workpiece,
    /// Descriptive metadata, optionally `key:value`.
    Metadata,
}

impl FilterField {
    /// All fields, in declaration order.
    pub const ALL: [FilterField; 17] = [
        FilterField::Search,
        FilterField::ProcessId,
        FilterField::ParentProcessId,
        FilterField::ProcessTitle,
        FilterField::Project,
        FilterField::Batch,
        FilterField::Task,
        FilterField::TaskUnready,
        FilterField::TaskReady,
        FilterField::TaskOngoing,
        FilterField::TaskFinished,
        FilterField::TaskFinishedUser,
        FilterField::TaskAutomatic,
        FilterField::Property,
        FilterField::Template,
        FilterField::Workpiece,
        FilterField::Metadata,
    ];

    /// Returns the static descriptor of this field.
    pub fn descriptor(&self) -> &'static FieldDescriptor {
        match self {
            FilterField::Search => &SEARCH,
            FilterField::ProcessId => &PROCESS_ID,
            FilterField::ParentProcessId => &PARENT_PROCESS_ID,
            FilterField::ProcessTitle => &PROCESS_TITLE,
            FilterField::Project => &PROJECT,
            FilterField::Batch => &BATCH,
            FilterField::Task => &TASK,
            FilterField::TaskUnready => &TASK_UNREADY,
            FilterField::TaskReady => &TASK_READY,
            FilterField::TaskOngoing => &TASK_ONGOING,
            FilterField::TaskFinished => &TASK_FINISHED,
            FilterField::TaskFinishedUser => &TASK_FINISHED_USER,
            FilterField::TaskAutomatic => &TASK_AUTOMATIC,
            FilterField::Property => &PROPERTY,
            FilterField::Template => &TEMPLATE,
            FilterField::Workpiece => &WORKPIECE,
            FilterField::Metadata => &METADATA,
        }
    }

    /// Returns the canonical key.
    pub fn key(&self) -> &'static str {
        self.descriptor().key
    }
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Case-insensitive lookup of filter fields by alias.
///
/// Built once and shared read-only (typically behind an `Arc`).
pub struct FieldRegistry {
    by_alias: HashMap<&'static str, FilterField>,
}

impl FieldRegistry {
    /// Creates a registry over all standard fields.
    pub fn new() -> Self {
        let mut by_alias = HashMap::new();
        for field in FilterField::ALL {
            for alias in field.descriptor().aliases {
                by_alias.insert(*alias, field);
            }
        }
        Self { by_alias }
    }

    /// Resolves a user-typed field name.
    ///
    /// Matching ignores case and surrounding whitespace. The empty name
    /// resolves to the fall-through field.
    pub fn resolve(&self, name: &str) -> Option<FilterField> {
        let name = name.trim();
        if let Some(field) = self.by_alias.get(name) {
            return Some(*field);
        }
        self.by_alias.get(name.to_lowercase().as_str()).copied()
    }

    /// Returns the field free text and unknown names fall through to.
    pub fn fall_through(&self) -> FilterField {
        FilterField::Search
    }

    /// Returns the number of registered aliases.
    pub fn alias_count(&self) -> usize {
        self.by_alias.len()
    }
}

impl Default for FieldRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FieldRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldRegistry")
            .field("alias_count", &self.by_alias.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_case_insensitive() {
        let registry = FieldRegistry::new();
        assert_eq!(registry.resolve("Project"), Some(FilterField::Project));
        assert_eq!(registry.resolve("PROJEKT"), Some(FilterField::Project));
        assert_eq!(registry.resolve("Schritt"), Some(FilterField::Task));
        assert_eq!(registry.resolve("stepDone"), Some(FilterField::TaskFinished));
    }

    #[test]
    fn test_empty_name_falls_through() {
        let registry = FieldRegistry::new();
        assert_eq!(registry.resolve(""), Some(FilterField::Search));
        assert_eq!(registry.resolve("  "), Some(FilterField::Search));
        assert_eq!(registry.fall_through(), FilterField::Search);
    }

    #[test]
    fn test_unknown_name() {
        let registry = FieldRegistry::new();
        assert_eq!(registry.resolve("colour"), None);
    }

    #[test]
    fn test_legacy_aliases_map_to_property() {
        let registry = FieldRegistry::new();
        assert_eq!(registry.resolve("processproperty"), Some(FilterField::Property));
        assert_eq!(registry.resolve("Eigenschaft"), Some(FilterField::Property));
    }

    #[test]
    fn test_aliases_are_unique_and_lowercase() {
        let registry = FieldRegistry::new();
        let total: usize = FilterField::ALL
            .iter()
            .map(|f| f.descriptor().aliases.len())
            .sum();
        assert_eq!(registry.alias_count(), total);

        for field in FilterField::ALL {
            for alias in field.descriptor().aliases {
                assert_eq!(*alias, alias.to_lowercase());
            }
        }
    }

    #[test]
    fn test_descriptor_invariants() {
        for field in FilterField::ALL {
            let d = field.descriptor();

            // both templates or none
            assert_eq!(
                d.process_template.is_some(),
                d.task_template.is_some(),
                "{}",
                field
            );

            if d.is_divisible() {
                assert!(d.is_index_only(), "{}", field);
            }

            if d.query_object.is_some() {
                assert!(d.process_template.unwrap().contains(":queryObject"));
                assert!(d.task_template.unwrap().contains(":queryObject"));
            }

            if let Some(template) = d.process_template {
                assert!(template.contains('~') && template.contains('$') && template.contains('#'));
                assert!(d.id_column.is_some() || d.text_column.is_some(), "{}", field);
            } else {
                assert!(d.index_key.is_some(), "{}", field);
            }
        }
    }

    #[test]
    fn test_template_by_kind() {
        let d = FilterField::Project.descriptor();
        assert_eq!(d.template(RecordKind::Process), Some("~.project.$ #"));
        assert_eq!(d.template(RecordKind::Task), Some("~.process.project.$ #"));
        assert_eq!(d.template(RecordKind::User), None);
    }

    #[test]
    fn test_field_serializes_as_key() {
        for field in FilterField::ALL {
            let json = serde_json::to_string(&field).unwrap();
            assert_eq!(json, format!("\"{}\"", field.key()));
        }
    }
}
