//! Record kinds a filter query can target.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier of a persisted record, as stored in the relational id column.
pub type RecordId = i32;

/// The base entity type a query is rooted at.
///
/// Only [`RecordKind::Process`] and [`RecordKind::Task`] carry relational
/// filter templates. The other kinds are accepted by the query builder for
/// plain restrictions and the structural restrictions that apply to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    /// A batch of processes.
    Batch,
    /// A tenant.
    Client,
    /// A docket (print layout).
    Docket,
    /// A digitization process; the primary filterable kind.
    Process,
    /// A project grouping processes.
    Project,
    /// A user role.
    Role,
    /// A metadata ruleset.
    Ruleset,
    /// A workflow task; the secondary filterable kind.
    Task,
    /// A process template.
    Template,
    /// A user account.
    User,
    /// A workflow definition.
    Workflow,
}

impl RecordKind {
    /// All kinds, in declaration order.
    pub const ALL: [RecordKind; 11] = [
        RecordKind::Batch,
        RecordKind::Client,
        RecordKind::Docket,
        RecordKind::Process,
        RecordKind::Project,
        RecordKind::Role,
        RecordKind::Ruleset,
        RecordKind::Task,
        RecordKind::Template,
        RecordKind::User,
        RecordKind::Workflow,
    ];

    /// Returns the entity name used in the `FROM` clause.
    pub fn entity_name(&self) -> &'static str {
        match self {
            RecordKind::Batch => "Batch",
            RecordKind::Client => "Client",
            RecordKind::Docket => "Docket",
            RecordKind::Process => "Process",
            RecordKind::Project => "Project",
            RecordKind::Role => "Role",
            RecordKind::Ruleset => "Ruleset",
            RecordKind::Task => "Task",
            RecordKind::Template => "Template",
            RecordKind::User => "User",
            RecordKind::Workflow => "Workflow",
        }
    }

    /// Returns the record variable used throughout a statement (`process`, `task`, ...).
    pub fn variable(&self) -> String {
        self.entity_name().to_lowercase()
    }

    /// Returns the path to the process id of a record, relative to its variable.
    ///
    /// Index lookups always answer with process ids, so task queries compare
    /// against the owning process.
    pub fn process_id_column(&self) -> &'static str {
        match self {
            RecordKind::Task => "process.id",
            _ => "id",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.entity_name())
    }
}

impl FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordKind::ALL
            .into_iter()
            .find(|kind| kind.entity_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown record kind: {}", s))
    }
}
