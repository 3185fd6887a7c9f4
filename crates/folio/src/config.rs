//! Command-line configuration.
//!
//! Every option can also be set through the environment.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `FOLIO_RECORD_KIND` | Process | Record kind to query |
//! | `FOLIO_CLIENT_ID` | - | Restrict to a client |
//! | `FOLIO_PROJECT_IDS` | - | Restrict to projects (comma-separated) |
//! | `FOLIO_ROLE_IDS` | - | Restrict to roles (comma-separated) |
//! | `FOLIO_INDEX_SEED` | - | JSON file of index documents |
//! | `FOLIO_MIN_TOKEN_LENGTH` | 3 | Shortest index token kept |
//! | `FOLIO_INDEX_FAILURE` | propagate | `propagate` or `no-matches` |
//! | `FOLIO_LOG_LEVEL` | info | Log level |

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use folio_persistence::config::{FilterSettings, IndexFailurePolicy};
use folio_persistence::service::QueryScope;
use folio_persistence::types::{RecordKind, SortDirection};

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Index failure handling as given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IndexFailure {
    /// Fail the command.
    Propagate,
    /// Treat the lookup as matching nothing.
    NoMatches,
}

impl From<IndexFailure> for IndexFailurePolicy {
    fn from(value: IndexFailure) -> Self {
        match value {
            IndexFailure::Propagate => IndexFailurePolicy::Propagate,
            IndexFailure::NoMatches => IndexFailurePolicy::NoMatches,
        }
    }
}

/// Compiles a user filter and prints the statements as JSON.
#[derive(Debug, Clone, Parser)]
#[command(name = "folio")]
#[command(about = "Compile a list filter into count and fetch statements")]
pub struct CliConfig {
    /// The filter, e.g. `project:Example -step:done "id: 12-45"`.
    pub filter: String,

    /// Record kind to query.
    #[arg(short, long, env = "FOLIO_RECORD_KIND", default_value = "Process")]
    pub kind: RecordKind,

    /// Restrict to records of this client.
    #[arg(long, env = "FOLIO_CLIENT_ID")]
    pub client_id: Option<i32>,

    /// Restrict to these projects.
    #[arg(long = "project", env = "FOLIO_PROJECT_IDS", value_delimiter = ',')]
    pub project_ids: Vec<i32>,

    /// Restrict to tasks of these roles.
    #[arg(long = "role", env = "FOLIO_ROLE_IDS", value_delimiter = ',')]
    pub role_ids: Vec<i32>,

    /// Hide completed processes.
    #[arg(long)]
    pub only_open: bool,

    /// Sort field, relative to the record.
    #[arg(long)]
    pub sort: Option<String>,

    /// Sort descending.
    #[arg(long, requires = "sort")]
    pub descending: bool,

    /// JSON file of documents to load into the in-memory index.
    #[arg(long, env = "FOLIO_INDEX_SEED")]
    pub index_seed: Option<PathBuf>,

    /// Index tokens shorter than this are dropped.
    #[arg(long, env = "FOLIO_MIN_TOKEN_LENGTH", default_value = "3")]
    pub min_token_length: usize,

    /// What to do when an index lookup fails.
    #[arg(long, env = "FOLIO_INDEX_FAILURE", value_enum, default_value = "propagate")]
    pub index_failure: IndexFailure,

    /// Also print the parsed filter.
    #[arg(long)]
    pub explain: bool,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "FOLIO_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl CliConfig {
    /// Returns the filter settings.
    pub fn settings(&self) -> FilterSettings {
        FilterSettings::default()
            .with_min_token_length(self.min_token_length)
            .with_index_failure_policy(self.index_failure.into())
    }

    /// Returns the query scope.
    pub fn scope(&self) -> QueryScope {
        let mut scope = QueryScope::new();
        if let Some(client_id) = self.client_id {
            scope = scope.with_client(client_id);
        }
        if !self.project_ids.is_empty() {
            scope = scope.with_projects(self.project_ids.iter().copied());
        }
        if !self.role_ids.is_empty() {
            scope = scope.with_roles(self.role_ids.iter().copied());
        }
        if self.only_open {
            scope = scope.only_open_processes();
        }
        if let Some(sort) = &self.sort {
            let direction = if self.descending {
                SortDirection::Descending
            } else {
                SortDirection::Ascending
            };
            scope = scope.with_sort(sort.clone(), direction);
        }
        scope
    }

    /// Validates the configuration, collecting every problem found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if let Err(settings_errors) = self.settings().validate() {
            errors.extend(settings_errors);
        }

        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            errors.push(format!("Unknown log level: {}", self.log_level));
        }

        if let Some(path) = &self.index_seed {
            if !path.is_file() {
                errors.push(format!("Index seed file not found: {}", path.display()));
            }
        }

        if self.sort.as_deref().is_some_and(|s| s.trim().is_empty()) {
            errors.push("Sort field cannot be blank".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
