//! Filter orchestration.
//!
//! [`FilterService`] is the entry point list views use: it parses the user's
//! filter, applies the session scope, resolves index lookups and hands the
//! finished statements to a [`RecordStore`].
//!
//! ```text
//! compile(kind, filter, scope)
//!   ├── FilterParser::parse
//!   ├── QueryBuilder: scope restrictions + user filter + sorting
//!   ├── IndexSearcher: resolve pending lookups (per IndexFailurePolicy)
//!   └── CompiledQuery { count_statement, fetch_statement, parameters }
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::FilterSettings;
use crate::core::{IndexSearcher, RecordStore};
use crate::error::{FilterResult, QueryResult};
use crate::query::QueryBuilder;
use crate::search::{FieldRegistry, FilterParser, ParsedFilter};
use crate::types::{Page, Pagination, QueryParameters, RecordId, RecordKind, SortDirection};

/// A sort order requested by a list view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    /// Field relative to the record, or a raw `lastTask...`/`CASE ...` expression.
    pub field: String,
    /// The direction.
    pub direction: SortDirection,
}

impl SortOrder {
    /// Creates a sort order.
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

/// Session scope applied to every list query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryScope {
    /// Restrict to records of this client.
    pub client_id: Option<RecordId>,
    /// Restrict to records of these projects.
    pub project_ids: Option<Vec<RecordId>>,
    /// Restrict to tasks assigned to these roles.
    pub role_ids: Option<Vec<RecordId>>,
    /// Hide completed processes.
    pub only_open_processes: bool,
    /// Sort order; id ascending when unset.
    pub sort: Option<SortOrder>,
}

impl QueryScope {
    /// Creates an unrestricted scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to a client.
    pub fn with_client(mut self, client_id: RecordId) -> Self {
        self.client_id = Some(client_id);
        self
    }

    /// Restricts to projects.
    pub fn with_projects(mut self, project_ids: impl IntoIterator<Item = RecordId>) -> Self {
        self.project_ids = Some(project_ids.into_iter().collect());
        self
    }

    /// Restricts to roles.
    pub fn with_roles(mut self, role_ids: impl IntoIterator<Item = RecordId>) -> Self {
        self.role_ids = Some(role_ids.into_iter().collect());
        self
    }

    /// Hides completed processes.
    pub fn only_open_processes(mut self) -> Self {
        self.only_open_processes = true;
        self
    }

    /// Sets the sort order.
    pub fn with_sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort = Some(SortOrder::new(field, direction));
        self
    }
}

/// Statements and parameters ready for a [`RecordStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledQuery {
    /// The record kind queried.
    pub kind: RecordKind,
    /// `SELECT COUNT(*) ...`
    pub count_statement: String,
    /// The fetch statement, ordered.
    pub fetch_statement: String,
    /// Parameters of both statements.
    pub parameters: QueryParameters,
}

/// Compiles user filters and runs them against a record store.
pub struct FilterService {
    parser: FilterParser,
    searcher: Arc<dyn IndexSearcher>,
    settings: FilterSettings,
}

impl FilterService {
    /// Creates a service over the standard field registry.
    pub fn new(searcher: Arc<dyn IndexSearcher>, settings: FilterSettings) -> Self {
        Self::with_registry(Arc::new(FieldRegistry::new()), searcher, settings)
    }

    /// Creates a service sharing an existing registry.
    pub fn with_registry(
        registry: Arc<FieldRegistry>,
        searcher: Arc<dyn IndexSearcher>,
        settings: FilterSettings,
    ) -> Self {
        Self {
            parser: FilterParser::new(registry, settings.min_token_length),
            searcher,
            settings,
        }
    }

    /// Returns the settings.
    pub fn settings(&self) -> &FilterSettings {
        &self.settings
    }

    /// Parses a filter string.
    pub fn parse(&self, filter: &str) -> ParsedFilter {
        self.parser.parse(filter)
    }

    /// Builds the query with scope and filter applied, lookups still pending.
    pub fn query_builder(
        &self,
        kind: RecordKind,
        filter: &str,
        scope: &QueryScope,
    ) -> QueryResult<QueryBuilder> {
        let mut query = QueryBuilder::new(kind);

        if let Some(client_id) = scope.client_id {
            query.restrict_to_client(client_id)?;
        }
        if let Some(project_ids) = &scope.project_ids {
            query.restrict_to_projects(project_ids.iter().copied())?;
        }
        if let Some(role_ids) = &scope.role_ids {
            query.restrict_to_roles(role_ids.iter().copied())?;
        }
        if scope.only_open_processes && kind == RecordKind::Process {
            query.restrict_to_not_completed_processes();
        }

        let parsed = self.parser.parse(filter);
        debug!(%kind, filter, parsed = %parsed, "parsed user filter");
        query.restrict_with_user_filter(&parsed);

        if let Some(sort) = &scope.sort {
            query.define_sorting(&sort.field, sort.direction);
        }

        Ok(query)
    }

    /// Compiles a filter into statements, resolving index lookups.
    #[instrument(skip_all, fields(kind = %kind, filter = filter))]
    pub async fn compile(
        &self,
        kind: RecordKind,
        filter: &str,
        scope: &QueryScope,
    ) -> FilterResult<CompiledQuery> {
        let mut query = self.query_builder(kind, filter, scope)?;

        if !query.pending_lookups().is_empty() {
            query
                .perform_index_searches(self.searcher.as_ref(), self.settings.index_failure_policy)
                .await?;
        }

        let parameters = query.query_parameters()?.clone();
        Ok(CompiledQuery {
            kind,
            count_statement: query.form_count_query(),
            fetch_statement: query.form_query_for_all(),
            parameters,
        })
    }

    /// Counts the records matching a filter.
    pub async fn count_results<S: RecordStore>(
        &self,
        store: &S,
        kind: RecordKind,
        filter: &str,
        scope: &QueryScope,
    ) -> FilterResult<u64> {
        let compiled = self.compile(kind, filter, scope).await?;
        let count = store
            .count(&compiled.count_statement, &compiled.parameters)
            .await?;
        debug!(%kind, count, "counted filter results");
        Ok(count)
    }

    /// Loads one page of records matching a filter, with the total count.
    ///
    /// Without pagination the first page of the configured default size is loaded.
    pub async fn load_data<S: RecordStore>(
        &self,
        store: &S,
        kind: RecordKind,
        filter: &str,
        scope: &QueryScope,
        pagination: Option<Pagination>,
    ) -> FilterResult<Page<S::Record>> {
        let pagination =
            pagination.unwrap_or_else(|| Pagination::first(self.settings.default_page_size));
        let compiled = self.compile(kind, filter, scope).await?;

        let total = store
            .count(&compiled.count_statement, &compiled.parameters)
            .await?;
        let items = if u64::from(pagination.offset) < total {
            store
                .fetch(
                    &compiled.fetch_statement,
                    &compiled.parameters,
                    pagination.offset,
                    pagination.limit,
                )
                .await?
        } else {
            Vec::new()
        };

        debug!(%kind, total, loaded = items.len(), offset = pagination.offset, "loaded filter results");
        Ok(Page::new(items, pagination).with_total(total))
    }
}

impl std::fmt::Debug for FilterService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterService")
            .field("searcher", &self.searcher.name())
            .field("settings", &self.settings)
            .finish()
    }
}
