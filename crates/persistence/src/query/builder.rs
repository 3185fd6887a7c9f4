//! Query builder for filtered list statements.
//!
//! Accumulates restrictions, joins, parameters and sorting for one record
//! kind and renders count and fetch statements in an object-query dialect
//! with `:name` placeholders and dotted path navigation.
//!
//! A builder is used once per request: restrictions are added, index lookups
//! resolved, then the statements and parameters are read.

use tracing::{debug, warn};

use crate::config::IndexFailurePolicy;
use crate::core::IndexSearcher;
use crate::error::{IndexError, QueryError, QueryResult};
use crate::search::ParsedFilter;
use crate::types::{QueryParameters, QueryValue, RecordId, RecordKind, SortDirection};

use super::restriction::{PendingLookup, Restriction};

/// Bound in place of an empty index result so `IN (:p)` stays valid.
pub const NO_HIT: [RecordId; 1] = [0];

/// `sortHelperStatus` of a completed process.
pub const COMPLETED_STATE: &str = "100000000";

/// Prefix of the parameters bound for user filter atoms.
const USER_FILTER_PREFIX: &str = "userFilter";

/// Joins the most recently touched task of a process as `lastTask`.
const JOIN_LAST_TASK: &str = "process.tasks lastTask WITH \
    (lastTask.processingBegin IS NOT NULL OR lastTask.processingEnd IS NOT NULL) \
    AND (CASE WHEN lastTask.processingBegin IS NOT NULL AND lastTask.processingEnd IS NOT NULL \
    THEN CASE WHEN lastTask.processingBegin > lastTask.processingEnd THEN lastTask.processingBegin ELSE lastTask.processingEnd END \
    WHEN lastTask.processingBegin IS NOT NULL THEN lastTask.processingBegin \
    ELSE lastTask.processingEnd END) = (SELECT MAX(CASE \
    WHEN t.processingBegin IS NOT NULL AND t.processingEnd IS NOT NULL \
    THEN CASE WHEN t.processingBegin > t.processingEnd THEN t.processingBegin ELSE t.processingEnd END \
    WHEN t.processingBegin IS NOT NULL THEN t.processingBegin \
    ELSE t.processingEnd END) FROM Task t WHERE t.process = process \
    AND (t.processingBegin IS NOT NULL OR t.processingEnd IS NOT NULL))";

/// Builds count and fetch statements for one record kind.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    kind: RecordKind,
    var: String,
    inner_joins: Vec<String>,
    restrictions: Vec<String>,
    alternatives: Vec<String>,
    index_filters_as_alternatives: bool,
    parameters: QueryParameters,
    lookups: Vec<PendingLookup>,
    sorting: Option<(String, SortDirection)>,
    user_filter_count: usize,
    parameter_count: usize,
}

impl QueryBuilder {
    /// Creates a builder sorted by id, ascending.
    pub fn new(kind: RecordKind) -> Self {
        let var = kind.variable();
        Self {
            kind,
            sorting: Some((format!("{}.id", var), SortDirection::Ascending)),
            var,
            inner_joins: Vec::new(),
            restrictions: Vec::new(),
            alternatives: Vec::new(),
            index_filters_as_alternatives: false,
            parameters: QueryParameters::new(),
            lookups: Vec::new(),
            user_filter_count: 0,
            parameter_count: 0,
        }
    }

    /// Returns the record kind.
    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Returns the record variable.
    pub fn var(&self) -> &str {
        &self.var
    }

    /// Requires `<var>.<field> = :<field>` for a boolean.
    pub fn add_boolean_restriction(&mut self, field: &str, value: bool) -> &mut Self {
        self.add_equals_restriction(field, value.into())
    }

    /// Requires `<var>.<field> = :<field>` for an integer.
    pub fn add_integer_restriction(&mut self, field: &str, value: i32) -> &mut Self {
        self.add_equals_restriction(field, value.into())
    }

    /// Requires `<var>.<field> = :<field>` for a string.
    pub fn add_string_restriction(&mut self, field: &str, value: impl Into<String>) -> &mut Self {
        self.add_equals_restriction(field, QueryValue::Text(value.into()))
    }

    /// Requires `<var>.<field> IN (:<field>)`.
    pub fn add_in_collection_restriction(
        &mut self,
        field: &str,
        values: impl Into<QueryValue>,
    ) -> &mut Self {
        let parameter = self.reserve_parameter(&parameter_name(field));
        self.restrictions
            .push(format!("{}.{} IN (:{})", self.var, field, parameter));
        self.parameters.insert(parameter, values.into());
        self
    }

    /// Requires `<var>.<field> NOT IN (:<field>)`.
    pub fn add_not_in_collection_restriction(
        &mut self,
        field: &str,
        values: impl IntoIterator<Item = RecordId>,
    ) -> &mut Self {
        let parameter = self.reserve_parameter(&parameter_name(field));
        self.restrictions
            .push(format!("{}.{} NOT IN (:{})", self.var, field, parameter));
        self.parameters
            .insert(parameter, QueryValue::ids(values));
        self
    }

    /// Requires `<var>.<field> IS NULL`.
    pub fn add_null_restriction(&mut self, field: &str) -> &mut Self {
        self.restrictions
            .push(format!("{}.{} IS NULL", self.var, field));
        self
    }

    /// Requires a member of a to-many relation to have the given id.
    ///
    /// `add_x_id_restriction("roles", 3)` joins
    /// `<var>.roles AS role WITH role.id = :roleId`.
    pub fn add_x_id_restriction(&mut self, relation: &str, id: RecordId) -> &mut Self {
        let name = parameter_name(relation);
        let other = name.strip_suffix('s').unwrap_or(&name).to_string();
        let base = format!("{}Id", other);
        let parameter = self.reserve_parameter(&base);
        let alias = format!("{}{}", other, &parameter[base.len()..]);
        self.inner_joins.push(format!(
            "{}.{} AS {} WITH {}.id = :{}",
            self.var, relation, alias, alias, parameter
        ));
        self.parameters.insert(parameter, id.into());
        self
    }

    /// Adds `INNER JOIN <var>.<join>`.
    pub fn add_inner_join(&mut self, join: &str) -> &mut Self {
        self.inner_joins.push(format!("{}.{}", self.var, join));
        self
    }

    /// Restricts by id or title, as typed into a quick search box.
    ///
    /// - `"..."` is unquoted first
    /// - `id:<n>` matches the id strictly (the owning process id for tasks)
    /// - a number matches the id or a title containing it
    /// - anything else matches titles containing the text
    pub fn for_id_or_in_title(&mut self, text: &str) -> &mut Self {
        let text = text
            .strip_prefix('"')
            .and_then(|t| t.strip_suffix('"'))
            .unwrap_or(text);
        let anywhere = format!("%{}%", text);

        if let Some(digits) = explicit_id(text) {
            if let Ok(id) = digits.parse::<RecordId>() {
                let column = match self.kind {
                    RecordKind::Task => "process.id",
                    _ => "id",
                };
                let parameter = self.reserve_parameter("id");
                self.restrictions
                    .push(format!("{}.{} = :{}", self.var, column, parameter));
                self.parameters.insert(parameter, id.into());
                return self;
            }
        } else if let Ok(id) = text.parse::<RecordId>() {
            let possible_id = self.reserve_parameter("possibleId");
            let search_input = self.reserve_parameter("searchInput");
            self.restrictions.push(format!(
                "({var}.id = :{possible_id} OR {var}.title LIKE :{search_input})",
                var = self.var
            ));
            self.parameters.insert(possible_id, id.into());
            self.parameters.insert(search_input, anywhere.into());
            return self;
        }

        debug!(text, "searching title only");
        let search_input = self.reserve_parameter("searchInput");
        self.restrictions
            .push(format!("{}.title LIKE :{}", self.var, search_input));
        self.parameters.insert(search_input, anywhere.into());
        self
    }

    /// Restricts to records owned by the session client.
    pub fn restrict_to_client(&mut self, client_id: RecordId) -> QueryResult<&mut Self> {
        let path = match self.kind {
            RecordKind::Docket
            | RecordKind::Project
            | RecordKind::Ruleset
            | RecordKind::Template
            | RecordKind::Workflow => "client.id",
            RecordKind::Process => "project.client.id",
            RecordKind::Task => "process.project.client.id",
            kind => return Err(unsupported("restrictToClient", kind)),
        };
        let parameter = self.reserve_parameter("sessionClientId");
        self.restrictions
            .push(format!("{}.{} = :{}", self.var, path, parameter));
        self.parameters.insert(parameter, client_id.into());
        Ok(self)
    }

    /// Restricts to processes not yet completed.
    pub fn restrict_to_not_completed_processes(&mut self) -> &mut Self {
        let parameter = self.reserve_parameter("completedState");
        self.restrictions.push(format!(
            "({var}.sortHelperStatus IS NULL OR {var}.sortHelperStatus != :{parameter})",
            var = self.var
        ));
        self.parameters.insert(parameter, COMPLETED_STATE.into());
        self
    }

    /// Restricts to records of the given projects.
    pub fn restrict_to_projects(
        &mut self,
        project_ids: impl IntoIterator<Item = RecordId>,
    ) -> QueryResult<&mut Self> {
        let path = match self.kind {
            RecordKind::Process => "project.id",
            RecordKind::Task => "process.project.id",
            kind => return Err(unsupported("restrictToProjects", kind)),
        };
        let parameter = self.reserve_parameter("projectIDs");
        self.restrictions
            .push(format!("{}.{} IN (:{})", self.var, path, parameter));
        self.parameters
            .insert(parameter, QueryValue::ids(project_ids));
        Ok(self)
    }

    /// Restricts to tasks (or processes with tasks) assigned to one of the roles.
    pub fn restrict_to_roles(
        &mut self,
        role_ids: impl IntoIterator<Item = RecordId>,
    ) -> QueryResult<&mut Self> {
        let from = match self.kind {
            RecordKind::Task => format!("{}.roles r", self.var),
            RecordKind::Process => format!("{}.tasks t JOIN t.roles r", self.var),
            kind => return Err(unsupported("restrictToRoles", kind)),
        };
        let parameter = self.reserve_parameter("userRoles");
        self.restrictions.push(format!(
            "EXISTS (SELECT 1 FROM {} WHERE r.id IN (:{}))",
            from, parameter
        ));
        self.parameters
            .insert(parameter, QueryValue::ids(role_ids));
        Ok(self)
    }

    /// Adds the restrictions of a parsed user filter.
    ///
    /// Atoms of one field are ORed, fields are ANDed. Index atoms register a
    /// pending lookup; with [`set_index_filters_as_alternatives`] they are
    /// ORed with each other instead.
    ///
    /// [`set_index_filters_as_alternatives`]: QueryBuilder::set_index_filters_as_alternatives
    pub fn restrict_with_user_filter(&mut self, filter: &ParsedFilter) -> &mut Self {
        for (field, atoms) in filter.groups() {
            let mut group = Vec::with_capacity(atoms.len());

            for atom in atoms {
                let parameter = self.next_user_filter_parameter();
                let restriction = atom.restriction(self.kind, &self.var, &parameter);

                if !restriction.lookups.is_empty() && self.index_filters_as_alternatives {
                    self.add_alternative(restriction);
                } else {
                    group.push(restriction);
                }
            }

            if !group.is_empty() {
                debug!(%field, atoms = group.len(), "adding user filter group");
                let combined = Restriction::any(group);
                self.add_restriction(combined);
            }
        }
        self
    }

    /// Sets the sort order.
    ///
    /// A blank field keeps the current order. Fields starting with `lastTask`
    /// or `CASE` are used verbatim; others are taken relative to the record.
    pub fn define_sorting(&mut self, field: &str, direction: SortDirection) -> &mut Self {
        let field = field.trim();
        if field.is_empty() {
            return self;
        }
        let column = if field.starts_with("lastTask") || field.starts_with("CASE") {
            field.to_string()
        } else {
            format!("{}.{}", self.var, field)
        };
        self.sorting = Some((column, direction));
        self
    }

    /// Drops the sort order.
    ///
    /// Only useful for existence checks; result order becomes unreliable.
    pub fn set_unordered(&mut self) -> &mut Self {
        self.sorting = None;
        self
    }

    /// ORs index filters with each other instead of ANDing them.
    pub fn set_index_filters_as_alternatives(&mut self) -> &mut Self {
        self.index_filters_as_alternatives = true;
        self
    }

    /// Renders `SELECT COUNT(*) FROM ...`.
    pub fn form_count_query(&self) -> String {
        let mut query = String::from("SELECT COUNT(*) ");
        self.push_from_where(&mut query, false);
        query
    }

    /// Renders the fetch statement, with `ORDER BY` unless unordered.
    pub fn form_query_for_all(&self) -> String {
        let mut query = String::new();
        if !self.inner_joins.is_empty() {
            query.push_str(&format!("SELECT {} ", self.var));
        }
        self.push_from_where(&mut query, self.sorts_by_last_task());
        self.push_order_by(&mut query);
        query
    }

    /// Renders the fetch statement starting at `FROM`.
    pub fn form_query_without_select(&self) -> String {
        let mut query = String::new();
        self.push_from_where(&mut query, self.sorts_by_last_task());
        self.push_order_by(&mut query);
        query
    }

    /// Renders `SELECT DISTINCT <var>.<field> FROM ...`, optionally sorted by that field.
    pub fn form_query_for_distinct(&self, field: &str, sorted: bool) -> String {
        let mut query = format!("SELECT DISTINCT {}.{} ", self.var, field);
        self.push_from_where(&mut query, false);
        if sorted {
            query.push_str(&format!(" ORDER BY {}.{} ASC", self.var, field));
        }
        query
    }

    /// Returns the bound parameters.
    ///
    /// Fails while index lookups are pending.
    pub fn query_parameters(&self) -> QueryResult<&QueryParameters> {
        if !self.lookups.is_empty() {
            return Err(QueryError::PendingIndexSearches {
                pending: self.lookups.len(),
            });
        }
        Ok(&self.parameters)
    }

    /// Returns the index lookups still to be resolved.
    pub fn pending_lookups(&self) -> &[PendingLookup] {
        &self.lookups
    }

    /// Binds the result of a pending lookup.
    ///
    /// An empty result binds [`NO_HIT`]. Unknown parameters are ignored.
    pub fn bind_lookup_result(&mut self, parameter: &str, ids: Vec<RecordId>) -> &mut Self {
        let Some(position) = self.lookups.iter().position(|l| l.parameter == parameter) else {
            return self;
        };
        self.lookups.remove(position);
        let ids = if ids.is_empty() { NO_HIT.to_vec() } else { ids };
        self.parameters
            .insert(parameter.to_string(), QueryValue::IntegerList(ids));
        self
    }

    /// Resolves all pending lookups against the search index.
    ///
    /// With [`IndexFailurePolicy::NoMatches`] a failed lookup binds [`NO_HIT`];
    /// otherwise the first failure is returned and the remaining lookups stay pending.
    pub async fn perform_index_searches(
        &mut self,
        searcher: &dyn IndexSearcher,
        policy: IndexFailurePolicy,
    ) -> Result<(), IndexError> {
        while let Some(lookup) = self.lookups.first().cloned() {
            let ids = match searcher.search_ids(&lookup.query).await {
                Ok(ids) => ids,
                Err(e) if policy == IndexFailurePolicy::NoMatches => {
                    warn!(
                        index = searcher.name(),
                        query = %lookup.query,
                        error = %e,
                        "index lookup failed, treating as no matches"
                    );
                    Vec::new()
                }
                Err(e) => return Err(e),
            };
            debug!(query = %lookup.query, hits = ids.len(), "index lookup resolved");
            self.bind_lookup_result(&lookup.parameter, ids);
        }
        Ok(())
    }

    /// Returns `base`, or `base` with the next counter suffix if that name is taken.
    fn reserve_parameter(&mut self, base: &str) -> String {
        if !self.is_parameter_taken(base) {
            return base.to_string();
        }
        loop {
            self.parameter_count += 1;
            let name = format!("{}{}", base, self.parameter_count);
            if !self.is_parameter_taken(&name) {
                return name;
            }
        }
    }

    fn next_user_filter_parameter(&mut self) -> String {
        loop {
            self.user_filter_count += 1;
            let name = format!("{}{}", USER_FILTER_PREFIX, self.user_filter_count);
            if !self.is_parameter_taken(&name) {
                return name;
            }
        }
    }

    fn is_parameter_taken(&self, name: &str) -> bool {
        self.parameters.contains_key(name) || self.lookups.iter().any(|l| l.parameter == name)
    }

    fn add_equals_restriction(&mut self, field: &str, value: QueryValue) -> &mut Self {
        let parameter = self.reserve_parameter(&parameter_name(field));
        self.restrictions
            .push(format!("{}.{} = :{}", self.var, field, parameter));
        self.parameters.insert(parameter, value);
        self
    }

    fn add_restriction(&mut self, restriction: Restriction) {
        self.restrictions.push(restriction.fragment);
        self.parameters.extend(restriction.parameters);
        self.lookups.extend(restriction.lookups);
    }

    fn add_alternative(&mut self, restriction: Restriction) {
        self.alternatives.push(restriction.fragment);
        self.parameters.extend(restriction.parameters);
        self.lookups.extend(restriction.lookups);
    }

    fn sorts_by_last_task(&self) -> bool {
        matches!(&self.sorting, Some((column, _)) if column.starts_with("lastTask"))
    }

    fn push_from_where(&self, query: &mut String, join_last_task: bool) {
        query.push_str(&format!(
            "FROM {} AS {}",
            self.kind.entity_name(),
            self.var
        ));
        for join in &self.inner_joins {
            query.push_str(" INNER JOIN ");
            query.push_str(join);
        }
        if join_last_task {
            query.push_str(" LEFT JOIN ");
            query.push_str(JOIN_LAST_TASK);
        }

        let alternatives = match self.alternatives.len() {
            0 => None,
            1 => Some(self.alternatives[0].clone()),
            _ => Some(format!("({})", self.alternatives.join(" OR "))),
        };
        let restrictions = self.restrictions.iter().cloned().chain(alternatives);
        for (i, restriction) in restrictions.enumerate() {
            query.push_str(if i == 0 { " WHERE " } else { " AND " });
            query.push_str(&restriction);
        }
    }

    fn push_order_by(&self, query: &mut String) {
        if let Some((column, direction)) = &self.sorting {
            query.push_str(&format!(" ORDER BY {} {}", column, direction.keyword()));
        }
    }
}

/// Derives a parameter name from a field path: `project.client.id` becomes `projectClientId`.
fn parameter_name(field: &str) -> String {
    let mut name = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c.is_ascii_alphanumeric() {
            if upper {
                name.push(c.to_ascii_uppercase());
            } else {
                name.push(c);
            }
            upper = false;
        } else {
            upper = true;
        }
    }
    name
}

/// Returns the digits of an explicit `id:<digits>` search.
fn explicit_id(text: &str) -> Option<&str> {
    let digits = text.strip_prefix("id:")?;
    (!digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())).then_some(digits)
}

fn unsupported(operation: &'static str, kind: RecordKind) -> QueryError {
    QueryError::UnsupportedRecordKind { operation, kind }
}
