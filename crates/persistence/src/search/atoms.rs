//! Compiled filter atoms.
//!
//! An atom is one typed term of the user's filter input. Each variant knows
//! how to render itself into a [`Restriction`] for a record kind:
//!
//! - [`RelationalAtom`] - text comparison (`=` or `LIKE`) through the field template
//! - [`IdentifierAtom`] - id, id range or id list through the field template
//! - [`IndexAtom`] - search index lookup, rendered as `IN (:p)` over process ids

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::IndexQuery;
use crate::query::Restriction;
use crate::types::{QueryValue, RecordId, RecordKind};

use super::registry::{FilterField, LikeSearch};

/// Suffix of the parameter holding a range's upper bound.
pub const UP_TO_SUFFIX: &str = "UpTo";

/// Suffix of the parameter holding a field's fixed comparison value.
pub const QUERY_OBJECT_SUFFIX: &str = "QueryObject";

/// One parsed filter term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterAtom {
    /// Text comparison.
    Relational(RelationalAtom),
    /// Identifier comparison.
    Identifier(IdentifierAtom),
    /// Search index lookup.
    Index(IndexAtom),
}

impl FilterAtom {
    /// Returns the field this atom filters on.
    pub fn field(&self) -> FilterField {
        match self {
            FilterAtom::Relational(atom) => atom.field,
            FilterAtom::Identifier(atom) => atom.field,
            FilterAtom::Index(atom) => atom.field,
        }
    }

    /// Returns false for negated terms.
    pub fn include(&self) -> bool {
        match self {
            FilterAtom::Relational(atom) => atom.include,
            FilterAtom::Identifier(atom) => atom.include,
            FilterAtom::Index(atom) => atom.include,
        }
    }

    /// Renders the atom for a record kind.
    ///
    /// `var` is the record variable and `param` the unique parameter name
    /// reserved for this atom.
    pub fn restriction(&self, kind: RecordKind, var: &str, param: &str) -> Restriction {
        match self {
            FilterAtom::Relational(atom) => atom.restriction(kind, var, param),
            FilterAtom::Identifier(atom) => atom.restriction(kind, var, param),
            FilterAtom::Index(atom) => atom.restriction(kind, var, param),
        }
    }
}

impl fmt::Display for FilterAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.include() {
            f.write_str("-")?;
        }
        match self {
            FilterAtom::Relational(atom) => write!(f, "{}:{}", atom.field, atom.value),
            FilterAtom::Identifier(atom) => write!(f, "{}:{}", atom.field, atom.ids),
            FilterAtom::Index(atom) => {
                write!(f, "{}:", atom.field)?;
                if let Some(sub_key) = &atom.sub_key {
                    write!(f, "{}:", sub_key)?;
                }
                f.write_str(&atom.tokens.join(" "))
            }
        }
    }
}

/// A literal text value compared through the field template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationalAtom {
    /// The field.
    pub field: FilterField,
    /// False for negated terms.
    pub include: bool,
    /// The literal value as typed.
    pub value: String,
}

impl RelationalAtom {
    /// Creates a relational atom.
    pub fn new(field: FilterField, include: bool, value: impl Into<String>) -> Self {
        Self {
            field,
            include,
            value: value.into(),
        }
    }

    /// Renders `<column> = :p` or `<column> LIKE :p` per the field's LIKE policy.
    pub fn restriction(&self, kind: RecordKind, var: &str, param: &str) -> Restriction {
        let descriptor = self.field.descriptor();
        let (Some(template), Some(column)) = (descriptor.template(kind), descriptor.text_column)
        else {
            debug!(field = %self.field, %kind, "no text template, rendering constant false");
            return Restriction::never();
        };

        let (operator, value) = match descriptor.like_search {
            LikeSearch::No => ("=", self.value.clone()),
            LikeSearch::Allowed if self.value.contains('*') => ("LIKE", self.value.replace('*', "%")),
            LikeSearch::Allowed => ("=", self.value.clone()),
            LikeSearch::AlwaysRight => ("LIKE", format!("{}%", self.value.replace('*', "%"))),
        };

        let operand = format!("{} :{}", operator, param);
        let restriction = Restriction::new(render_template(template, var, column, &operand, param))
            .with_parameter(param, value);
        let restriction = bind_query_object(restriction, self.field, param);

        if self.include {
            restriction
        } else {
            restriction.negate()
        }
    }
}

/// The identifiers an [`IdentifierAtom`] compares against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Identifiers {
    /// A single id.
    Single(RecordId),
    /// An inclusive range.
    Range {
        /// Lower bound.
        low: RecordId,
        /// Upper bound.
        high: RecordId,
    },
    /// Any of several ids.
    List(Vec<RecordId>),
}

impl fmt::Display for Identifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifiers::Single(id) => write!(f, "{}", id),
            Identifiers::Range { low, high } => write!(f, "{}-{}", low, high),
            Identifiers::List(ids) => {
                let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
                f.write_str(&ids.join(" "))
            }
        }
    }
}

/// An id, id range or id list compared through the field template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierAtom {
    /// The field.
    pub field: FilterField,
    /// False for negated terms.
    pub include: bool,
    /// The identifiers.
    pub ids: Identifiers,
}

impl IdentifierAtom {
    /// Creates an identifier atom.
    pub fn new(field: FilterField, include: bool, ids: Identifiers) -> Self {
        Self {
            field,
            include,
            ids,
        }
    }

    /// Renders `=`, `BETWEEN` or `IN` against the field's id column.
    ///
    /// Negated terms on a plain path use `!=`, `NOT BETWEEN` or `NOT IN`.
    /// Any other template is rendered positive and wrapped in `NOT (...)`.
    pub fn restriction(&self, kind: RecordKind, var: &str, param: &str) -> Restriction {
        let descriptor = self.field.descriptor();
        let (Some(template), Some(column)) = (descriptor.template(kind), descriptor.id_column)
        else {
            debug!(field = %self.field, %kind, "no id template, rendering constant false");
            return Restriction::never();
        };

        let plain_path = is_plain_path(template);
        let negate_operator = !self.include && plain_path;

        let (operand, restriction) = match &self.ids {
            Identifiers::Single(id) => {
                let operator = if negate_operator { "!=" } else { "=" };
                (
                    format!("{} :{}", operator, param),
                    Restriction::default().with_parameter(param, *id),
                )
            }
            Identifiers::Range { low, high } => {
                let operator = if negate_operator { "NOT BETWEEN" } else { "BETWEEN" };
                let upper = format!("{}{}", param, UP_TO_SUFFIX);
                (
                    format!("{} :{} AND :{}", operator, param, upper),
                    Restriction::default()
                        .with_parameter(param, *low)
                        .with_parameter(upper, *high),
                )
            }
            Identifiers::List(ids) => {
                let operator = if negate_operator { "NOT IN" } else { "IN" };
                (
                    format!("{} (:{})", operator, param),
                    Restriction::default().with_parameter(param, QueryValue::ids(ids.clone())),
                )
            }
        };

        let restriction = Restriction {
            fragment: render_template(template, var, column, &operand, param),
            ..restriction
        };
        let restriction = bind_query_object(restriction, self.field, param);

        if self.include || plain_path {
            restriction
        } else {
            restriction.negate()
        }
    }
}

/// Normalized tokens looked up in the search index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexAtom {
    /// The field.
    pub field: FilterField,
    /// False for negated terms.
    pub include: bool,
    /// Sub-key within the index field.
    pub sub_key: Option<String>,
    /// Normalized tokens; empty for an existence check.
    pub tokens: Vec<String>,
}

impl IndexAtom {
    /// Creates an index atom.
    pub fn new(field: FilterField, include: bool, sub_key: Option<String>, tokens: Vec<String>) -> Self {
        Self {
            field,
            include,
            sub_key,
            tokens,
        }
    }

    /// Returns the index lookup for this atom.
    pub fn index_query(&self) -> Option<IndexQuery> {
        let field = self.field.descriptor().index_key?;
        Some(IndexQuery {
            field: field.to_string(),
            sub_key: self.sub_key.clone(),
            tokens: self.tokens.clone(),
        })
    }

    /// Renders `<var>.<process id> IN (:p)` and registers the lookup under `param`.
    pub fn restriction(&self, kind: RecordKind, var: &str, param: &str) -> Restriction {
        let query = match (kind, self.index_query()) {
            (RecordKind::Process | RecordKind::Task, Some(query)) => query,
            _ => {
                debug!(field = %self.field, %kind, "no index lookup for record kind, rendering constant false");
                return Restriction::never();
            }
        };

        let operator = if self.include { "IN" } else { "NOT IN" };
        Restriction::new(format!(
            "{}.{} {} (:{})",
            var,
            kind.process_id_column(),
            operator,
            param
        ))
        .with_lookup(param, query)
    }
}

/// Returns true for templates that are a bare path comparison, like `~.process.$ #`.
fn is_plain_path(template: &str) -> bool {
    template
        .strip_suffix("$ #")
        .is_some_and(|path| path.starts_with('~') && !path.contains(char::is_whitespace))
}

/// Substitutes the template placeholders.
fn render_template(template: &str, var: &str, column: &str, operand: &str, param: &str) -> String {
    template
        .replace(":queryObject", &format!(":{}{}", param, QUERY_OBJECT_SUFFIX))
        .replace('~', var)
        .replace('$', column)
        .replace('#', operand)
}

fn bind_query_object(restriction: Restriction, field: FilterField, param: &str) -> Restriction {
    match field.descriptor().query_object {
        Some(value) => restriction.with_parameter(format!("{}{}", param, QUERY_OBJECT_SUFFIX), value),
        None => restriction,
    }
}
