//! Restriction fragments with bound parameters.

use serde::{Deserialize, Serialize};

use crate::core::IndexQuery;
use crate::types::{QueryParameters, QueryValue};

/// The constant-false fragment, for terms that cannot match a record kind.
pub const SQL_FALSE: &str = "1 = 0";

/// An index lookup whose result is bound to a parameter once resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingLookup {
    /// Parameter the matching ids are bound to.
    pub parameter: String,

    /// The lookup to run.
    pub query: IndexQuery,
}

/// A `WHERE` fragment with its bound parameters and pending index lookups.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Restriction {
    /// The fragment text.
    pub fragment: String,
    /// Bound parameter values.
    pub parameters: QueryParameters,
    /// Lookups that bind further parameters of this fragment.
    pub lookups: Vec<PendingLookup>,
}

impl Restriction {
    /// Creates a restriction without parameters.
    pub fn new(fragment: impl Into<String>) -> Self {
        Self {
            fragment: fragment.into(),
            ..Default::default()
        }
    }

    /// Creates the constant-false restriction.
    pub fn never() -> Self {
        Self::new(SQL_FALSE)
    }

    /// Binds a parameter.
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Registers a pending index lookup.
    pub fn with_lookup(mut self, parameter: impl Into<String>, query: IndexQuery) -> Self {
        self.lookups.push(PendingLookup {
            parameter: parameter.into(),
            query,
        });
        self
    }

    /// Returns true if this is the constant-false fragment.
    pub fn is_never(&self) -> bool {
        self.fragment == SQL_FALSE
    }

    /// Wraps the fragment in `NOT (...)`.
    pub fn negate(mut self) -> Self {
        self.fragment = format!("NOT ({})", self.fragment);
        self
    }

    /// Combines restrictions with OR.
    ///
    /// A single restriction is returned unchanged.
    pub fn any(restrictions: Vec<Restriction>) -> Self {
        if restrictions.len() == 1 {
            return restrictions.into_iter().next().unwrap_or_default();
        }

        let mut combined = Restriction::default();
        let mut fragments = Vec::with_capacity(restrictions.len());
        for restriction in restrictions {
            fragments.push(restriction.fragment);
            combined.parameters.extend(restriction.parameters);
            combined.lookups.extend(restriction.lookups);
        }
        combined.fragment = format!("( {} )", fragments.join(" OR "));
        combined
    }
}
