//! Bound parameter values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::RecordId;

/// A value bound to a named `:parameter` placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
    /// Boolean parameter.
    Boolean(bool),
    /// Integer parameter (ids, orderings, status codes).
    Integer(i32),
    /// String parameter.
    Text(String),
    /// Collection of integers, for `IN (:p)`.
    IntegerList(Vec<i32>),
    /// Collection of strings, for `IN (:p)`.
    TextList(Vec<String>),
}

impl QueryValue {
    /// Creates a string parameter.
    pub fn text(s: impl Into<String>) -> Self {
        QueryValue::Text(s.into())
    }

    /// Creates an id collection parameter.
    pub fn ids(ids: impl IntoIterator<Item = RecordId>) -> Self {
        QueryValue::IntegerList(ids.into_iter().collect())
    }

    /// Returns the integer value, if this is an integer parameter.
    pub fn as_integer(&self) -> Option<i32> {
        match self {
            QueryValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the string value, if this is a string parameter.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            QueryValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for QueryValue {
    fn from(b: bool) -> Self {
        QueryValue::Boolean(b)
    }
}

impl From<i32> for QueryValue {
    fn from(i: i32) -> Self {
        QueryValue::Integer(i)
    }
}

impl From<&str> for QueryValue {
    fn from(s: &str) -> Self {
        QueryValue::Text(s.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(s: String) -> Self {
        QueryValue::Text(s)
    }
}

impl From<Vec<i32>> for QueryValue {
    fn from(v: Vec<i32>) -> Self {
        QueryValue::IntegerList(v)
    }
}

impl From<Vec<String>> for QueryValue {
    fn from(v: Vec<String>) -> Self {
        QueryValue::TextList(v)
    }
}

/// Named parameters of a statement, keyed without the leading colon.
pub type QueryParameters = BTreeMap<String, QueryValue>;

/// Sort direction for fetch statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SortDirection {
    /// Ascending order.
    #[default]
    Ascending,
    /// Descending order.
    Descending,
}

impl SortDirection {
    /// Returns the `ORDER BY` keyword.
    pub fn keyword(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}
