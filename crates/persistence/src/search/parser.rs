//! Filter string parser.
//!
//! Turns the single filter line a user types into atoms grouped by field.
//!
//! # Grammar
//!
//! ```text
//! filter   := term*                      terms are separated by code points <= U+0020
//! term     := alt ('|' alt)*             '|' inside parentheses is literal
//! alt      := ['-'] [name ':'] value     '-' negates, no name means free text
//! ```
//!
//! Double quotes group a term that contains whitespace:
//! `"id: 5-9|id: 20"` is one term with two alternatives.
//!
//! The parser never rejects input. Terms that cannot be queried are dropped
//! and malformed numbers degrade to a text search.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::types::RecordId;

use super::atoms::{FilterAtom, IdentifierAtom, Identifiers, IndexAtom, RelationalAtom};
use super::normalize::TokenNormalizer;
use super::registry::{FieldRegistry, FilterField};

const ID_OR_RANGE_PATTERN: &str = r"^\s*(\d+)\s*(?:-\s*(\d+))?\s*$";
const ID_LIST_PATTERN: &str = r"^\s*\d+(?:\s+\d+)+\s*$";

/// Atoms grouped by field, in order of first appearance.
///
/// Atoms of the same field are alternatives (OR); different fields must all
/// match (AND).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedFilter {
    groups: Vec<(FilterField, Vec<FilterAtom>)>,
}

impl ParsedFilter {
    /// Creates an empty filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an atom to its field's group.
    pub fn push(&mut self, atom: FilterAtom) {
        let field = atom.field();
        match self.groups.iter_mut().find(|(f, _)| *f == field) {
            Some((_, atoms)) => atoms.push(atom),
            None => self.groups.push((field, vec![atom])),
        }
    }

    /// Returns the atoms of one field.
    pub fn get(&self, field: FilterField) -> Option<&[FilterAtom]> {
        self.groups
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, atoms)| atoms.as_slice())
    }

    /// Iterates over the field groups.
    pub fn groups(&self) -> impl Iterator<Item = (FilterField, &[FilterAtom])> {
        self.groups.iter().map(|(f, atoms)| (*f, atoms.as_slice()))
    }

    /// Returns the fields in order of first appearance.
    pub fn fields(&self) -> Vec<FilterField> {
        self.groups.iter().map(|(f, _)| *f).collect()
    }

    /// Returns the number of field groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns true if no atom survived parsing.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Returns the total number of atoms.
    pub fn atom_count(&self) -> usize {
        self.groups.iter().map(|(_, atoms)| atoms.len()).sum()
    }

    /// Returns true if any atom needs the search index.
    pub fn needs_index(&self) -> bool {
        self.groups
            .iter()
            .flat_map(|(_, atoms)| atoms)
            .any(|atom| matches!(atom, FilterAtom::Index(_)))
    }
}

impl fmt::Display for ParsedFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let groups: Vec<String> = self
            .groups
            .iter()
            .map(|(_, atoms)| {
                let atoms: Vec<String> = atoms.iter().map(ToString::to_string).collect();
                atoms.join(" | ")
            })
            .collect();
        f.write_str(&groups.join(" & "))
    }
}

/// Outcome of matching a value against the identifier grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
enum IdentifierValue {
    /// The value is an id, range or list.
    Ids(Identifiers),
    /// The value is numeric but a number does not fit a record id.
    Overflow,
    /// The value is not numeric.
    NotNumeric,
}

/// Parses filter strings against a field registry.
#[derive(Debug, Clone)]
pub struct FilterParser {
    registry: Arc<FieldRegistry>,
    normalizer: TokenNormalizer,
    id_or_range: Regex,
    id_list: Regex,
}

impl FilterParser {
    /// Creates a parser keeping index tokens of at least `min_token_length` characters.
    pub fn new(registry: Arc<FieldRegistry>, min_token_length: usize) -> Self {
        Self {
            registry,
            normalizer: TokenNormalizer::new(min_token_length),
            id_or_range: Regex::new(ID_OR_RANGE_PATTERN).expect("id pattern is valid"),
            id_list: Regex::new(ID_LIST_PATTERN).expect("id list pattern is valid"),
        }
    }

    /// Returns the registry used to resolve field names.
    pub fn registry(&self) -> &Arc<FieldRegistry> {
        &self.registry
    }

    /// Parses a filter string.
    pub fn parse(&self, raw: &str) -> ParsedFilter {
        let mut filter = ParsedFilter::new();

        for term in split_terms(raw) {
            for alternative in split_alternatives(&term) {
                let alternative = alternative.trim();
                if alternative.is_empty() {
                    continue;
                }
                match self.parse_term(alternative) {
                    Some(atom) => filter.push(atom),
                    None => debug!(term = alternative, "dropping filter term that cannot be queried"),
                }
            }
        }

        filter
    }

    /// Parses one trimmed, non-empty sub-term.
    fn parse_term(&self, term: &str) -> Option<FilterAtom> {
        let (include, term) = match term.strip_prefix('-') {
            Some(rest) => (false, rest.trim()),
            None => (true, term),
        };

        let Some((name, value)) = term.split_once(':') else {
            return self.index_atom(self.registry.fall_through(), include, None, term);
        };

        let Some(field) = self.registry.resolve(name) else {
            let sub_key = name.trim();
            return self.keyed_index_atom(self.registry.fall_through(), include, sub_key, value);
        };

        let descriptor = field.descriptor();
        let value = value.trim();

        if value.is_empty() {
            return descriptor
                .index_key
                .map(|_| FilterAtom::Index(IndexAtom::new(field, include, None, Vec::new())));
        }

        if descriptor.accepts_identifiers() {
            match self.parse_identifiers(value) {
                IdentifierValue::Ids(ids) => {
                    return Some(FilterAtom::Identifier(IdentifierAtom::new(field, include, ids)));
                }
                IdentifierValue::Overflow => {
                    debug!(%field, value, "id out of range, searching as text");
                    return self.text_atom(field, include, value);
                }
                IdentifierValue::NotNumeric => {}
            }
        }

        if descriptor.is_divisible() {
            if let Some((sub_key, sub_value)) = value.split_once(':') {
                return self.keyed_index_atom(field, include, sub_key.trim(), sub_value);
            }
        }

        self.text_atom(field, include, value)
    }

    /// Builds the atom for a non-numeric value: index first, then text column.
    fn text_atom(&self, field: FilterField, include: bool, value: &str) -> Option<FilterAtom> {
        let descriptor = field.descriptor();
        if descriptor.index_key.is_some() {
            self.index_atom(field, include, None, value)
        } else if descriptor.text_column.is_some() {
            Some(FilterAtom::Relational(RelationalAtom::new(field, include, value)))
        } else {
            None
        }
    }

    /// Builds a keyed index atom; a blank value asks for existence of the key.
    fn keyed_index_atom(
        &self,
        field: FilterField,
        include: bool,
        sub_key: &str,
        value: &str,
    ) -> Option<FilterAtom> {
        let sub_key = (!sub_key.is_empty()).then(|| sub_key.to_string());
        if value.trim().is_empty() {
            return Some(FilterAtom::Index(IndexAtom::new(field, include, sub_key, Vec::new())));
        }
        self.index_atom(field, include, sub_key, value)
    }

    fn index_atom(
        &self,
        field: FilterField,
        include: bool,
        sub_key: Option<String>,
        text: &str,
    ) -> Option<FilterAtom> {
        let tokens = self.normalizer.normalize(text);
        if tokens.is_empty() {
            return None;
        }
        Some(FilterAtom::Index(IndexAtom::new(field, include, sub_key, tokens)))
    }

    /// Matches the id, range and list grammar.
    fn parse_identifiers(&self, value: &str) -> IdentifierValue {
        if let Some(captures) = self.id_or_range.captures(value) {
            let low = captures.get(1).map(|m| m.as_str().parse::<RecordId>());
            let high = captures.get(2).map(|m| m.as_str().parse::<RecordId>());
            return match (low, high) {
                (Some(Ok(id)), None) => IdentifierValue::Ids(Identifiers::Single(id)),
                (Some(Ok(a)), Some(Ok(b))) => IdentifierValue::Ids(Identifiers::Range {
                    low: a.min(b),
                    high: a.max(b),
                }),
                _ => IdentifierValue::Overflow,
            };
        }

        if self.id_list.is_match(value) {
            return match value
                .split_whitespace()
                .map(str::parse::<RecordId>)
                .collect::<Result<Vec<_>, _>>()
            {
                Ok(ids) => IdentifierValue::Ids(Identifiers::List(ids)),
                Err(_) => IdentifierValue::Overflow,
            };
        }

        IdentifierValue::NotNumeric
    }
}

impl Default for FilterParser {
    fn default() -> Self {
        Self::new(Arc::new(FieldRegistry::new()), 3)
    }
}

/// Splits the raw string into top-level terms.
///
/// Outside double quotes every code point up to U+0020 separates terms; inside
/// quotes it is kept. The quotes themselves are dropped.
pub fn split_terms(raw: &str) -> Vec<String> {
    let mut terms = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in raw.chars() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if !in_quotes && c <= ' ' {
            if !current.is_empty() {
                terms.push(std::mem::take(&mut current));
            }
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        terms.push(current);
    }

    terms
}

/// Splits a term at `|` outside parentheses.
///
/// Parentheses are kept verbatim; an unmatched `)` is literal.
pub fn split_alternatives(term: &str) -> Vec<String> {
    let mut alternatives = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    for c in term.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            '|' if depth == 0 => alternatives.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    alternatives.push(current);

    alternatives
}
