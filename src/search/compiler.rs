//! Compilation of keyword filters into a catalog search payload
//!
//! Filter keys are `<field>` or `<field>__<operator>`. Unknown fields, unknown
//! operators, unsupported sort keys and invalid limits never fail the
//! compilation: they are dropped, logged, and reported in
//! [`CompiledQuery::ignored`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::fields::{self, FieldKind, Operator};

/// Reserved filter key carrying sort directives
pub const SORTBY_KEY: &str = "sortby";

const OPERATOR_SEPARATOR: &str = "__";

/// Ordered keyword filters, as a caller would pass them
///
/// Inserting an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilters {
    entries: Vec<(String, Value)>,
}

impl SearchFilters {
    /// Empty filter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`SearchFilters::insert`]
    pub fn filter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Builder-style sort directives such as `"-datetime"`
    pub fn sortby<I, S>(self, directives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let directives: Vec<Value> = directives
            .into_iter()
            .map(|d| Value::String(d.into()))
            .collect();
        self.filter(SORTBY_KEY, directives)
    }

    /// Set `key` to `value`
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Value stored under `key`
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Whether `key` is present
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Whether no filter is set
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// String values of the `ids` filter, if any
    pub fn ids(&self) -> Option<Vec<String>> {
        match self.get("ids")? {
            Value::Array(values) => Some(
                values
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
            ),
            Value::String(id) => Some(vec![id.clone()]),
            _ => None,
        }
    }

    /// Compile into a search payload
    pub fn compile(&self) -> CompiledQuery {
        QueryCompiler::compile(self)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for SearchFilters {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut filters = Self::new();
        for (key, value) in iter {
            filters.insert(key, value);
        }
        filters
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending (`+` prefix or no prefix)
    Asc,
    /// Descending (`-` prefix)
    Desc,
}

/// One entry of the payload's `sortby` list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortDirective {
    /// Server sort key
    pub field: String,
    /// Direction
    pub direction: SortDirection,
}

/// Wire body of a catalog search request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchPayload {
    /// Direct fields other than `limit`
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
    /// Query fields keyed by wire name, then operator
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub query: BTreeMap<String, BTreeMap<String, Value>>,
    /// Sort directives
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sortby: Vec<SortDirective>,
    /// Per-request page size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    /// Page number, set from the second page on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
}

/// Why a filter was dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Field name not in the supported set
    UnsupportedField,
    /// Operator suffix not in the supported set
    UnsupportedOperator(String),
    /// Field cannot be sorted by
    UnsupportedSortField,
    /// Sort directive is not a string
    InvalidSortDirective,
    /// `limit` is not a non-negative integer
    InvalidLimit,
}

/// A dropped filter and the reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoredFilter {
    /// Key or sort directive as supplied
    pub key: String,
    /// Reason
    pub reason: IgnoreReason,
}

impl fmt::Display for IgnoredFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            IgnoreReason::UnsupportedField => {
                write!(f, "filter {} not supported ... omitting", self.key)
            }
            IgnoreReason::UnsupportedOperator(op) => {
                write!(f, "operator {} of {} not supported ... omitting", op, self.key)
            }
            IgnoreReason::UnsupportedSortField => {
                write!(f, "sorting by {} not supported ... omitting", self.key)
            }
            IgnoreReason::InvalidSortDirective => {
                write!(f, "sort directive {} is not a string ... omitting", self.key)
            }
            IgnoreReason::InvalidLimit => {
                write!(f, "limit {} is not a non-negative integer ... omitting", self.key)
            }
        }
    }
}

/// Compiled payload plus diagnostics for dropped filters
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    /// Payload ready for transport
    pub payload: SearchPayload,
    /// Filters that were dropped
    pub ignored: Vec<IgnoredFilter>,
}

/// Stateless filter compiler
pub struct QueryCompiler;

impl QueryCompiler {
    /// Compile `filters` into a payload
    pub fn compile(filters: &SearchFilters) -> CompiledQuery {
        let mut payload = SearchPayload::default();
        let mut ignored = Vec::new();

        for (key, value) in filters.iter() {
            if key == SORTBY_KEY {
                payload.sortby = Self::compile_sortby(value, &mut ignored);
                continue;
            }

            let (name, suffix) = split_operator(key);
            let Some(field) = fields::lookup(name) else {
                ignored.push(IgnoredFilter {
                    key: key.to_string(),
                    reason: IgnoreReason::UnsupportedField,
                });
                continue;
            };
            let Some(mut op) = Operator::parse(suffix) else {
                ignored.push(IgnoredFilter {
                    key: key.to_string(),
                    reason: IgnoreReason::UnsupportedOperator(suffix.to_string()),
                });
                continue;
            };

            match field.kind {
                FieldKind::Direct if field.name == "limit" => match value.as_u64() {
                    Some(limit) => payload.limit = Some(limit),
                    None => ignored.push(IgnoredFilter {
                        key: value.to_string(),
                        reason: IgnoreReason::InvalidLimit,
                    }),
                },
                FieldKind::Direct => {
                    payload.fields.insert(field.name.to_string(), value.clone());
                }
                FieldKind::Query => {
                    if value.is_array() {
                        op = Operator::In;
                    }
                    payload
                        .query
                        .entry(field.wire_name.to_string())
                        .or_default()
                        .insert(op.as_str().to_string(), value.clone());
                }
            }
        }

        for filter in &ignored {
            warn!("{}", filter);
        }

        CompiledQuery { payload, ignored }
    }

    fn compile_sortby(value: &Value, ignored: &mut Vec<IgnoredFilter>) -> Vec<SortDirective> {
        let directives: Vec<&Value> = match value {
            Value::Array(values) => values.iter().collect(),
            other => vec![other],
        };

        let mut sorts = Vec::with_capacity(directives.len());
        for directive in directives {
            let Some(raw) = directive.as_str() else {
                ignored.push(IgnoredFilter {
                    key: directive.to_string(),
                    reason: IgnoreReason::InvalidSortDirective,
                });
                continue;
            };

            let (direction, name) = match raw.chars().next() {
                Some('-') => (SortDirection::Desc, &raw[1..]),
                Some('+') => (SortDirection::Asc, &raw[1..]),
                _ => (SortDirection::Asc, raw),
            };

            match fields::sort_key(name) {
                Some(field) => sorts.push(SortDirective { field, direction }),
                None => ignored.push(IgnoredFilter {
                    key: name.to_string(),
                    reason: IgnoreReason::UnsupportedSortField,
                }),
            }
        }
        sorts
    }
}

/// Split `field__op` at the first separator; a missing suffix means `eq`
///
/// Everything after the first separator is the operator, so
/// `incidence_angle__gt__x` has operator `gt__x` and is dropped.
fn split_operator(key: &str) -> (&str, &str) {
    key.split_once(OPERATOR_SEPARATOR)
        .unwrap_or((key, Operator::Eq.as_str()))
}
