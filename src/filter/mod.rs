//! Filter trees, their CQL text form, and evaluation against metacards.

pub mod cql;
pub mod matcher;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumString};

pub use matcher::{matches_cql, matches_filters};


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
pub enum GroupKind {
    #[serde(rename = "AND")]
    #[strum(serialize = "AND")]
    And,
    #[serde(rename = "OR")]
    #[strum(serialize = "OR")]
    Or,
    #[serde(rename = "NOT")]
    #[strum(serialize = "NOT")]
    Not,
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
pub enum Operator {
    #[serde(rename = "=")]
    #[strum(serialize = "=")]
    Eq,
    #[serde(rename = "<>", alias = "!=")]
    #[strum(to_string = "<>", serialize = "!=")]
    NotEq,
    #[serde(rename = "<")]
    #[strum(serialize = "<")]
    Lt,
    #[serde(rename = "<=")]
    #[strum(serialize = "<=")]
    Lte,
    #[serde(rename = ">")]
    #[strum(serialize = ">")]
    Gt,
    #[serde(rename = ">=")]
    #[strum(serialize = ">=")]
    Gte,
    #[serde(rename = "LIKE")]
    #[strum(serialize = "LIKE")]
    Like,
    #[serde(rename = "ILIKE")]
    #[strum(serialize = "ILIKE")]
    ILike,
    #[serde(rename = "BETWEEN")]
    #[strum(serialize = "BETWEEN")]
    Between,
    #[serde(rename = "IS NULL")]
    #[strum(serialize = "IS NULL")]
    IsNull,
    #[serde(rename = "BEFORE")]
    #[strum(serialize = "BEFORE")]
    Before,
    #[serde(rename = "AFTER")]
    #[strum(serialize = "AFTER")]
    After,
    #[serde(rename = "DURING")]
    #[strum(serialize = "DURING")]
    During,
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterGroup {
    #[serde(rename = "type")]
    pub kind: GroupKind,
    #[serde(default)]
    pub filters: Vec<Filter>,
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterTerm {
    #[serde(rename = "type")]
    pub op: Operator,
    /// Attribute name, without CQL quoting.
    pub property: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower_boundary: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper_boundary: Option<Value>,
}

impl FilterTerm {
    pub fn new(op: Operator, property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            op,
            property: unquote_property(&property.into()),
            value: value.into(),
            lower_boundary: None,
            upper_boundary: None,
        }
    }
}


/// A filter expression in the catalog's JSON tree shape:
/// `{"type": "AND", "filters": [...]}` or `{"type": "=", "property": ..., "value": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Filter {
    Group(FilterGroup),
    Term(FilterTerm),
}

impl Filter {
    pub fn and(filters: Vec<Filter>) -> Self {
        Self::Group(FilterGroup {
            kind: GroupKind::And,
            filters,
        })
    }

    pub fn or(filters: Vec<Filter>) -> Self {
        Self::Group(FilterGroup {
            kind: GroupKind::Or,
            filters,
        })
    }

    pub fn not(filter: Filter) -> Self {
        Self::Group(FilterGroup {
            kind: GroupKind::Not,
            filters: vec![filter],
        })
    }

    pub fn term(op: Operator, property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Term(FilterTerm::new(op, property, value))
    }

    pub fn eq(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::term(Operator::Eq, property, value)
    }

    pub fn ilike(property: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::term(Operator::ILike, property, pattern.into())
    }

    pub fn is_null(property: impl Into<String>) -> Self {
        Self::term(Operator::IsNull, property, Value::Null)
    }

    pub fn between(property: impl Into<String>, lower: impl Into<Value>, upper: impl Into<Value>) -> Self {
        let mut term = FilterTerm::new(Operator::Between, property, Value::Null);
        term.lower_boundary = Some(lower.into());
        term.upper_boundary = Some(upper.into());
        Self::Term(term)
    }

    /// Serializes to CQL text.
    pub fn to_cql(&self) -> String {
        cql::write(self)
    }
}

/// Strips one level of surrounding double quotes, as found in `"id"`.
pub(crate) fn unquote_property(property: &str) -> String {
    property
        .strip_prefix('"')
        .and_then(|p| p.strip_suffix('"'))
        .map(|p| p.replace("\"\"", "\""))
        .unwrap_or_else(|| property.to_string())
}
