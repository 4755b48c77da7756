

use std::cmp::Ordering;

use chrono::{DateTime, FixedOffset};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use super::{cql, unquote_property, Filter, FilterGroup, FilterTerm, GroupKind, Operator};
use crate::core::error::Result;

lazy_static! {
    static ref PLAIN_DECIMAL: Regex = Regex::new(r"^-?\d+(\.\d+)?$").unwrap();
}

/// Evaluates a filter tree against a metacard projection (`{"properties": {...}}`).
pub fn matches_filters(metacard: &Value, filter: &Filter) -> bool {
    match filter {
        Filter::Group(group) => matches_group(metacard, group),
        Filter::Term(term) => matches_term(metacard, term),
    }
}


pub fn matches_cql(metacard: &Value, text: &str) -> Result<bool> {
    let filter = cql::read(text)?;
    Ok(matches_filters(metacard, &filter))
}

fn matches_group(metacard: &Value, group: &FilterGroup) -> bool {
    match group.kind {
        GroupKind::And => group.filters.iter().all(|f| matches_filters(metacard, f)),
        GroupKind::Or => group.filters.iter().any(|f| matches_filters(metacard, f)),
        GroupKind::Not => !group.filters.iter().all(|f| matches_filters(metacard, f)),
    }
}

fn matches_term(metacard: &Value, term: &FilterTerm) -> bool {
    let property = unquote_property(&term.property);
    let attribute = metacard
        .get("properties")
        .and_then(|p| p.get(&property))
        .filter(|v| !v.is_null());

    let values: Vec<&Value> = match attribute {
        None => Vec::new(),
        Some(Value::Array(items)) => items.iter().filter(|v| !v.is_null()).collect(),
        Some(value) => vec![value],
    };

    if values.is_empty() {
        return term.op == Operator::IsNull;
    }

    match term.op {
        Operator::Eq => values.iter().any(|v| equals(v, &term.value)),
        Operator::NotEq => !values.iter().any(|v| equals(v, &term.value)),
        Operator::Lt => any_ordering(&values, &term.value, |o| o == Ordering::Less),
        Operator::Lte => any_ordering(&values, &term.value, |o| o != Ordering::Greater),
        Operator::Gt => any_ordering(&values, &term.value, |o| o == Ordering::Greater),
        Operator::Gte => any_ordering(&values, &term.value, |o| o != Ordering::Less),
        Operator::Like | Operator::ILike => {
            let Some(pattern) = term.value.as_str() else {
                return false;
            };
            match wildcard_regex(pattern, term.op == Operator::ILike) {
                Some(regex) => values
                    .iter()
                    .filter_map(|v| text(v))
                    .any(|s| regex.is_match(&s)),
                None => false,
            }
        }
        Operator::Between => {
            let (Some(lower), Some(upper)) = (&term.lower_boundary, &term.upper_boundary) else {
                return false;
            };
            values.iter().any(|v| {
                matches!(compare(v, lower), Some(Ordering::Greater | Ordering::Equal))
                    && matches!(compare(v, upper), Some(Ordering::Less | Ordering::Equal))
            })
        }
        Operator::Before => temporal(&values, &term.value, |t, at| t < at),
        Operator::After => temporal(&values, &term.value, |t, at| t > at),
        Operator::During => {
            let Some((start, end)) = term
                .value
                .as_str()
                .and_then(|s| s.split_once('/'))
                .and_then(|(a, b)| Some((timestamp_str(a)?, timestamp_str(b)?)))
            else {
                debug!("DURING needs a start/end interval, got {}", term.value);
                return false;
            };
            values
                .iter()
                .filter_map(|v| timestamp(v))
                .any(|t| t > start && t < end)
        }
        Operator::IsNull => false,
    }
}

fn any_ordering(values: &[&Value], expected: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    values
        .iter()
        .filter_map(|v| compare(v, expected))
        .any(accept)
}

fn temporal(
    values: &[&Value],
    expected: &Value,
    accept: impl Fn(DateTime<FixedOffset>, DateTime<FixedOffset>) -> bool,
) -> bool {
    let Some(at) = timestamp(expected) else {
        return false;
    };
    values
        .iter()
        .filter_map(|v| timestamp(v))
        .any(|t| accept(t, at))
}

/// Two strings are equal when their text matches or they name the same instant;
/// digit strings such as ids are never coerced to numbers here.
fn equals(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::String(a), Value::String(b)) => {
            a == b
                || matches!((timestamp_str(a), timestamp_str(b)), (Some(x), Some(y)) if x == y)
        }
        _ => compare(actual, expected) == Some(Ordering::Equal),
    }
}

/// Numbers compare numerically, timestamps chronologically, everything else as text.
fn compare(actual: &Value, expected: &Value) -> Option<Ordering> {
    if let (Value::String(a), Value::String(b)) = (actual, expected) {
        if a == b {
            return Some(Ordering::Equal);
        }
    }
    if let (Some(a), Some(b)) = (number(actual), number(expected)) {
        return a.partial_cmp(&b);
    }
    if let (Some(a), Some(b)) = (timestamp(actual), timestamp(expected)) {
        return Some(a.cmp(&b));
    }
    Some(text(actual)?.cmp(&text(expected)?))
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            if PLAIN_DECIMAL.is_match(s) { s.parse().ok() } else { None }
        }
        _ => None,
    }
}

fn timestamp(value: &Value) -> Option<DateTime<FixedOffset>> {
    value.as_str().and_then(timestamp_str)
}

fn timestamp_str(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s.trim()).ok()
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// `*` and `%` match any run, `?` a single character, `\` escapes the next one.
fn wildcard_regex(pattern: &str, case_insensitive: bool) -> Option<Regex> {
    let mut source = String::from(if case_insensitive { "(?is)^" } else { "(?s)^" });
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '*' | '%' => source.push_str(".*"),
            '?' => source.push('.'),
            '\\' => {
                if let Some(escaped) = chars.next() {
                    source.push_str(&regex::escape(&escaped.to_string()));
                }
            }
            other => source.push_str(&regex::escape(&other.to_string())),
        }
    }
    source.push('$');

    match Regex::new(&source) {
        Ok(regex) => Some(regex),
        Err(e) => {
            debug!("Unusable LIKE pattern {:?}: {}", pattern, e);
            None
        }
    }
}
