//! Field filters, AND/OR composition, and the predicate evaluator.

use crate::query::sort::compare_values;
use crate::types::Row;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Comparison operator of a single field filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FilterOperator {
    #[default]
    #[serde(rename = "=", alias = "==")]
    Eq,
    #[serde(rename = "!=", alias = "<>")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "like")]
    Like,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "notin")]
    NotIn,
}

impl FromStr for FilterOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "=" | "==" => Ok(FilterOperator::Eq),
            "!=" | "<>" => Ok(FilterOperator::Ne),
            "<" => Ok(FilterOperator::Lt),
            "<=" => Ok(FilterOperator::Le),
            ">" => Ok(FilterOperator::Gt),
            ">=" => Ok(FilterOperator::Ge),
            "like" | "~" => Ok(FilterOperator::Like),
            "in" => Ok(FilterOperator::In),
            "notin" => Ok(FilterOperator::NotIn),
            other => Err(format!("Unknown filter operator: {}", other)),
        }
    }
}

/// How per-field results combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FilterMode {
    #[default]
    #[serde(rename = "AND", alias = "and")]
    And,
    #[serde(rename = "OR", alias = "or")]
    Or,
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterMode::And => f.write_str("AND"),
            FilterMode::Or => f.write_str("OR"),
        }
    }
}

impl FromStr for FilterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AND" => Ok(FilterMode::And),
            "OR" => Ok(FilterMode::Or),
            other => Err(format!("Invalid filter mode: {} (must be AND or OR)", other)),
        }
    }
}

/// `{value, operator}` condition on one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub value: Value,
    #[serde(default)]
    pub operator: FilterOperator,
}

impl FilterCondition {
    pub fn new(value: impl Into<Value>, operator: FilterOperator) -> Self {
        Self {
            value: value.into(),
            operator,
        }
    }

    pub fn equals(value: impl Into<Value>) -> Self {
        Self::new(value, FilterOperator::Eq)
    }
}

/// Evaluates a single field value against a condition.
pub trait FilterMatcher: Send + Sync {
    fn matches(&self, value: &Value, condition: &FilterCondition) -> bool;
}

/// Default evaluator for [`FilterOperator`].
#[derive(Debug, Clone, Copy, Default)]
pub struct OperatorMatcher;

impl FilterMatcher for OperatorMatcher {
    fn matches(&self, value: &Value, condition: &FilterCondition) -> bool {
        let target = &condition.value;
        match condition.operator {
            FilterOperator::Eq => loosely_equal(value, target),
            FilterOperator::Ne => !loosely_equal(value, target),
            FilterOperator::Lt => loose_order(value, target) == Some(Ordering::Less),
            FilterOperator::Le => matches!(
                loose_order(value, target),
                Some(Ordering::Less) | Some(Ordering::Equal)
            ),
            FilterOperator::Gt => loose_order(value, target) == Some(Ordering::Greater),
            FilterOperator::Ge => matches!(
                loose_order(value, target),
                Some(Ordering::Greater) | Some(Ordering::Equal)
            ),
            FilterOperator::Like => {
                if value.is_null() {
                    return false;
                }
                scalar_text(value)
                    .to_lowercase()
                    .contains(&scalar_text(target).to_lowercase())
            }
            FilterOperator::In => members(target).iter().any(|m| loosely_equal(value, m)),
            FilterOperator::NotIn => !members(target).iter().any(|m| loosely_equal(value, m)),
        }
    }
}

fn members(target: &Value) -> Vec<Value> {
    match target {
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Equality that treats a number and its decimal string as equal.
fn loosely_equal(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
            match (as_number(a), as_number(b)) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            }
        }
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => false,
    }
}

fn loose_order(a: &Value, b: &Value) -> Option<Ordering> {
    if a.is_null() || b.is_null() {
        return None;
    }
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        if a.is_number() || b.is_number() {
            return x.partial_cmp(&y);
        }
    }
    Some(compare_values(a, b))
}

/// Ordered field -> condition map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters(Vec<(String, FilterCondition)>);

impl Filters {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert or replace the condition for `field`.
    pub fn set(&mut self, field: impl Into<String>, condition: FilterCondition) {
        let field = field.into();
        match self.0.iter_mut().find(|(name, _)| *name == field) {
            Some(entry) => entry.1 = condition,
            None => self.0.push((field, condition)),
        }
    }

    pub fn with(mut self, field: impl Into<String>, condition: FilterCondition) -> Self {
        self.set(field, condition);
        self
    }

    pub fn remove(&mut self, field: &str) -> Option<FilterCondition> {
        let index = self.0.iter().position(|(name, _)| name == field)?;
        Some(self.0.remove(index).1)
    }

    pub fn get(&self, field: &str) -> Option<&FilterCondition> {
        self.0
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, condition)| condition)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterCondition)> {
        self.0.iter().map(|(name, condition)| (name.as_str(), condition))
    }

    /// Test a raw row. An empty filter set accepts every row; absent fields
    /// are tested as null.
    pub fn test(&self, row: &Row, mode: FilterMode, matcher: &dyn FilterMatcher) -> bool {
        if self.0.is_empty() {
            return true;
        }
        let mut results = self.0.iter().map(|(field, condition)| {
            let value = row.get(field).unwrap_or(&Value::Null);
            matcher.matches(value, condition)
        });
        match mode {
            FilterMode::And => results.all(|ok| ok),
            FilterMode::Or => results.any(|ok| ok),
        }
    }
}

impl<S: Into<String>> FromIterator<(S, FilterCondition)> for Filters {
    fn from_iter<I: IntoIterator<Item = (S, FilterCondition)>>(iter: I) -> Self {
        let mut filters = Filters::new();
        for (field, condition) in iter {
            filters.set(field, condition);
        }
        filters
    }
}

impl Serialize for Filters {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (field, condition) in &self.0 {
            map.serialize_entry(field, condition)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Filters {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FiltersVisitor;

        impl<'de> Visitor<'de> for FiltersVisitor {
            type Value = Filters;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of field name to {value, operator}")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Filters, A::Error> {
                let mut filters = Filters::new();
                while let Some((field, condition)) =
                    access.next_entry::<String, FilterCondition>()?
                {
                    filters.set(field, condition);
                }
                Ok(filters)
            }
        }

        deserializer.deserialize_map(FiltersVisitor)
    }
}
