//! Multi-key sorters and the value comparator they share.

use crate::types::Row;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    #[serde(rename = "ASC", alias = "asc")]
    Asc,
    #[serde(rename = "DESC", alias = "desc")]
    Desc,
}

impl SortDirection {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => f.write_str("ASC"),
            SortDirection::Desc => f.write_str("DESC"),
        }
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ASC" => Ok(SortDirection::Asc),
            "DESC" => Ok(SortDirection::Desc),
            other => Err(format!("Invalid sort direction: {} (must be ASC or DESC)", other)),
        }
    }
}

/// Ordered field -> direction map. Earlier entries take precedence.
///
/// Serializes as a JSON object whose keys keep insertion order, which is the
/// form remote collaborators receive in the `sorters` parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sorters(Vec<(String, SortDirection)>);

impl Sorters {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn single(field: impl Into<String>, direction: SortDirection) -> Self {
        let mut sorters = Self::new();
        sorters.set(field, direction);
        sorters
    }

    /// Insert or update a sorter. Updating keeps the field's original position.
    pub fn set(&mut self, field: impl Into<String>, direction: SortDirection) {
        let field = field.into();
        match self.0.iter_mut().find(|(name, _)| *name == field) {
            Some(entry) => entry.1 = direction,
            None => self.0.push((field, direction)),
        }
    }

    pub fn with(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.set(field, direction);
        self
    }

    pub fn remove(&mut self, field: &str) -> Option<SortDirection> {
        let index = self.0.iter().position(|(name, _)| name == field)?;
        Some(self.0.remove(index).1)
    }

    pub fn get(&self, field: &str) -> Option<SortDirection> {
        self.0
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, direction)| *direction)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, SortDirection)> {
        self.0.iter().map(|(name, direction)| (name.as_str(), *direction))
    }

    /// Project the sort key of a row: one value per sorter, in sorter order.
    pub fn sort_key(&self, row: &Row) -> Vec<Value> {
        self.0
            .iter()
            .map(|(field, _)| row.get(field).cloned().unwrap_or(Value::Null))
            .collect()
    }

    /// Compare two sort keys produced by [`Sorters::sort_key`]. The first
    /// unequal field decides; all-equal keys compare equal.
    pub fn compare_keys(&self, a: &[Value], b: &[Value]) -> Ordering {
        for ((_, direction), (left, right)) in self.0.iter().zip(a.iter().zip(b.iter())) {
            let ordering = compare_values(left, right);
            if ordering != Ordering::Equal {
                return direction.apply(ordering);
            }
        }
        Ordering::Equal
    }
}

impl<S: Into<String>> FromIterator<(S, SortDirection)> for Sorters {
    fn from_iter<I: IntoIterator<Item = (S, SortDirection)>>(iter: I) -> Self {
        let mut sorters = Sorters::new();
        for (field, direction) in iter {
            sorters.set(field, direction);
        }
        sorters
    }
}

impl Serialize for Sorters {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (field, direction) in &self.0 {
            map.serialize_entry(field, direction)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Sorters {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SortersVisitor;

        impl<'de> Visitor<'de> for SortersVisitor {
            type Value = Sorters;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of field name to ASC/DESC")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Sorters, A::Error> {
                let mut sorters = Sorters::new();
                while let Some((field, direction)) =
                    access.next_entry::<String, SortDirection>()?
                {
                    sorters.set(field, direction);
                }
                Ok(sorters)
            }
        }

        deserializer.deserialize_map(SortersVisitor)
    }
}

/// Ordering rank used when two values have different JSON types.
fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total order over field values used by every sorter.
///
/// Same-typed scalars compare naturally; mixed types order by type rank
/// (null, boolean, number, string, array, object). Arrays and objects compare
/// by their serialized form.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => {
                let x = x.as_f64().unwrap_or(0.0);
                let y = y.as_f64().unwrap_or(0.0);
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
            a.to_string().cmp(&b.to_string())
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}
