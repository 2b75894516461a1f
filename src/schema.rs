//! Field Schema
//!
//! Declares field types, primary keys, and the children field shared by every
//! record of a dataset, and performs per-field type coercion on raw rows.

use crate::types::Row;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Default name of the field carrying nested child rows.
pub const DEFAULT_CHILDREN_FIELD: &str = "children";

/// Declared field type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Int,
    Float,
    String,
    Boolean,
    Object,
}

impl FieldType {
    /// Coerce a raw value to this type. Null passes through as null.
    pub fn coerce(&self, value: &Value) -> Value {
        if value.is_null() {
            return Value::Null;
        }
        match self {
            FieldType::Int => coerce_int(value),
            FieldType::Float => coerce_float(value),
            FieldType::String => coerce_string(value),
            FieldType::Boolean => Value::Bool(coerce_bool(value)),
            FieldType::Object => value.clone(),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::String => "string",
            FieldType::Boolean => "boolean",
            FieldType::Object => "object",
        };
        f.write_str(name)
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "int" | "integer" => Ok(FieldType::Int),
            "float" | "number" => Ok(FieldType::Float),
            "string" | "str" => Ok(FieldType::String),
            "boolean" | "bool" => Ok(FieldType::Boolean),
            "object" => Ok(FieldType::Object),
            other => Err(format!(
                "Unknown field type: {} (expected int, float, string, boolean, or object)",
                other
            )),
        }
    }
}

fn coerce_int(value: &Value) -> Value {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(f) = n.as_f64() {
                if f.is_finite() {
                    Value::from(f.trunc() as i64)
                } else {
                    Value::Null
                }
            } else {
                Value::Null
            }
        }
        Value::String(s) => leading_int(s).map(Value::from).unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn coerce_float(value: &Value) -> Value {
    match value {
        Value::Number(n) => n.as_f64().map(Value::from).unwrap_or(Value::Null),
        Value::String(s) => leading_float(s).map(Value::from).unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn coerce_string(value: &Value) -> Value {
    match value {
        Value::String(_) => value.clone(),
        Value::Number(n) => Value::String(n.to_string()),
        Value::Bool(b) => Value::String(b.to_string()),
        other => Value::String(other.to_string()),
    }
}

fn coerce_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() == Some(1.0),
        Value::String(s) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// Parse the longest leading integer of `s` (sign plus digits, after trimming).
fn leading_int(s: &str) -> Option<i64> {
    let s = s.trim();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end == digits_start {
        return None;
    }
    s[..end].parse().ok()
}

/// Parse the longest leading float of `s`.
fn leading_float(s: &str) -> Option<f64> {
    let s = s.trim();
    let candidate_len = s
        .char_indices()
        .take_while(|(_, c)| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
        .map(|(i, c)| i + c.len_utf8())
        .last()
        .unwrap_or(0);
    (1..=candidate_len)
        .rev()
        .find_map(|end| s[..end].parse::<f64>().ok())
        .filter(|f| f.is_finite())
}

/// A single declared field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: Option<FieldType>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type: Some(field_type),
        }
    }

    /// A field that is known by name but carries no declared type.
    pub fn untyped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: None,
        }
    }
}

impl FromStr for FieldDef {
    type Err = String;

    /// Parse `name` or `name:type`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((name, ty)) if !name.trim().is_empty() => {
                Ok(FieldDef::new(name.trim(), ty.parse::<FieldType>()?))
            }
            Some(_) => Err(format!("Missing field name in '{}'", s)),
            None if !s.trim().is_empty() => Ok(FieldDef::untyped(s.trim())),
            None => Err("Empty field definition".to_string()),
        }
    }
}

/// Schema shared by every record of a dataset.
///
/// The order of `fields` is significant: positional rows are mapped onto it
/// and it is sent to remote collaborators as the `fields` parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub primary_keys: Vec<String>,
    #[serde(default = "default_children_field")]
    pub children_field: String,
}

fn default_children_field() -> String {
    DEFAULT_CHILDREN_FIELD.to_string()
}

impl Default for Schema {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Schema {
    pub fn new(fields: Vec<FieldDef>) -> Self {
        Self {
            fields,
            primary_keys: Vec::new(),
            children_field: default_children_field(),
        }
    }

    pub fn with_primary_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_children_field(mut self, field: impl Into<String>) -> Self {
        self.children_field = field.into();
        self
    }

    /// Declared type of a field, if any.
    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .and_then(|f| f.field_type)
    }

    /// Known field names in declaration order.
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// Coerce every declared field of `row`, skipping the children field.
    /// Undeclared fields pass through untouched.
    pub fn coerce_row(&self, row: &Row) -> Row {
        row.iter()
            .filter(|(key, _)| **key != self.children_field)
            .map(|(key, value)| {
                let value = match self.field_type(key) {
                    Some(ty) => ty.coerce(value),
                    None => value.clone(),
                };
                (key.clone(), value)
            })
            .collect()
    }

    /// Map a positional row onto the declared fields. Extra positions are
    /// dropped; nested positional rows under the children field are mapped
    /// recursively.
    pub fn row_from_positional(&self, values: &[Value]) -> Row {
        self.fields
            .iter()
            .zip(values.iter())
            .map(|(field, value)| {
                let value = if field.name == self.children_field {
                    match value {
                        Value::Array(items) => Value::Array(
                            items
                                .iter()
                                .map(|item| match item {
                                    Value::Array(child) => {
                                        Value::Object(self.row_from_positional(child))
                                    }
                                    other => other.clone(),
                                })
                                .collect(),
                        ),
                        other => other.clone(),
                    }
                } else {
                    value.clone()
                };
                (field.name.clone(), value)
            })
            .collect()
    }
}
