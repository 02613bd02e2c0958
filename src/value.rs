//! Native record values
//!
//! Records are plain maps of field name to [`Value`]. Temporal values and
//! uniqueness sets are first-class so they survive the trip to and from the
//! store's wire format.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// A record: field name to native value
pub type Record = BTreeMap<String, Value>;

/// Native value held in a record
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    /// A UTC instant
    Date(DateTime<Utc>),
    /// Unordered collection without duplicates
    Set(SetValue),
    List(Vec<Value>),
    Map(Record),
}

/// Uniqueness-set collection; elements are all strings or all numbers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetValue {
    Strings(BTreeSet<String>),
    Numbers(BTreeSet<Decimal>),
}

impl SetValue {
    /// Build a string set, dropping duplicates
    pub fn strings<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SetValue::Strings(items.into_iter().map(Into::into).collect())
    }

    /// Build a number set, dropping duplicates
    pub fn numbers<I, N>(items: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Decimal>,
    {
        SetValue::Numbers(items.into_iter().map(Into::into).collect())
    }

    pub fn len(&self) -> usize {
        match self {
            SetValue::Strings(s) => s.len(),
            SetValue::Numbers(n) => n.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_str(&self, item: &str) -> bool {
        matches!(self, SetValue::Strings(s) if s.contains(item))
    }

    /// Elements as individual values, in set order
    pub fn to_values(&self) -> Vec<Value> {
        match self {
            SetValue::Strings(s) => s.iter().cloned().map(Value::String).collect(),
            SetValue::Numbers(n) => n
                .iter()
                .map(|d| d.to_f64().map_or(Value::Null, Value::Number))
                .collect(),
        }
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&DateTime<Utc>> {
        match self {
            Value::Date(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&SetValue> {
        match self {
            Value::Set(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Record> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Short name of the value's type, for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::Set(_) => "set",
            Value::List(_) => "array",
            Value::Map(_) => "object",
        }
    }

    /// Render as JSON. Dates become RFC 3339 strings, sets become arrays and
    /// non-finite numbers become null.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Date(d) => {
                serde_json::Value::String(d.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Value::Set(SetValue::Strings(s)) => s
                .iter()
                .map(|v| serde_json::Value::String(v.clone()))
                .collect(),
            Value::Set(SetValue::Numbers(n)) => n
                .iter()
                .map(|d| {
                    d.to_f64()
                        .and_then(serde_json::Number::from_f64)
                        .map(serde_json::Value::Number)
                        .unwrap_or(serde_json::Value::Null)
                })
                .collect(),
            Value::List(items) => items.iter().map(Value::to_json).collect(),
            Value::Map(m) => serde_json::Value::Object(
                m.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(m) => {
                Value::Map(m.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(f64::from(value))
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Date(value)
    }
}

impl From<SetValue> for Value {
    fn from(value: SetValue) -> Self {
        Value::Set(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Value::Map(value)
    }
}

/// Build a record from a JSON object. Non-object input yields an empty record.
pub fn record_from_json(value: serde_json::Value) -> Record {
    match Value::from(value) {
        Value::Map(m) => m,
        _ => Record::new(),
    }
}
