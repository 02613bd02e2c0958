//! Native value <-> wire attribute transcoding
//!
//! Outbound conversion is total: sets become lists, dates become RFC 3339
//! strings and everything else maps to its natural tag. Inbound conversion is
//! directed by the schema for top-level fields only: a `date` field's string
//! becomes a [`Value::Date`] and a `set` field's list becomes a
//! [`Value::Set`]. Nested values inside lists and maps pass through without
//! schema direction.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;

use crate::error::{DocumentStoreError, Result};
use crate::schema::Schema;
use crate::types::{Field, FieldKind, SetItemKind};
use crate::value::{Record, SetValue, Value};
use crate::wire::attribute::{AttributeValue, Item};

/// Convert a native value to its wire attribute
pub fn to_wire(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(format_number(*n)),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Date(d) => AttributeValue::S(format_date(d)),
        Value::Set(SetValue::Strings(items)) => AttributeValue::L(
            items
                .iter()
                .map(|s| AttributeValue::S(s.clone()))
                .collect(),
        ),
        Value::Set(SetValue::Numbers(items)) => AttributeValue::L(
            items
                .iter()
                .map(|d| AttributeValue::N(d.to_string()))
                .collect(),
        ),
        Value::List(items) => AttributeValue::L(items.iter().map(to_wire).collect()),
        Value::Map(m) => {
            AttributeValue::M(m.iter().map(|(k, v)| (k.clone(), to_wire(v))).collect())
        }
    }
}

/// Convert a native record to a wire item
pub fn record_to_item(record: &Record) -> Item {
    to_wire_map(record)
}

/// Convert any name-to-value table, such as expression value aliases
pub fn to_wire_map<'a, I>(entries: I) -> Item
where
    I: IntoIterator<Item = (&'a String, &'a Value)>,
{
    entries
        .into_iter()
        .map(|(k, v)| (k.clone(), to_wire(v)))
        .collect()
}

/// Convert a wire attribute to a native value without schema direction.
///
/// Store-native string and number sets always decode to [`Value::Set`].
pub fn from_wire(attr: &AttributeValue) -> Result<Value> {
    Ok(match attr {
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => Value::Number(parse_number(n)?),
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::L(items) => {
            Value::List(items.iter().map(from_wire).collect::<Result<Vec<_>>>()?)
        }
        AttributeValue::M(m) => Value::Map(
            m.iter()
                .map(|(k, v)| Ok((k.clone(), from_wire(v)?)))
                .collect::<Result<Record>>()?,
        ),
        AttributeValue::Ss(items) => Value::Set(SetValue::strings(items.iter().cloned())),
        AttributeValue::Ns(items) => Value::Set(SetValue::Numbers(
            items
                .iter()
                .map(|n| parse_decimal(n))
                .collect::<Result<_>>()?,
        )),
    })
}

/// Convert a top-level attribute, directed by its field definition if any
pub fn from_wire_field(attr: &AttributeValue, field: Option<&Field>) -> Result<Value> {
    match (field.map(|f| &f.kind), attr) {
        (Some(FieldKind::Date), AttributeValue::S(s)) => Ok(match parse_date(s) {
            Some(date) => Value::Date(date),
            None => Value::String(s.clone()),
        }),
        (Some(FieldKind::Set { item }), AttributeValue::L(items)) => {
            match list_to_set(items, *item)? {
                Some(set) => Ok(Value::Set(set)),
                None => from_wire(attr),
            }
        }
        _ => from_wire(attr),
    }
}

/// Convert a wire item to a native record using the schema for top-level kinds
pub fn item_to_record(item: &Item, schema: &Schema) -> Result<Record> {
    item.iter()
        .map(|(name, attr)| Ok((name.clone(), from_wire_field(attr, schema.get(name))?)))
        .collect()
}

/// Lists that are homogeneous strings or numbers become sets; anything else
/// is left for plain decoding.
fn list_to_set(items: &[AttributeValue], kind: SetItemKind) -> Result<Option<SetValue>> {
    if items.is_empty() {
        return Ok(Some(match kind {
            SetItemKind::String => SetValue::Strings(Default::default()),
            SetItemKind::Number => SetValue::Numbers(Default::default()),
        }));
    }

    if let Some(strings) = items
        .iter()
        .map(|a| a.as_s().map(str::to_string))
        .collect::<Option<Vec<_>>>()
    {
        return Ok(Some(SetValue::strings(strings)));
    }

    match items.iter().map(|a| a.as_n()).collect::<Option<Vec<_>>>() {
        Some(numbers) => Ok(Some(SetValue::Numbers(
            numbers
                .into_iter()
                .map(parse_decimal)
                .collect::<Result<_>>()?,
        ))),
        None => Ok(None),
    }
}

fn format_number(n: f64) -> String {
    // Display for f64 is the shortest text that parses back to the same value
    n.to_string()
}

fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

fn parse_number(n: &str) -> Result<f64> {
    n.parse::<f64>()
        .map_err(|_| DocumentStoreError::invalid_wire_value(format!("'{}' is not a number", n)))
}

fn parse_decimal(n: &str) -> Result<Decimal> {
    Decimal::from_str(n)
        .or_else(|_| Decimal::from_scientific(n))
        .map_err(|_| DocumentStoreError::invalid_wire_value(format!("'{}' is not a number", n)))
}
