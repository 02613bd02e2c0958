//! Record validation against a [`Schema`]
//!
//! Validation is fail-fast: fields are checked in schema declaration order and
//! the first violation is returned. Array, object and set fields get a
//! structural type check only; their contents are not validated recursively.

use chrono::{DateTime, Datelike, Utc};

use crate::error::ValidationError;
use crate::schema::Schema;
use crate::types::{Field, FieldKind, NumberConstraints, StringConstraints};
use crate::value::{Record, Value};

/// Validate a complete record. Required fields must be present and non-null.
pub fn validate(record: &Record, schema: &Schema) -> Result<(), ValidationError> {
    for (name, field) in schema.iter() {
        validate_field(name, field, record.get(name))?;
    }
    Ok(())
}

/// Validate only the fields present in `changes`.
///
/// Absent fields are not checked against `required`; a field explicitly set
/// to null still is.
pub fn validate_partial(changes: &Record, schema: &Schema) -> Result<(), ValidationError> {
    for (name, field) in schema.iter() {
        if let Some(value) = changes.get(name) {
            validate_field(name, field, Some(value))?;
        }
    }
    Ok(())
}

/// Validate a single value against its field definition
pub fn validate_field(
    name: &str,
    field: &Field,
    value: Option<&Value>,
) -> Result<(), ValidationError> {
    let value = match value {
        None | Some(Value::Null) if field.required => {
            return Err(ValidationError::new(name, "field is required"));
        }
        None | Some(Value::Null) => return Ok(()),
        Some(value) => value,
    };

    check_kind(&field.kind, value).map_err(|reason| ValidationError::new(name, reason))?;

    if let Some(validator) = &field.validator {
        validator(value).map_err(|reason| ValidationError::new(name, reason))?;
    }

    Ok(())
}

fn check_kind(kind: &FieldKind, value: &Value) -> Result<(), String> {
    match (kind, value) {
        (FieldKind::String(c), Value::String(s)) => check_string(c, s),
        (FieldKind::String(_), _) => Err("must be a string".to_string()),
        (FieldKind::Number(c), Value::Number(n)) => check_number(c, *n),
        (FieldKind::Number(_), _) => Err("must be a number".to_string()),
        (FieldKind::Boolean, Value::Bool(_)) => Ok(()),
        (FieldKind::Boolean, _) => Err("must be a boolean".to_string()),
        (FieldKind::Date, Value::Date(d)) => check_date(d),
        (FieldKind::Date, _) => Err("must be a valid Date".to_string()),
        (FieldKind::Array { .. }, Value::List(_)) => Ok(()),
        (FieldKind::Array { .. }, _) => Err("must be an array".to_string()),
        (FieldKind::Object { .. }, Value::Map(_)) => Ok(()),
        (FieldKind::Object { .. }, _) => Err("must be an object".to_string()),
        (FieldKind::Set { .. }, Value::Set(_)) => Ok(()),
        (FieldKind::Set { .. }, _) => Err("must be a Set".to_string()),
    }
}

fn check_string(c: &StringConstraints, s: &str) -> Result<(), String> {
    let len = s.chars().count();
    if let Some(min) = c.min_length {
        if len < min {
            return Err(format!("must be at least {} characters", min));
        }
    }
    if let Some(max) = c.max_length {
        if len > max {
            return Err(format!("must be at most {} characters", max));
        }
    }
    if let Some(pattern) = &c.pattern {
        if !pattern.is_match(s) {
            return Err(format!("must match pattern {}", pattern.as_str()));
        }
    }
    Ok(())
}

/// Four-digit years only; outside them RFC 3339 text needs a sign and stops
/// sorting chronologically.
const DATE_YEARS: std::ops::RangeInclusive<i32> = 0..=9999;

fn check_date(d: &DateTime<Utc>) -> Result<(), String> {
    if !DATE_YEARS.contains(&d.year()) {
        return Err("must be a valid Date".to_string());
    }
    Ok(())
}

fn check_number(c: &NumberConstraints, n: f64) -> Result<(), String> {
    if !n.is_finite() {
        return Err("must be a number".to_string());
    }
    if c.integer && n.fract() != 0.0 {
        return Err("must be an integer".to_string());
    }
    if let Some(min) = c.min {
        if n < min {
            return Err(format!("must be at least {}", min));
        }
    }
    if let Some(max) = c.max {
        if n > max {
            return Err(format!("must be at most {}", max));
        }
    }
    Ok(())
}
