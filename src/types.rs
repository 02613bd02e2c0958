//! Core type definitions for Document Store
//!
//! Includes field kinds, field definitions, default values and index definitions.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::schema::Schema;
use crate::value::Value;

// ============================================================================
// Field Kinds
// ============================================================================

/// Constraints for string fields
#[derive(Debug, Clone, Default)]
pub struct StringConstraints {
    /// Minimum length in characters
    pub min_length: Option<usize>,
    /// Maximum length in characters
    pub max_length: Option<usize>,
    /// Pattern the value must match
    pub pattern: Option<Regex>,
}

/// Constraints for number fields
#[derive(Debug, Clone, Copy, Default)]
pub struct NumberConstraints {
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Reject values with a fractional part
    pub integer: bool,
}

/// Element kind of a uniqueness set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetItemKind {
    String,
    Number,
}

/// Kind of a field, carrying the constraints meaningful for that kind
#[derive(Debug, Clone)]
pub enum FieldKind {
    String(StringConstraints),
    Number(NumberConstraints),
    Boolean,
    Date,
    /// Ordered sequence, optionally describing its items
    Array { item: Option<Box<Field>> },
    /// Nested record, optionally describing its properties
    Object { properties: Option<Schema> },
    /// Uniqueness set of strings or numbers
    Set { item: SetItemKind },
}

impl FieldKind {
    /// Name used in diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::String(_) => "string",
            FieldKind::Number(_) => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::Date => "date",
            FieldKind::Array { .. } => "array",
            FieldKind::Object { .. } => "object",
            FieldKind::Set { .. } => "set",
        }
    }
}

// ============================================================================
// Defaults and Custom Validators
// ============================================================================

/// Value applied when a field is absent from an incoming record
#[derive(Clone)]
pub enum DefaultValue {
    /// A fixed value
    Literal(Value),
    /// A zero-argument generator, invoked once per missing field
    Generate(Arc<dyn Fn() -> Value + Send + Sync>),
    /// The current instant from the store's clock
    Now,
    /// A fresh random UUID string
    Uuid,
}

impl DefaultValue {
    /// Produce the default value for one missing field occurrence
    pub fn resolve(&self, clock: &dyn Clock) -> Value {
        match self {
            DefaultValue::Literal(v) => v.clone(),
            DefaultValue::Generate(f) => f(),
            DefaultValue::Now => Value::Date(clock.now()),
            DefaultValue::Uuid => Value::String(uuid::Uuid::new_v4().to_string()),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Literal(v) => f.debug_tuple("Literal").field(v).finish(),
            DefaultValue::Generate(_) => f.write_str("Generate(..)"),
            DefaultValue::Now => f.write_str("Now"),
            DefaultValue::Uuid => f.write_str("Uuid"),
        }
    }
}

/// Custom check run after structural validation. `Err` carries the reason.
pub type CustomValidator = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

// ============================================================================
// Field Definition
// ============================================================================

/// Definition of one record attribute
#[derive(Clone)]
pub struct Field {
    pub kind: FieldKind,
    /// Absent or null values fail validation when set
    pub required: bool,
    pub default: Option<DefaultValue>,
    pub validator: Option<CustomValidator>,
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("kind", &self.kind)
            .field("required", &self.required)
            .field("default", &self.default)
            .field("validator", &self.validator.as_ref().map(|_| ".."))
            .finish()
    }
}

impl Field {
    /// Create a field of the given kind
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            required: false,
            default: None,
            validator: None,
        }
    }

    pub fn string() -> Self {
        Self::new(FieldKind::String(StringConstraints::default()))
    }

    pub fn number() -> Self {
        Self::new(FieldKind::Number(NumberConstraints::default()))
    }

    pub fn boolean() -> Self {
        Self::new(FieldKind::Boolean)
    }

    pub fn date() -> Self {
        Self::new(FieldKind::Date)
    }

    /// Array without an item description
    pub fn array() -> Self {
        Self::new(FieldKind::Array { item: None })
    }

    pub fn array_of(item: Field) -> Self {
        Self::new(FieldKind::Array {
            item: Some(Box::new(item)),
        })
    }

    /// Object without a property description
    pub fn object() -> Self {
        Self::new(FieldKind::Object { properties: None })
    }

    pub fn object_with(properties: Schema) -> Self {
        Self::new(FieldKind::Object {
            properties: Some(properties),
        })
    }

    pub fn set(item: SetItemKind) -> Self {
        Self::new(FieldKind::Set { item })
    }

    /// Mark the field as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Use a fixed default value
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Literal(value.into()));
        self
    }

    /// Use a generator for the default value
    pub fn default_with<F>(mut self, generator: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = Some(DefaultValue::Generate(Arc::new(generator)));
        self
    }

    /// Default to the current instant
    pub fn default_now(mut self) -> Self {
        self.default = Some(DefaultValue::Now);
        self
    }

    /// Default to a fresh UUID string
    pub fn default_uuid(mut self) -> Self {
        self.default = Some(DefaultValue::Uuid);
        self
    }

    /// Attach a custom validator returning the failure reason on error
    pub fn validate<F>(mut self, validator: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Attach a boolean predicate; `false` fails with a generic reason
    pub fn check<F>(self, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.validate(move |value| {
            if predicate(value) {
                Ok(())
            } else {
                Err("failed custom validation".to_string())
            }
        })
    }

    // Kind-specific constraints are ignored when the kind does not match.

    pub fn min_length(mut self, min: usize) -> Self {
        if let FieldKind::String(c) = &mut self.kind {
            c.min_length = Some(min);
        }
        self
    }

    pub fn max_length(mut self, max: usize) -> Self {
        if let FieldKind::String(c) = &mut self.kind {
            c.max_length = Some(max);
        }
        self
    }

    pub fn pattern(mut self, pattern: Regex) -> Self {
        if let FieldKind::String(c) = &mut self.kind {
            c.pattern = Some(pattern);
        }
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        if let FieldKind::Number(c) = &mut self.kind {
            c.min = Some(min);
        }
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        if let FieldKind::Number(c) = &mut self.kind {
            c.max = Some(max);
        }
        self
    }

    pub fn integer(mut self) -> Self {
        if let FieldKind::Number(c) = &mut self.kind {
            c.integer = true;
        }
        self
    }
}

// ============================================================================
// Index Definitions
// ============================================================================

/// Category of a secondary index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    /// Independently partitioned
    Global,
    /// Shares the table's partition key
    Local,
}

/// Secondary index definition. Indexes are referenced by name only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    #[serde(rename = "partitionKey")]
    pub partition_key: String,
    #[serde(rename = "sortKey", skip_serializing_if = "Option::is_none")]
    pub sort_key: Option<String>,
    pub kind: IndexKind,
}

impl IndexDefinition {
    pub fn global(partition_key: impl Into<String>, sort_key: Option<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key,
            kind: IndexKind::Global,
        }
    }

    pub fn local(partition_key: impl Into<String>, sort_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: Some(sort_key.into()),
            kind: IndexKind::Local,
        }
    }
}
