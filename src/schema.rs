//! Schema declaration
//!
//! A [`Schema`] maps field names to [`Field`] definitions. Declaration order is
//! preserved and is the order fields are validated in.

use crate::clock::Clock;
use crate::types::Field;
use crate::value::Record;

/// Record shape shared read-only by the validator, transcoder and store
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<(String, Field)>,
}

impl Schema {
    /// Create a schema from `(name, field)` pairs
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, Field)>,
        S: Into<String>,
    {
        fields
            .into_iter()
            .fold(Self::default(), |schema, (name, field)| {
                schema.field(name, field)
            })
    }

    /// Add a field; redeclaring a name replaces the earlier definition in place
    pub fn field(mut self, name: impl Into<String>, field: Field) -> Self {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = field,
            None => self.fields.push((name, field)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, field)| field)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Fields in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(n, f)| (n.as_str(), f))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fill in defaults for fields absent from `record`.
    ///
    /// Present fields, including explicit nulls, are left untouched. Each
    /// generator runs once per missing field.
    pub fn apply_defaults(&self, record: &mut Record, clock: &dyn Clock) {
        for (name, field) in &self.fields {
            if record.contains_key(name) {
                continue;
            }
            if let Some(default) = &field.default {
                record.insert(name.clone(), default.resolve(clock));
            }
        }
    }
}
