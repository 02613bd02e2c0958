//! Condition compilation
//!
//! Converts structured predicates into the store's expression language.
//! Attribute names are always referenced through `#field{i}` aliases and
//! values through `:value{i}` aliases, where `i` is the predicate's position.
//! Predicates are joined with ` AND `; there is no OR, NOT or grouping.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{DocumentStoreError, Result};
use crate::value::{Record, Value};

/// Comparison operator of a [`Predicate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    #[serde(alias = "=")]
    Eq,
    #[serde(alias = "<")]
    Lt,
    #[serde(alias = "<=")]
    Lte,
    #[serde(alias = ">")]
    Gt,
    #[serde(alias = ">=")]
    Gte,
    #[serde(alias = "beginsWith")]
    BeginsWith,
    Contains,
    Between,
    In,
}

impl Operator {
    /// Whether the operator may appear in a key condition
    pub fn is_key_operator(self) -> bool {
        !matches!(self, Operator::Contains | Operator::In)
    }
}

impl FromStr for Operator {
    type Err = DocumentStoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "eq" | "=" | "==" => Ok(Operator::Eq),
            "lt" | "<" => Ok(Operator::Lt),
            "lte" | "<=" => Ok(Operator::Lte),
            "gt" | ">" => Ok(Operator::Gt),
            "gte" | ">=" => Ok(Operator::Gte),
            "begins_with" | "beginsWith" => Ok(Operator::BeginsWith),
            "contains" => Ok(Operator::Contains),
            "between" => Ok(Operator::Between),
            "in" => Ok(Operator::In),
            other => Err(DocumentStoreError::invalid_condition(format!(
                "Unknown operator '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operator::Eq => "=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::BeginsWith => "begins_with",
            Operator::Contains => "contains",
            Operator::Between => "BETWEEN",
            Operator::In => "IN",
        };
        f.write_str(s)
    }
}

/// A single condition on one attribute
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
    /// Upper bound, only used by `between`
    pub upper: Option<Value>,
}

impl Predicate {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
            upper: None,
        }
    }

    /// Set the upper bound of a `between` predicate
    pub fn with_upper(mut self, upper: impl Into<Value>) -> Self {
        self.upper = Some(upper.into());
        self
    }
}

/// Range condition on a sort key, used by queries
#[derive(Debug, Clone, PartialEq)]
pub struct SortKeyCondition {
    pub operator: Operator,
    pub value: Value,
    pub upper: Option<Value>,
}

impl SortKeyCondition {
    pub fn new(operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            operator,
            value: value.into(),
            upper: None,
        }
    }

    pub fn between(lower: impl Into<Value>, upper: impl Into<Value>) -> Self {
        Self {
            operator: Operator::Between,
            value: lower.into(),
            upper: Some(upper.into()),
        }
    }

    /// Bind the condition to the sort key attribute
    pub fn into_predicate(self, sort_key: &str) -> Result<Predicate> {
        if !self.operator.is_key_operator() {
            return Err(DocumentStoreError::invalid_condition(format!(
                "Operator '{}' is not allowed in a key condition",
                self.operator
            )));
        }
        Ok(Predicate {
            field: sort_key.to_string(),
            operator: self.operator,
            value: self.value,
            upper: self.upper,
        })
    }
}

/// Helper functions to create predicates
pub mod predicate_helpers {
    use super::*;

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Predicate {
        Predicate::new(field, Operator::Eq, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Predicate {
        Predicate::new(field, Operator::Lt, value)
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Predicate {
        Predicate::new(field, Operator::Lte, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Predicate {
        Predicate::new(field, Operator::Gt, value)
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Predicate {
        Predicate::new(field, Operator::Gte, value)
    }

    pub fn begins_with(field: impl Into<String>, prefix: impl Into<Value>) -> Predicate {
        Predicate::new(field, Operator::BeginsWith, prefix)
    }

    pub fn contains(field: impl Into<String>, value: impl Into<Value>) -> Predicate {
        Predicate::new(field, Operator::Contains, value)
    }

    pub fn between(
        field: impl Into<String>,
        lower: impl Into<Value>,
        upper: impl Into<Value>,
    ) -> Predicate {
        Predicate::new(field, Operator::Between, lower).with_upper(upper)
    }

    /// Membership test; a non-list value is treated as a single-element list
    pub fn is_in(field: impl Into<String>, values: impl Into<Value>) -> Predicate {
        Predicate::new(field, Operator::In, values)
    }
}

/// Result of compiling a standalone predicate list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledExpression {
    pub expression: String,
    /// Name alias to attribute name
    pub names: HashMap<String, String>,
    /// Value alias to native (not yet wire-encoded) value
    pub values: HashMap<String, Value>,
}

/// Compile predicates into a single conjunction, allocating aliases from
/// position 0
pub fn compile(predicates: &[Predicate]) -> Result<CompiledExpression> {
    let mut attributes = ExpressionAttributes::new();
    let expression = attributes.condition(predicates)?;
    let (names, values) = attributes.into_parts();
    Ok(CompiledExpression {
        expression,
        names,
        values,
    })
}

/// Alias tables shared by every expression of one request.
///
/// Positions keep counting across calls, so a key condition, a filter, a
/// projection and an update built on the same instance never reuse an alias.
#[derive(Debug, Clone, Default)]
pub struct ExpressionAttributes {
    names: HashMap<String, String>,
    values: HashMap<String, Value>,
    next: usize,
}

impl ExpressionAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> &HashMap<String, String> {
        &self.names
    }

    pub fn values(&self) -> &HashMap<String, Value> {
        &self.values
    }

    pub fn into_parts(self) -> (HashMap<String, String>, HashMap<String, Value>) {
        (self.names, self.values)
    }

    /// Compile predicates joined with ` AND `. An empty list yields an empty
    /// expression.
    pub fn condition(&mut self, predicates: &[Predicate]) -> Result<String> {
        let fragments = predicates
            .iter()
            .map(|p| self.predicate(p))
            .collect::<Result<Vec<_>>>()?;
        Ok(fragments.join(" AND "))
    }

    /// Build `SET #a = :a, ...` for every entry of `changes`
    pub fn assignments(&mut self, changes: &Record) -> Result<String> {
        let mut clauses = Vec::with_capacity(changes.len());
        for (field, value) in changes {
            let i = self.position();
            let name = self.name(i, field)?;
            let alias = self.value(format!(":value{}", i), value.clone());
            clauses.push(format!("{} = {}", name, alias));
        }
        Ok(format!("SET {}", clauses.join(", ")))
    }

    /// Build a projection list with one name alias per field
    pub fn projection(&mut self, fields: &[String]) -> Result<String> {
        let aliases = fields
            .iter()
            .map(|field| {
                let i = self.position();
                self.name(i, field)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(aliases.join(", "))
    }

    /// Alias a single attribute name at the next position
    pub fn alias_name(&mut self, field: &str) -> Result<String> {
        let i = self.position();
        self.name(i, field)
    }

    fn predicate(&mut self, predicate: &Predicate) -> Result<String> {
        let i = self.position();
        let name = self.name(i, &predicate.field)?;
        let base = format!(":value{}", i);

        match predicate.operator {
            op @ (Operator::Eq | Operator::Lt | Operator::Lte | Operator::Gt | Operator::Gte) => {
                let value = self.value(base, predicate.value.clone());
                Ok(format!("{} {} {}", name, op, value))
            }
            op @ (Operator::BeginsWith | Operator::Contains) => {
                let value = self.value(base, predicate.value.clone());
                Ok(format!("{}({}, {})", op, name, value))
            }
            Operator::Between => {
                let upper = predicate.upper.clone().ok_or_else(|| {
                    DocumentStoreError::invalid_condition(format!(
                        "BETWEEN on '{}' requires an upper bound",
                        predicate.field
                    ))
                })?;
                let lower = self.value(base.clone(), predicate.value.clone());
                let upper = self.value(format!("{}_2", base), upper);
                Ok(format!("{} BETWEEN {} AND {}", name, lower, upper))
            }
            Operator::In => {
                let items = match &predicate.value {
                    Value::List(items) => items.clone(),
                    Value::Set(set) => set.to_values(),
                    single => vec![single.clone()],
                };
                if items.is_empty() {
                    return Err(DocumentStoreError::invalid_condition(format!(
                        "IN on '{}' requires at least one value",
                        predicate.field
                    )));
                }
                let aliases: Vec<String> = items
                    .into_iter()
                    .enumerate()
                    .map(|(k, item)| self.value(format!("{}_{}", base, k), item))
                    .collect();
                Ok(format!("{} IN ({})", name, aliases.join(", ")))
            }
        }
    }

    fn position(&mut self) -> usize {
        let i = self.next;
        self.next += 1;
        i
    }

    fn name(&mut self, position: usize, field: &str) -> Result<String> {
        if field.is_empty() {
            return Err(DocumentStoreError::invalid_condition(
                "Attribute name must not be empty",
            ));
        }
        let alias = format!("#field{}", position);
        self.names.insert(alias.clone(), field.to_string());
        Ok(alias)
    }

    fn value(&mut self, alias: String, value: Value) -> String {
        self.values.insert(alias.clone(), value);
        alias
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::predicate_helpers as p;
    use crate::value::SetValue;
    use proptest::prelude::*;
    use std::collections::HashSet;

    // ==================== Comparison Operations ====================

    #[test]
    fn test_gt_predicate() {
        let compiled = compile(&[p::gt("age", 18)]).unwrap();

        assert_eq!(compiled.expression, "#field0 > :value0");
        assert_eq!(compiled.names.get("#field0").map(String::as_str), Some("age"));
        assert_eq!(compiled.values.get(":value0"), Some(&Value::Number(18.0)));
        assert_eq!(compiled.names.len(), 1);
        assert_eq!(compiled.values.len(), 1);
    }

    #[test]
    fn test_comparison_symbols() {
        let compiled = compile(&[
            p::eq("a", 1),
            p::lt("b", 2),
            p::lte("c", 3),
            p::gte("d", 4),
        ])
        .unwrap();

        assert_eq!(
            compiled.expression,
            "#field0 = :value0 AND #field1 < :value1 AND #field2 <= :value2 AND #field3 >= :value3"
        );
    }

    #[test]
    fn test_function_operators() {
        let compiled =
            compile(&[p::begins_with("sku", "AB-"), p::contains("tags", "red")]).unwrap();

        assert_eq!(
            compiled.expression,
            "begins_with(#field0, :value0) AND contains(#field1, :value1)"
        );
    }

    #[test]
    fn test_reserved_words_are_aliased() {
        let compiled = compile(&[p::eq("name", "x"), p::eq("status", "y")]).unwrap();
        assert!(!compiled.expression.contains("name"));
        assert!(!compiled.expression.contains("status"));
    }

    // ==================== Between / In ====================

    #[test]
    fn test_between_allocates_two_values() {
        let compiled = compile(&[p::between("age", 18, 65)]).unwrap();

        assert_eq!(compiled.expression, "#field0 BETWEEN :value0 AND :value0_2");
        assert_eq!(compiled.values.len(), 2);
        assert_eq!(compiled.values.get(":value0_2"), Some(&Value::Number(65.0)));
    }

    #[test]
    fn test_between_without_upper_fails() {
        let err = compile(&[Predicate::new("age", Operator::Between, 18)]).unwrap_err();
        assert!(matches!(err, DocumentStoreError::InvalidCondition(_)));
    }

    #[test]
    fn test_in_allocates_one_value_per_element() {
        let values = Value::List(vec!["a".into(), "b".into(), "c".into()]);
        let compiled = compile(&[p::is_in("status", values)]).unwrap();

        assert_eq!(
            compiled.expression,
            "#field0 IN (:value0_0, :value0_1, :value0_2)"
        );
        assert_eq!(compiled.values.len(), 3);
    }

    #[test]
    fn test_in_wraps_single_value() {
        let compiled = compile(&[p::is_in("status", "active")]).unwrap();

        assert_eq!(compiled.expression, "#field0 IN (:value0_0)");
        assert_eq!(compiled.values.get(":value0_0"), Some(&Value::from("active")));
    }

    #[test]
    fn test_in_expands_set_elements() {
        let values = Value::Set(SetValue::strings(["open", "pending"]));
        let compiled = compile(&[p::is_in("status", values)]).unwrap();

        assert_eq!(compiled.expression, "#field0 IN (:value0_0, :value0_1)");
        assert_eq!(compiled.values.get(":value0_0"), Some(&Value::from("open")));
        assert_eq!(compiled.values.get(":value0_1"), Some(&Value::from("pending")));

        let numbers = Value::Set(SetValue::numbers([3, 1]));
        let compiled = compile(&[p::is_in("rank", numbers)]).unwrap();
        assert_eq!(compiled.values.get(":value0_0"), Some(&Value::Number(1.0)));
        assert_eq!(compiled.values.get(":value0_1"), Some(&Value::Number(3.0)));
    }

    #[test]
    fn test_in_with_empty_list_fails() {
        assert!(compile(&[p::is_in("status", Value::List(vec![]))]).is_err());
    }

    // ==================== Edge Cases ====================

    #[test]
    fn test_empty_predicate_list() {
        let compiled = compile(&[]).unwrap();
        assert_eq!(compiled.expression, "");
        assert!(compiled.names.is_empty());
    }

    #[test]
    fn test_empty_field_name_fails() {
        assert!(compile(&[p::eq("", 1)]).is_err());
    }

    #[test]
    fn test_operator_parsing() {
        assert_eq!(">".parse::<Operator>().unwrap(), Operator::Gt);
        assert_eq!("begins_with".parse::<Operator>().unwrap(), Operator::BeginsWith);
        assert_eq!("<=".parse::<Operator>().unwrap(), Operator::Lte);
        assert!("!=".parse::<Operator>().is_err());
    }

    #[test]
    fn test_operator_deserializes_from_symbol() {
        let op: Operator = serde_json::from_str("\">\"").unwrap();
        assert_eq!(op, Operator::Gt);
        let op: Operator = serde_json::from_str("\"between\"").unwrap();
        assert_eq!(op, Operator::Between);
    }

    #[test]
    fn test_sort_key_condition_rejects_contains() {
        let err = SortKeyCondition::new(Operator::Contains, "x")
            .into_predicate("sk")
            .unwrap_err();
        assert!(matches!(err, DocumentStoreError::InvalidCondition(_)));

        let predicate = SortKeyCondition::between(1, 5).into_predicate("sk").unwrap();
        assert_eq!(predicate.field, "sk");
        assert_eq!(predicate.upper, Some(Value::Number(5.0)));
    }

    // ==================== Shared Attributes ====================

    #[test]
    fn test_positions_continue_across_calls() {
        let mut attrs = ExpressionAttributes::new();
        let key = attrs.condition(&[p::eq("id", "1")]).unwrap();
        let filter = attrs.condition(&[p::gt("age", 18)]).unwrap();
        let projection = attrs.projection(&["name".to_string()]).unwrap();

        assert_eq!(key, "#field0 = :value0");
        assert_eq!(filter, "#field1 > :value1");
        assert_eq!(projection, "#field2");
        assert_eq!(attrs.names().len(), 3);
        assert_eq!(attrs.values().len(), 2);
    }

    #[test]
    fn test_assignments() {
        let mut changes = Record::new();
        changes.insert("name".to_string(), Value::from("Adam"));
        let mut attrs = ExpressionAttributes::new();

        assert_eq!(attrs.assignments(&changes).unwrap(), "SET #field0 = :value0");
        assert_eq!(attrs.names().get("#field0").map(String::as_str), Some("name"));
        assert_eq!(attrs.values().get(":value0"), Some(&Value::from("Adam")));
    }

    // ==================== Alias Injectivity ====================

    fn arb_predicate() -> impl Strategy<Value = Predicate> {
        (
            "[a-z]{1,6}",
            prop_oneof![
                Just(Operator::Eq),
                Just(Operator::Lt),
                Just(Operator::Gte),
                Just(Operator::BeginsWith),
                Just(Operator::Contains),
                Just(Operator::Between),
                Just(Operator::In),
            ],
            prop::collection::vec(any::<i32>(), 1..5),
        )
            .prop_map(|(field, operator, values)| match operator {
                Operator::Between => p::between(field, values[0], values[0].saturating_add(1)),
                Operator::In => p::is_in(
                    field,
                    Value::List(values.into_iter().map(Value::from).collect()),
                ),
                op => Predicate::new(field, op, values[0]),
            })
    }

    fn expected_value_count(predicate: &Predicate) -> usize {
        match (&predicate.operator, &predicate.value) {
            (Operator::Between, _) => 2,
            (Operator::In, Value::List(items)) => items.len(),
            _ => 1,
        }
    }

    proptest! {
        #[test]
        fn prop_aliases_never_collide(predicates in prop::collection::vec(arb_predicate(), 0..60)) {
            let compiled = compile(&predicates).unwrap();

            prop_assert_eq!(compiled.names.len(), predicates.len());
            let expected: usize = predicates.iter().map(expected_value_count).sum();
            prop_assert_eq!(compiled.values.len(), expected);

            for (i, predicate) in predicates.iter().enumerate() {
                let alias = format!("#field{}", i);
                prop_assert_eq!(compiled.names.get(&alias), Some(&predicate.field));
            }

            let aliases: HashSet<&String> = compiled.values.keys().collect();
            prop_assert_eq!(aliases.len(), expected);
        }
    }
}
