//! Expression building for the store's condition, filter, projection and
//! update expressions.

pub mod condition;

pub use condition::{
    CompiledExpression, ExpressionAttributes, Operator, Predicate, SortKeyCondition, compile,
    predicate_helpers,
};
