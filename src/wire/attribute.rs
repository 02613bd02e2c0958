//! Tagged attribute values as understood by the store

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// An item in wire form: attribute name to tagged value
pub type Item = HashMap<String, AttributeValue>;

/// A single tagged attribute value.
///
/// Serializes in the store's JSON shape, e.g. `{"S": "abc"}` or `{"N": "42"}`.
/// Numbers travel as decimal text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    #[serde(rename = "S")]
    S(String),
    #[serde(rename = "N")]
    N(String),
    #[serde(rename = "BOOL")]
    Bool(bool),
    #[serde(rename = "NULL")]
    Null(bool),
    #[serde(rename = "L")]
    L(Vec<AttributeValue>),
    #[serde(rename = "M")]
    M(HashMap<String, AttributeValue>),
    /// String set; only ever read, never written by this crate
    #[serde(rename = "SS")]
    Ss(Vec<String>),
    /// Number set; only ever read, never written by this crate
    #[serde(rename = "NS")]
    Ns(Vec<String>),
}

impl AttributeValue {
    /// The store's type tag
    pub fn tag(&self) -> &'static str {
        match self {
            AttributeValue::S(_) => "S",
            AttributeValue::N(_) => "N",
            AttributeValue::Bool(_) => "BOOL",
            AttributeValue::Null(_) => "NULL",
            AttributeValue::L(_) => "L",
            AttributeValue::M(_) => "M",
            AttributeValue::Ss(_) => "SS",
            AttributeValue::Ns(_) => "NS",
        }
    }

    pub fn as_s(&self) -> Option<&str> {
        match self {
            AttributeValue::S(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_n(&self) -> Option<&str> {
        match self {
            AttributeValue::N(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_l(&self) -> Option<&[AttributeValue]> {
        match self {
            AttributeValue::L(items) => Some(items),
            _ => None,
        }
    }
}
