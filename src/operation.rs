//! Operation inputs and outputs for Document Store
//!
//! Includes item keys, query and scan requests, result pages, continuation
//! tokens and batch write operations.

use serde::{Deserialize, Serialize};

use crate::config::TableConfig;
use crate::error::{DocumentStoreError, Result};
use crate::expr::{Predicate, SortKeyCondition};
use crate::schema::Schema;
use crate::value::{Record, Value};
use crate::wire::{Item, from_wire_field, to_wire};

// ============================================================================
// Keys
// ============================================================================

/// Primary key of an item
#[derive(Debug, Clone, PartialEq)]
pub struct Key {
    pub partition: Value,
    pub sort: Option<Value>,
}

impl Key {
    pub fn new(partition: impl Into<Value>) -> Self {
        Self {
            partition: partition.into(),
            sort: None,
        }
    }

    pub fn with_sort(mut self, sort: impl Into<Value>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    /// Extract the key attributes of `record`
    pub fn from_record(record: &Record, config: &TableConfig) -> Result<Self> {
        let partition = record
            .get(&config.partition_key)
            .filter(|v| !v.is_null())
            .cloned()
            .ok_or_else(|| {
                DocumentStoreError::invalid_request(format!(
                    "Missing partition key '{}'",
                    config.partition_key
                ))
            })?;

        let sort = match &config.sort_key {
            Some(name) => Some(
                record
                    .get(name)
                    .filter(|v| !v.is_null())
                    .cloned()
                    .ok_or_else(|| {
                        DocumentStoreError::invalid_request(format!("Missing sort key '{}'", name))
                    })?,
            ),
            None => None,
        };

        Ok(Self { partition, sort })
    }

    /// Wire form of the key for the table
    pub fn to_item(&self, config: &TableConfig) -> Result<Item> {
        let mut item = Item::new();
        item.insert(config.partition_key.clone(), to_wire(&self.partition));

        match (&config.sort_key, &self.sort) {
            (Some(name), Some(sort)) => {
                item.insert(name.clone(), to_wire(sort));
            }
            (Some(name), None) => {
                return Err(DocumentStoreError::invalid_request(format!(
                    "Table '{}' requires sort key '{}'",
                    config.table_name, name
                )));
            }
            (None, Some(_)) => {
                return Err(DocumentStoreError::invalid_request(format!(
                    "Table '{}' has no sort key",
                    config.table_name
                )));
            }
            (None, None) => {}
        }

        Ok(item)
    }

    /// Read a key back from its wire form
    pub fn from_item(item: &Item, config: &TableConfig, schema: &Schema) -> Result<Self> {
        let attribute = |name: &str| -> Result<Value> {
            let attr = item.get(name).ok_or_else(|| {
                DocumentStoreError::unexpected_response(format!("Key attribute '{}' missing", name))
            })?;
            from_wire_field(attr, schema.get(name))
        };

        Ok(Self {
            partition: attribute(config.partition_key.as_str())?,
            sort: config.sort_key.as_deref().map(attribute).transpose()?,
        })
    }
}

// ============================================================================
// Pagination
// ============================================================================

/// Opaque marker for resuming a query or scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContinuationToken(pub Item);

impl ContinuationToken {
    /// Encode as text, e.g. for handing to an API client
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(token: &str) -> Result<Self> {
        Ok(serde_json::from_str(token)?)
    }
}

/// One page of query or scan results
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<Record>,
    /// Items returned after filtering
    pub count: usize,
    /// Items read before filtering
    pub scanned_count: usize,
    /// Present when more results may follow
    pub continuation: Option<ContinuationToken>,
}

// ============================================================================
// Query and Scan
// ============================================================================

/// Query over a single partition
#[derive(Debug, Clone)]
pub struct Query {
    pub partition_value: Value,
    pub sort_condition: Option<SortKeyCondition>,
    /// Applied after key matching
    pub filters: Vec<Predicate>,
    pub projection: Option<Vec<String>>,
    pub index_name: Option<String>,
    /// `Some(false)` reads in descending sort key order
    pub scan_forward: Option<bool>,
    pub limit: Option<u32>,
    pub start: Option<ContinuationToken>,
    pub consistent_read: Option<bool>,
}

impl Query {
    /// Query the partition with the given key value
    pub fn new(partition_value: impl Into<Value>) -> Self {
        Self {
            partition_value: partition_value.into(),
            sort_condition: None,
            filters: Vec::new(),
            projection: None,
            index_name: None,
            scan_forward: None,
            limit: None,
            start: None,
            consistent_read: None,
        }
    }

    /// Restrict the sort key range
    pub fn sort_key(mut self, condition: SortKeyCondition) -> Self {
        self.sort_condition = Some(condition);
        self
    }

    /// Add a filter predicate
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filters.push(predicate);
        self
    }

    pub fn filters(mut self, predicates: Vec<Predicate>) -> Self {
        self.filters.extend(predicates);
        self
    }

    /// Return only the given attributes
    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Query a secondary index instead of the table
    pub fn index(mut self, name: impl Into<String>) -> Self {
        self.index_name = Some(name.into());
        self
    }

    pub fn descending(mut self) -> Self {
        self.scan_forward = Some(false);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Resume after a previous page
    pub fn start_from(mut self, token: ContinuationToken) -> Self {
        self.start = Some(token);
        self
    }

    pub fn consistent_read(mut self, enabled: bool) -> Self {
        self.consistent_read = Some(enabled);
        self
    }
}

/// Full table or index scan
#[derive(Debug, Clone, Default)]
pub struct Scan {
    pub filters: Vec<Predicate>,
    pub projection: Option<Vec<String>>,
    pub index_name: Option<String>,
    pub limit: Option<u32>,
    pub start: Option<ContinuationToken>,
    pub consistent_read: Option<bool>,
    /// `(segment, total_segments)` for parallel scans
    pub segment: Option<(u32, u32)>,
}

impl Scan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filters.push(predicate);
        self
    }

    pub fn filters(mut self, predicates: Vec<Predicate>) -> Self {
        self.filters.extend(predicates);
        self
    }

    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn index(mut self, name: impl Into<String>) -> Self {
        self.index_name = Some(name.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn start_from(mut self, token: ContinuationToken) -> Self {
        self.start = Some(token);
        self
    }

    pub fn consistent_read(mut self, enabled: bool) -> Self {
        self.consistent_read = Some(enabled);
        self
    }

    /// Scan one segment of a parallel scan
    pub fn segment(mut self, segment: u32, total_segments: u32) -> Self {
        self.segment = Some((segment, total_segments));
        self
    }
}

// ============================================================================
// Batch Operations
// ============================================================================

/// One entry of a batch write
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOperation {
    Put(Record),
    Delete(Key),
}

impl WriteOperation {
    pub fn tag(&self) -> &'static str {
        match self {
            WriteOperation::Put(_) => "put",
            WriteOperation::Delete(_) => "delete",
        }
    }
}

/// Result of a batch get
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchGetOutcome {
    pub items: Vec<Record>,
    /// Keys the store did not process; resubmit them to retry
    pub unprocessed_keys: Vec<Key>,
}

/// Result of a batch write
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchWriteOutcome {
    /// Operations the store did not process; resubmit them to retry
    pub unprocessed: Vec<WriteOperation>,
}
