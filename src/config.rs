//! Configuration for DocumentStore
//!
//! Describes the table being accessed and store behaviour, built with a
//! builder pattern.

use std::collections::HashMap;

use crate::types::IndexDefinition;

/// Attributes stamped automatically from the store's clock
#[derive(Debug, Clone, Default)]
pub struct AutoAttributes {
    /// Attribute set on create when absent (e.g. `createdAt`)
    pub created_at: Option<String>,
    /// Attribute set on create when absent and on every update (e.g. `updatedAt`)
    pub updated_at: Option<String>,
}

/// Table descriptor and store options
#[derive(Debug, Clone)]
pub struct TableConfig {
    /// Name of the remote table
    pub table_name: String,
    /// Partition key attribute name
    pub partition_key: String,
    /// Sort key attribute name, if the table has one
    pub sort_key: Option<String>,
    /// Secondary indexes by name
    pub indexes: HashMap<String, IndexDefinition>,
    /// Auto-stamped attributes
    pub auto_attributes: AutoAttributes,
    /// Fail creates that would replace an existing item
    pub prevent_overwrite: bool,
    /// Use strongly consistent reads by default
    pub consistent_reads: bool,
}

impl TableConfig {
    /// Create a new configuration builder
    pub fn builder(
        table_name: impl Into<String>,
        partition_key: impl Into<String>,
    ) -> TableConfigBuilder {
        TableConfigBuilder::new(table_name, partition_key)
    }

    /// Look up a secondary index by name
    pub fn index(&self, name: &str) -> Option<&IndexDefinition> {
        self.indexes.get(name)
    }

    /// Whether `field` is part of the table's primary key
    pub fn is_key_attribute(&self, field: &str) -> bool {
        self.partition_key == field || self.sort_key.as_deref() == Some(field)
    }
}

/// Builder for TableConfig
#[derive(Debug)]
pub struct TableConfigBuilder {
    table_name: String,
    partition_key: String,
    sort_key: Option<String>,
    indexes: HashMap<String, IndexDefinition>,
    auto_attributes: AutoAttributes,
    prevent_overwrite: bool,
    consistent_reads: bool,
}

impl TableConfigBuilder {
    /// Create a new builder with the table name and partition key
    pub fn new(table_name: impl Into<String>, partition_key: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            partition_key: partition_key.into(),
            sort_key: None,
            indexes: HashMap::new(),
            auto_attributes: AutoAttributes::default(),
            prevent_overwrite: false,
            consistent_reads: false,
        }
    }

    /// Set the sort key attribute name
    pub fn sort_key(mut self, name: impl Into<String>) -> Self {
        self.sort_key = Some(name.into());
        self
    }

    /// Register a global secondary index
    pub fn global_index(
        mut self,
        name: impl Into<String>,
        partition_key: impl Into<String>,
        sort_key: Option<&str>,
    ) -> Self {
        self.indexes.insert(
            name.into(),
            IndexDefinition::global(partition_key, sort_key.map(str::to_string)),
        );
        self
    }

    /// Register a local secondary index; it shares the table's partition key
    pub fn local_index(mut self, name: impl Into<String>, sort_key: impl Into<String>) -> Self {
        let index = IndexDefinition::local(self.partition_key.clone(), sort_key);
        self.indexes.insert(name.into(), index);
        self
    }

    /// Stamp `name` with the current instant on create (default: off)
    pub fn auto_created_at(mut self, name: impl Into<String>) -> Self {
        self.auto_attributes.created_at = Some(name.into());
        self
    }

    /// Stamp `name` with the current instant on create and update (default: off)
    pub fn auto_updated_at(mut self, name: impl Into<String>) -> Self {
        self.auto_attributes.updated_at = Some(name.into());
        self
    }

    /// Reject creates that would overwrite an existing item (default: false)
    pub fn prevent_overwrite(mut self, enabled: bool) -> Self {
        self.prevent_overwrite = enabled;
        self
    }

    /// Use strongly consistent reads by default (default: false)
    pub fn consistent_reads(mut self, enabled: bool) -> Self {
        self.consistent_reads = enabled;
        self
    }

    /// Build the configuration
    pub fn build(self) -> TableConfig {
        TableConfig {
            table_name: self.table_name,
            partition_key: self.partition_key,
            sort_key: self.sort_key,
            indexes: self.indexes,
            auto_attributes: self.auto_attributes,
            prevent_overwrite: self.prevent_overwrite,
            consistent_reads: self.consistent_reads,
        }
    }
}
