//! DocumentStore - Main entry point for schema-driven document access
//!
//! Composes defaults, validation, transcoding and expression building around
//! the store operations. Every operation makes exactly one round trip through
//! the [`Transport`]; nothing is retried, cached or paginated internally.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::TableConfig;
use crate::error::{DocumentStoreError, Result};
use crate::expr::{ExpressionAttributes, Operator, Predicate};
use crate::operation::{
    BatchGetOutcome, BatchWriteOutcome, ContinuationToken, Key, Page, Query, Scan,
    WriteOperation,
};
use crate::request::{
    BatchGetItemRequest, BatchWriteItemRequest, DeleteItemRequest, DeleteRequest,
    GetItemRequest, KeysAndAttributes, PageOutput, PutItemRequest, PutRequest, QueryRequest,
    Request, Response, ReturnValues, ScanRequest, UpdateItemRequest, WriteRequest,
};
use crate::schema::Schema;
use crate::transport::Transport;
use crate::validate::{validate, validate_partial};
use crate::value::{Record, Value};
use crate::wire::{item_to_record, record_to_item, to_wire_map};

/// Largest batch write the store accepts in one request
pub const MAX_BATCH_WRITE_ITEMS: usize = 25;

/// Largest batch get the store accepts in one request
pub const MAX_BATCH_GET_KEYS: usize = 100;

/// Schema-driven access layer over a single table
///
/// The schema and table configuration are fixed at construction and shared
/// read-only by all calls; concurrent calls are independent.
pub struct DocumentStore<T> {
    transport: T,
    config: TableConfig,
    schema: Schema,
    clock: Arc<dyn Clock>,
}

impl<T: Transport> DocumentStore<T> {
    /// Create a store using the system clock
    pub fn new(transport: T, config: TableConfig, schema: Schema) -> Self {
        Self {
            transport,
            config,
            schema,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used for time-based defaults and auto attributes
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // =========================================================================
    // Single-item Operations
    // =========================================================================

    /// Create (or replace) an item
    ///
    /// Defaults are applied and the record validated before anything is sent.
    /// Returns the record as written.
    pub async fn create(&self, record: Record) -> Result<Record> {
        let record = self.prepare_put(record)?;

        let (condition_expression, expression_attribute_names) = if self.config.prevent_overwrite
        {
            let mut attrs = ExpressionAttributes::new();
            let alias = attrs.alias_name(&self.config.partition_key)?;
            let (names, _) = attrs.into_parts();
            (Some(format!("attribute_not_exists({})", alias)), Some(names))
        } else {
            (None, None)
        };

        let request = Request::PutItem(PutItemRequest {
            table_name: self.config.table_name.clone(),
            item: record_to_item(&record),
            condition_expression,
            expression_attribute_names,
        });

        match self.send(request).await? {
            Response::PutItem(_) => Ok(record),
            other => Err(unexpected("PutItem", &other)),
        }
    }

    /// Fetch an item by key; `None` when it does not exist
    pub async fn get(&self, key: &Key) -> Result<Option<Record>> {
        let request = Request::GetItem(GetItemRequest {
            table_name: self.config.table_name.clone(),
            key: key.to_item(&self.config)?,
            consistent_read: self.config.consistent_reads.then_some(true),
        });

        match self.send(request).await? {
            Response::GetItem(output) => output
                .item
                .map(|item| item_to_record(&item, &self.schema))
                .transpose(),
            other => Err(unexpected("GetItem", &other)),
        }
    }

    /// Set the given fields on an item and return its updated image
    ///
    /// Only the supplied fields are validated; key attributes cannot change.
    pub async fn update(&self, key: &Key, mut changes: Record) -> Result<Record> {
        if changes.is_empty() {
            return Err(DocumentStoreError::invalid_request(
                "Update requires at least one field",
            ));
        }
        if let Some(field) = changes.keys().find(|f| self.config.is_key_attribute(f)) {
            return Err(DocumentStoreError::invalid_request(format!(
                "Key attribute '{}' cannot be updated",
                field
            )));
        }

        if let Some(name) = &self.config.auto_attributes.updated_at {
            changes
                .entry(name.clone())
                .or_insert_with(|| Value::Date(self.clock.now()));
        }

        validate_partial(&changes, &self.schema)?;

        let mut attrs = ExpressionAttributes::new();
        let update_expression = attrs.assignments(&changes)?;
        let (names, values) = attrs.into_parts();

        let request = Request::UpdateItem(UpdateItemRequest {
            table_name: self.config.table_name.clone(),
            key: key.to_item(&self.config)?,
            update_expression,
            expression_attribute_names: names,
            expression_attribute_values: to_wire_map(&values),
            return_values: ReturnValues::AllNew,
        });

        match self.send(request).await? {
            Response::UpdateItem(output) => {
                let item = output.attributes.ok_or_else(|| {
                    DocumentStoreError::unexpected_response("Update returned no item image")
                })?;
                item_to_record(&item, &self.schema)
            }
            other => Err(unexpected("UpdateItem", &other)),
        }
    }

    /// Delete an item; deleting a missing item is not an error
    pub async fn delete(&self, key: &Key) -> Result<()> {
        let request = Request::DeleteItem(DeleteItemRequest {
            table_name: self.config.table_name.clone(),
            key: key.to_item(&self.config)?,
        });

        match self.send(request).await? {
            Response::DeleteItem(_) => Ok(()),
            other => Err(unexpected("DeleteItem", &other)),
        }
    }

    // =========================================================================
    // Query and Scan
    // =========================================================================

    /// Read one page of a single partition
    pub async fn query(&self, query: Query) -> Result<Page> {
        let (partition_key, sort_key) = self.key_names(query.index_name.as_deref())?;

        let mut key_predicates = vec![Predicate::new(
            partition_key,
            Operator::Eq,
            query.partition_value,
        )];
        if let Some(condition) = query.sort_condition {
            let sort_key = sort_key.ok_or_else(|| {
                DocumentStoreError::invalid_request(
                    "Sort key condition given but the queried key has no sort key",
                )
            })?;
            key_predicates.push(condition.into_predicate(&sort_key)?);
        }

        let mut attrs = ExpressionAttributes::new();
        let key_condition_expression = attrs.condition(&key_predicates)?;
        let filter_expression = non_empty(attrs.condition(&query.filters)?);
        let projection_expression = self.projection(&mut attrs, query.projection.as_deref())?;
        let (names, values) = attrs.into_parts();

        let request = Request::Query(QueryRequest {
            table_name: self.config.table_name.clone(),
            index_name: query.index_name,
            key_condition_expression,
            filter_expression,
            projection_expression,
            expression_attribute_names: names,
            expression_attribute_values: to_wire_map(&values),
            scan_index_forward: query.scan_forward,
            limit: query.limit,
            exclusive_start_key: query.start.map(|t| t.0),
            consistent_read: query
                .consistent_read
                .or(self.config.consistent_reads.then_some(true)),
        });

        match self.send(request).await? {
            Response::Query(output) => self.to_page(output),
            other => Err(unexpected("Query", &other)),
        }
    }

    /// Read one page of a whole table or index
    pub async fn scan(&self, scan: Scan) -> Result<Page> {
        if let Some(name) = scan.index_name.as_deref() {
            self.key_names(Some(name))?;
        }
        if let Some((segment, total)) = scan.segment {
            if total == 0 || segment >= total {
                return Err(DocumentStoreError::invalid_request(format!(
                    "Segment {} out of range for {} total segments",
                    segment, total
                )));
            }
        }

        let mut attrs = ExpressionAttributes::new();
        let filter_expression = non_empty(attrs.condition(&scan.filters)?);
        let projection_expression = self.projection(&mut attrs, scan.projection.as_deref())?;
        let (names, values) = attrs.into_parts();

        let request = Request::Scan(ScanRequest {
            table_name: self.config.table_name.clone(),
            index_name: scan.index_name,
            filter_expression,
            projection_expression,
            expression_attribute_names: (!names.is_empty()).then_some(names),
            expression_attribute_values: (!values.is_empty()).then(|| to_wire_map(&values)),
            limit: scan.limit,
            exclusive_start_key: scan.start.map(|t| t.0),
            consistent_read: scan
                .consistent_read
                .or(self.config.consistent_reads.then_some(true)),
            segment: scan.segment.map(|(segment, _)| segment),
            total_segments: scan.segment.map(|(_, total)| total),
        });

        match self.send(request).await? {
            Response::Scan(output) => self.to_page(output),
            other => Err(unexpected("Scan", &other)),
        }
    }

    // =========================================================================
    // Batch Operations
    // =========================================================================

    /// Fetch several items in one request
    ///
    /// Requests are not split to the store's per-request limits; keys the
    /// store did not process are returned for the caller to resubmit.
    pub async fn batch_get(&self, keys: &[Key]) -> Result<BatchGetOutcome> {
        if keys.is_empty() {
            return Ok(BatchGetOutcome::default());
        }
        if keys.len() > MAX_BATCH_GET_KEYS {
            warn!(
                table = %self.config.table_name,
                keys = keys.len(),
                limit = MAX_BATCH_GET_KEYS,
                "batch get exceeds the per-request key limit"
            );
        }

        let wire_keys = keys
            .iter()
            .map(|key| key.to_item(&self.config))
            .collect::<Result<Vec<_>>>()?;

        let mut request_items = HashMap::new();
        request_items.insert(
            self.config.table_name.clone(),
            KeysAndAttributes {
                keys: wire_keys,
                consistent_read: self.config.consistent_reads.then_some(true),
            },
        );

        let mut output = match self
            .send(Request::BatchGetItem(BatchGetItemRequest { request_items }))
            .await?
        {
            Response::BatchGetItem(output) => output,
            other => return Err(unexpected("BatchGetItem", &other)),
        };

        let items = output
            .responses
            .remove(&self.config.table_name)
            .unwrap_or_default()
            .iter()
            .map(|item| item_to_record(item, &self.schema))
            .collect::<Result<Vec<_>>>()?;

        let unprocessed_keys = output
            .unprocessed_keys
            .remove(&self.config.table_name)
            .map(|pending| pending.keys)
            .unwrap_or_default()
            .iter()
            .map(|item| Key::from_item(item, &self.config, &self.schema))
            .collect::<Result<Vec<_>>>()?;

        if !unprocessed_keys.is_empty() {
            warn!(
                table = %self.config.table_name,
                unprocessed = unprocessed_keys.len(),
                "batch get left keys unprocessed"
            );
        }

        Ok(BatchGetOutcome {
            items,
            unprocessed_keys,
        })
    }

    /// Apply several puts and deletes in one request
    ///
    /// Every put is defaulted and validated before the request is built, so a
    /// single bad entry fails the whole batch without sending anything.
    pub async fn batch_write(&self, operations: Vec<WriteOperation>) -> Result<BatchWriteOutcome> {
        if operations.is_empty() {
            return Ok(BatchWriteOutcome::default());
        }
        if operations.len() > MAX_BATCH_WRITE_ITEMS {
            warn!(
                table = %self.config.table_name,
                operations = operations.len(),
                limit = MAX_BATCH_WRITE_ITEMS,
                "batch write exceeds the per-request item limit"
            );
        }

        let writes = operations
            .into_iter()
            .map(|operation| match operation {
                WriteOperation::Put(record) => {
                    let record = self.prepare_put(record)?;
                    Ok(WriteRequest::PutRequest(PutRequest {
                        item: record_to_item(&record),
                    }))
                }
                WriteOperation::Delete(key) => Ok(WriteRequest::DeleteRequest(DeleteRequest {
                    key: key.to_item(&self.config)?,
                })),
            })
            .collect::<Result<Vec<_>>>()?;

        let mut request_items = HashMap::new();
        request_items.insert(self.config.table_name.clone(), writes);

        let mut output = match self
            .send(Request::BatchWriteItem(BatchWriteItemRequest { request_items }))
            .await?
        {
            Response::BatchWriteItem(output) => output,
            other => return Err(unexpected("BatchWriteItem", &other)),
        };

        let unprocessed = output
            .unprocessed_items
            .remove(&self.config.table_name)
            .unwrap_or_default()
            .into_iter()
            .map(|write| match write {
                WriteRequest::PutRequest(put) => {
                    Ok(WriteOperation::Put(item_to_record(&put.item, &self.schema)?))
                }
                WriteRequest::DeleteRequest(delete) => Ok(WriteOperation::Delete(
                    Key::from_item(&delete.key, &self.config, &self.schema)?,
                )),
            })
            .collect::<Result<Vec<_>>>()?;

        if !unprocessed.is_empty() {
            warn!(
                table = %self.config.table_name,
                unprocessed = unprocessed.len(),
                "batch write left operations unprocessed"
            );
        }

        Ok(BatchWriteOutcome { unprocessed })
    }

    /// Build a batch operation from a dynamic tag (`put` or `delete`).
    ///
    /// For deletes the payload only needs the key attributes.
    pub fn write_operation(&self, tag: &str, payload: Record) -> Result<WriteOperation> {
        match tag {
            "put" => Ok(WriteOperation::Put(payload)),
            "delete" => Ok(WriteOperation::Delete(Key::from_record(
                &payload,
                &self.config,
            )?)),
            other => Err(DocumentStoreError::InvalidBatchOperation(other.to_string())),
        }
    }

    // =========================================================================
    // Internal Helpers
    // =========================================================================

    async fn send(&self, request: Request) -> Result<Response> {
        debug!(
            table = %self.config.table_name,
            operation = request.operation(),
            "sending request"
        );
        self.transport
            .send(request)
            .await
            .map_err(DocumentStoreError::Transport)
    }

    /// Defaults, auto attributes, validation and key presence for a put
    fn prepare_put(&self, mut record: Record) -> Result<Record> {
        self.schema.apply_defaults(&mut record, self.clock.as_ref());

        let auto = &self.config.auto_attributes;
        for name in [&auto.created_at, &auto.updated_at].into_iter().flatten() {
            if !record.contains_key(name) {
                record.insert(name.clone(), Value::Date(self.clock.now()));
            }
        }

        validate(&record, &self.schema)?;
        Key::from_record(&record, &self.config)?;
        Ok(record)
    }

    /// Partition and sort key names of the table or the named index
    fn key_names(&self, index_name: Option<&str>) -> Result<(String, Option<String>)> {
        match index_name {
            Some(name) => {
                let index = self.config.index(name).ok_or_else(|| {
                    DocumentStoreError::invalid_request(format!(
                        "Unknown index '{}' on table '{}'",
                        name, self.config.table_name
                    ))
                })?;
                Ok((index.partition_key.clone(), index.sort_key.clone()))
            }
            None => Ok((
                self.config.partition_key.clone(),
                self.config.sort_key.clone(),
            )),
        }
    }

    fn projection(
        &self,
        attrs: &mut ExpressionAttributes,
        fields: Option<&[String]>,
    ) -> Result<Option<String>> {
        match fields {
            Some(fields) if !fields.is_empty() => Ok(Some(attrs.projection(fields)?)),
            _ => Ok(None),
        }
    }

    fn to_page(&self, output: PageOutput) -> Result<Page> {
        let items = output
            .items
            .iter()
            .map(|item| item_to_record(item, &self.schema))
            .collect::<Result<Vec<_>>>()?;

        Ok(Page {
            count: output.count,
            scanned_count: output.scanned_count,
            items,
            continuation: output.last_evaluated_key.map(ContinuationToken),
        })
    }
}

fn non_empty(expression: String) -> Option<String> {
    (!expression.is_empty()).then_some(expression)
}

fn unexpected(expected: &str, response: &Response) -> DocumentStoreError {
    DocumentStoreError::unexpected_response(format!(
        "expected {} response, got {}",
        expected,
        response.operation()
    ))
}

