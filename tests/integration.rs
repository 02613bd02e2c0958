//! Integration tests for runtara-document-store
//!
//! The store is driven through a recording transport that captures every
//! request descriptor and replays scripted responses in order.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use runtara_document_store::request::{
    BatchGetItemOutput, BatchWriteItemOutput, DeleteRequest, GetItemOutput, KeysAndAttributes,
    PageOutput, PutItemOutput, ReturnValues, UpdateItemOutput, WriteRequest,
};
use runtara_document_store::{
    AttributeValue, ContinuationToken, DocumentStore, DocumentStoreError, Field, FixedClock,
    Item, Key, Query, Record, Request, Response, Scan, Schema, SetItemKind, SetValue,
    SortKeyCondition, TableConfig, Transport, TransportError, Value, WriteOperation,
    predicate_helpers, record_from_json,
};
use serde_json::json;

// ============================================================================
// Recording Transport
// ============================================================================

#[derive(Default)]
struct MockTransport {
    requests: Mutex<Vec<Request>>,
    responses: Mutex<VecDeque<Result<Response, String>>>,
}

impl MockTransport {
    fn respond(self, response: Response) -> Self {
        self.responses.lock().unwrap().push_back(Ok(response));
        self
    }

    fn fail(self, message: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
        self
    }

    fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    fn last_request(&self) -> Request {
        self.requests().pop().expect("no request was sent")
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        self.requests.lock().unwrap().push(request);
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(message.into()),
            None => Err("no scripted response".into()),
        }
    }
}

fn users_schema() -> Schema {
    Schema::default()
        .field("id", Field::string().default_uuid())
        .field("name", Field::string().required().min_length(2))
        .field("age", Field::number().integer().min(0.0))
        .field("tags", Field::set(SetItemKind::String))
        .field("joinedAt", Field::date())
}

fn users_config() -> TableConfig {
    TableConfig::builder("users", "id")
        .global_index("byName", "name", None)
        .build()
}

fn users_store(transport: MockTransport) -> DocumentStore<MockTransport> {
    DocumentStore::new(transport, users_config(), users_schema())
}

fn orders_store(transport: MockTransport) -> DocumentStore<MockTransport> {
    let schema = Schema::default()
        .field("customerId", Field::string().required())
        .field("orderId", Field::number().required())
        .field("status", Field::string());
    let config = TableConfig::builder("orders", "customerId")
        .sort_key("orderId")
        .local_index("byStatus", "status")
        .build();
    DocumentStore::new(transport, config, schema)
}

fn item(entries: &[(&str, AttributeValue)]) -> Item {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn s(text: &str) -> AttributeValue {
    AttributeValue::S(text.to_string())
}

fn n(text: &str) -> AttributeValue {
    AttributeValue::N(text.to_string())
}

// ============================================================================
// Create Tests
// ============================================================================

#[tokio::test]
async fn test_create_applies_defaults_and_sends_put() {
    let store = users_store(MockTransport::default().respond(Response::PutItem(
        PutItemOutput::default(),
    )));

    let created = store
        .create(record_from_json(json!({"name": "Jane", "age": 30})))
        .await
        .unwrap();

    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(id.len(), 36);

    let Request::PutItem(put) = store.transport().last_request() else {
        panic!("expected a put request");
    };
    assert_eq!(put.table_name, "users");
    assert_eq!(put.item.get("id"), Some(&s(&id)));
    assert_eq!(put.item.get("name"), Some(&s("Jane")));
    assert_eq!(put.item.get("age"), Some(&n("30")));
    assert!(put.condition_expression.is_none());
}

#[tokio::test]
async fn test_create_validation_failure_sends_nothing() {
    let store = users_store(MockTransport::default());

    let err = store
        .create(record_from_json(json!({"name": "J"})))
        .await
        .unwrap_err();

    let validation = err.as_validation().expect("expected a validation error");
    assert_eq!(validation.field, "name");
    assert_eq!(validation.reason, "must be at least 2 characters");
    assert!(store.transport().requests().is_empty());
}

#[tokio::test]
async fn test_create_rejects_date_without_four_digit_year() {
    let store = users_store(MockTransport::default());

    let mut record = record_from_json(json!({"id": "u1", "name": "Jane"}));
    record.insert(
        "joinedAt".to_string(),
        Value::Date(Utc.with_ymd_and_hms(-1, 6, 1, 0, 0, 0).unwrap()),
    );
    let err = store.create(record).await.unwrap_err();

    let validation = err.as_validation().expect("expected a validation error");
    assert_eq!(validation.field, "joinedAt");
    assert_eq!(validation.reason, "must be a valid Date");
    assert!(store.transport().requests().is_empty());
}

#[tokio::test]
async fn test_create_invokes_generator_per_call() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let schema = Schema::default().field(
        "id",
        Field::string().default_with(move || {
            let next = counter.fetch_add(1, Ordering::SeqCst) + 1;
            Value::String(format!("user-{}", next))
        }),
    );
    let transport = MockTransport::default()
        .respond(Response::PutItem(PutItemOutput::default()))
        .respond(Response::PutItem(PutItemOutput::default()));
    let store = DocumentStore::new(transport, users_config(), schema);

    let first = store.create(Record::new()).await.unwrap();
    let second = store.create(Record::new()).await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(first["id"], Value::from("user-1"));
    assert_eq!(second["id"], Value::from("user-2"));
}

#[tokio::test]
async fn test_create_keeps_explicit_values_over_defaults() {
    let store = users_store(MockTransport::default().respond(Response::PutItem(
        PutItemOutput::default(),
    )));

    let created = store
        .create(record_from_json(json!({"id": "fixed", "name": "Jane"})))
        .await
        .unwrap();

    assert_eq!(created["id"], Value::from("fixed"));
}

#[tokio::test]
async fn test_create_with_prevent_overwrite() {
    let config = TableConfig::builder("users", "id")
        .prevent_overwrite(true)
        .build();
    let transport =
        MockTransport::default().respond(Response::PutItem(PutItemOutput::default()));
    let store = DocumentStore::new(transport, config, users_schema());

    store
        .create(record_from_json(json!({"id": "u1", "name": "Jane"})))
        .await
        .unwrap();

    let Request::PutItem(put) = store.transport().last_request() else {
        panic!("expected a put request");
    };
    assert_eq!(
        put.condition_expression.as_deref(),
        Some("attribute_not_exists(#field0)")
    );
    let names = put.expression_attribute_names.unwrap();
    assert_eq!(names.get("#field0").map(String::as_str), Some("id"));
}

#[tokio::test]
async fn test_create_stamps_auto_attributes() {
    let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    let config = TableConfig::builder("users", "id")
        .auto_created_at("createdAt")
        .auto_updated_at("updatedAt")
        .build();
    let transport =
        MockTransport::default().respond(Response::PutItem(PutItemOutput::default()));
    let store =
        DocumentStore::new(transport, config, users_schema()).with_clock(FixedClock(now));

    let created = store
        .create(record_from_json(json!({"id": "u1", "name": "Jane"})))
        .await
        .unwrap();

    assert_eq!(created["createdAt"], Value::Date(now));
    assert_eq!(created["updatedAt"], Value::Date(now));

    let Request::PutItem(put) = store.transport().last_request() else {
        panic!("expected a put request");
    };
    assert_eq!(put.item.get("createdAt"), Some(&s("2024-01-02T03:04:05Z")));
}

#[tokio::test]
async fn test_create_requires_key_attributes() {
    let store = orders_store(MockTransport::default());

    let err = store
        .create(record_from_json(json!({"customerId": "c1", "orderId": null})))
        .await
        .unwrap_err();

    // orderId is required, so validation fires first
    assert!(matches!(err, DocumentStoreError::Validation(_)));
    assert!(store.transport().requests().is_empty());
}

// ============================================================================
// Get / Update / Delete Tests
// ============================================================================

#[tokio::test]
async fn test_get_not_found_returns_none() {
    let store = users_store(
        MockTransport::default().respond(Response::GetItem(GetItemOutput { item: None })),
    );

    let found = store.get(&Key::new("missing")).await.unwrap();
    assert!(found.is_none());

    let Request::GetItem(get) = store.transport().last_request() else {
        panic!("expected a get request");
    };
    assert_eq!(get.key, item(&[("id", s("missing"))]));
    assert!(get.consistent_read.is_none());
}

#[tokio::test]
async fn test_get_decodes_schema_kinds() {
    let stored = item(&[
        ("id", s("u1")),
        ("name", s("Jane")),
        ("joinedAt", s("2024-01-02T03:04:05Z")),
        ("tags", AttributeValue::L(vec![s("a"), s("b")])),
    ]);
    let store = users_store(MockTransport::default().respond(Response::GetItem(
        GetItemOutput { item: Some(stored) },
    )));

    let record = store.get(&Key::new("u1")).await.unwrap().unwrap();

    assert_eq!(
        record["joinedAt"],
        Value::Date(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap())
    );
    assert_eq!(record["tags"], Value::Set(SetValue::strings(["a", "b"])));
}

#[tokio::test]
async fn test_update_builds_aliased_set_expression() {
    let post_image = item(&[("id", s("u1")), ("name", s("Adam"))]);
    let store = users_store(MockTransport::default().respond(Response::UpdateItem(
        UpdateItemOutput {
            attributes: Some(post_image),
        },
    )));

    let updated = store
        .update(&Key::new("u1"), record_from_json(json!({"name": "Adam"})))
        .await
        .unwrap();

    assert_eq!(updated["name"], Value::from("Adam"));

    let Request::UpdateItem(update) = store.transport().last_request() else {
        panic!("expected an update request");
    };
    assert_eq!(update.update_expression, "SET #field0 = :value0");
    assert_eq!(
        update.expression_attribute_names,
        HashMap::from([("#field0".to_string(), "name".to_string())])
    );
    assert_eq!(
        update.expression_attribute_values,
        item(&[(":value0", s("Adam"))])
    );
    assert_eq!(update.return_values, ReturnValues::AllNew);
    assert_eq!(update.key, item(&[("id", s("u1"))]));
}

#[tokio::test]
async fn test_update_validates_only_supplied_fields() {
    let store = users_store(MockTransport::default());

    let err = store
        .update(&Key::new("u1"), record_from_json(json!({"age": -1})))
        .await
        .unwrap_err();

    let validation = err.as_validation().unwrap();
    assert_eq!(validation.field, "age");
    assert!(store.transport().requests().is_empty());
}

#[tokio::test]
async fn test_update_rejects_empty_and_key_changes() {
    let store = users_store(MockTransport::default());

    let empty = store.update(&Key::new("u1"), Record::new()).await;
    assert!(matches!(empty, Err(DocumentStoreError::InvalidRequest(_))));

    let key_change = store
        .update(&Key::new("u1"), record_from_json(json!({"id": "u2"})))
        .await;
    assert!(matches!(key_change, Err(DocumentStoreError::InvalidRequest(_))));

    assert!(store.transport().requests().is_empty());
}

#[tokio::test]
async fn test_update_without_post_image_fails() {
    let store = users_store(
        MockTransport::default().respond(Response::UpdateItem(UpdateItemOutput::default())),
    );

    let err = store
        .update(&Key::new("u1"), record_from_json(json!({"name": "Adam"})))
        .await
        .unwrap_err();

    assert!(matches!(err, DocumentStoreError::UnexpectedResponse(_)));
}

#[tokio::test]
async fn test_delete_sends_key() {
    let store = orders_store(MockTransport::default().respond(Response::DeleteItem(
        Default::default(),
    )));

    store
        .delete(&Key::new("c1").with_sort(7))
        .await
        .unwrap();

    let Request::DeleteItem(delete) = store.transport().last_request() else {
        panic!("expected a delete request");
    };
    assert_eq!(delete.table_name, "orders");
    assert_eq!(
        delete.key,
        item(&[("customerId", s("c1")), ("orderId", n("7"))])
    );
}

#[tokio::test]
async fn test_delete_missing_sort_key_fails() {
    let store = orders_store(MockTransport::default());
    let err = store.delete(&Key::new("c1")).await.unwrap_err();
    assert!(matches!(err, DocumentStoreError::InvalidRequest(_)));
}

// ============================================================================
// Query and Scan Tests
// ============================================================================

#[tokio::test]
async fn test_query_aliases_never_collide() {
    let last_key = item(&[("customerId", s("c1")), ("orderId", n("15"))]);
    let store = orders_store(MockTransport::default().respond(Response::Query(PageOutput {
        items: vec![item(&[("customerId", s("c1")), ("orderId", n("15"))])],
        count: 1,
        scanned_count: 3,
        last_evaluated_key: Some(last_key.clone()),
    })));

    let page = store
        .query(
            Query::new("c1")
                .sort_key(SortKeyCondition::between(10, 20))
                .filter(predicate_helpers::eq("status", "open"))
                .select(["orderId"])
                .descending()
                .limit(10),
        )
        .await
        .unwrap();

    assert_eq!(page.count, 1);
    assert_eq!(page.scanned_count, 3);
    assert_eq!(page.items[0]["orderId"], Value::Number(15.0));
    assert_eq!(page.continuation, Some(ContinuationToken(last_key)));

    let Request::Query(query) = store.transport().last_request() else {
        panic!("expected a query request");
    };
    assert_eq!(
        query.key_condition_expression,
        "#field0 = :value0 AND #field1 BETWEEN :value1 AND :value1_2"
    );
    assert_eq!(query.filter_expression.as_deref(), Some("#field2 = :value2"));
    assert_eq!(query.projection_expression.as_deref(), Some("#field3"));
    assert_eq!(query.expression_attribute_names.len(), 4);
    assert_eq!(query.expression_attribute_values.len(), 4);
    assert_eq!(
        query.expression_attribute_values.get(":value1_2"),
        Some(&n("20"))
    );
    assert_eq!(query.scan_index_forward, Some(false));
    assert_eq!(query.limit, Some(10));
}

#[tokio::test]
async fn test_query_resumes_from_token() {
    let store = orders_store(
        MockTransport::default().respond(Response::Query(PageOutput::default())),
    );
    let token = ContinuationToken(item(&[("customerId", s("c1")), ("orderId", n("15"))]));
    let decoded = ContinuationToken::decode(&token.encode().unwrap()).unwrap();

    let page = store
        .query(Query::new("c1").start_from(decoded))
        .await
        .unwrap();

    assert!(page.items.is_empty());
    assert!(page.continuation.is_none());

    let Request::Query(query) = store.transport().last_request() else {
        panic!("expected a query request");
    };
    assert_eq!(query.exclusive_start_key, Some(token.0));
    assert!(query.filter_expression.is_none());
    assert!(query.projection_expression.is_none());
}

#[tokio::test]
async fn test_query_index_uses_index_keys() {
    let store = users_store(
        MockTransport::default().respond(Response::Query(PageOutput::default())),
    );

    store
        .query(Query::new("Jane").index("byName"))
        .await
        .unwrap();

    let Request::Query(query) = store.transport().last_request() else {
        panic!("expected a query request");
    };
    assert_eq!(query.index_name.as_deref(), Some("byName"));
    assert_eq!(
        query.expression_attribute_names.get("#field0").map(String::as_str),
        Some("name")
    );
}

#[tokio::test]
async fn test_query_rejects_unknown_index_and_bad_sort_condition() {
    let store = users_store(MockTransport::default());

    let unknown = store.query(Query::new("Jane").index("byEmail")).await;
    assert!(matches!(unknown, Err(DocumentStoreError::InvalidRequest(_))));

    let no_sort_key = store
        .query(Query::new("u1").sort_key(SortKeyCondition::new(
            runtara_document_store::Operator::Gt,
            1,
        )))
        .await;
    assert!(matches!(no_sort_key, Err(DocumentStoreError::InvalidRequest(_))));

    assert!(store.transport().requests().is_empty());
}

#[tokio::test]
async fn test_query_consistent_reads_from_config() {
    let config = TableConfig::builder("users", "id")
        .consistent_reads(true)
        .build();
    let transport = MockTransport::default()
        .respond(Response::Query(PageOutput::default()))
        .respond(Response::Query(PageOutput::default()));
    let store = DocumentStore::new(transport, config, users_schema());

    store.query(Query::new("u1")).await.unwrap();
    store
        .query(Query::new("u1").consistent_read(false))
        .await
        .unwrap();

    let requests = store.transport().requests();
    let reads: Vec<Option<bool>> = requests
        .iter()
        .map(|r| match r {
            Request::Query(q) => q.consistent_read,
            _ => panic!("expected query requests"),
        })
        .collect();
    assert_eq!(reads, vec![Some(true), Some(false)]);
}

#[tokio::test]
async fn test_scan_with_segments_and_filters() {
    let store = users_store(MockTransport::default().respond(Response::Scan(PageOutput {
        items: vec![item(&[("id", s("u1")), ("name", s("Jane"))])],
        count: 1,
        scanned_count: 1,
        last_evaluated_key: None,
    })));

    let page = store
        .scan(
            Scan::new()
                .filter(predicate_helpers::begins_with("name", "Ja"))
                .segment(1, 4),
        )
        .await
        .unwrap();

    assert_eq!(page.items.len(), 1);

    let Request::Scan(scan) = store.transport().last_request() else {
        panic!("expected a scan request");
    };
    assert_eq!(
        scan.filter_expression.as_deref(),
        Some("begins_with(#field0, :value0)")
    );
    assert_eq!(scan.segment, Some(1));
    assert_eq!(scan.total_segments, Some(4));
}

#[tokio::test]
async fn test_scan_without_expressions_omits_alias_tables() {
    let store = users_store(
        MockTransport::default().respond(Response::Scan(PageOutput::default())),
    );

    store.scan(Scan::new()).await.unwrap();

    let Request::Scan(scan) = store.transport().last_request() else {
        panic!("expected a scan request");
    };
    assert!(scan.expression_attribute_names.is_none());
    assert!(scan.expression_attribute_values.is_none());
    assert!(scan.segment.is_none());
}

#[tokio::test]
async fn test_scan_rejects_bad_segment() {
    let store = users_store(MockTransport::default());
    let err = store.scan(Scan::new().segment(4, 4)).await.unwrap_err();
    assert!(matches!(err, DocumentStoreError::InvalidRequest(_)));
    assert!(store.transport().requests().is_empty());
}

// ============================================================================
// Batch Tests
// ============================================================================

#[tokio::test]
async fn test_batch_get_returns_items_and_unprocessed_keys() {
    let output = BatchGetItemOutput {
        responses: HashMap::from([(
            "users".to_string(),
            vec![item(&[("id", s("u1")), ("name", s("Jane"))])],
        )]),
        unprocessed_keys: HashMap::from([(
            "users".to_string(),
            KeysAndAttributes {
                keys: vec![item(&[("id", s("u2"))])],
                consistent_read: None,
            },
        )]),
    };
    let store = users_store(MockTransport::default().respond(Response::BatchGetItem(output)));

    let outcome = store
        .batch_get(&[Key::new("u1"), Key::new("u2")])
        .await
        .unwrap();

    assert_eq!(outcome.items.len(), 1);
    assert_eq!(outcome.items[0]["name"], Value::from("Jane"));
    assert_eq!(outcome.unprocessed_keys, vec![Key::new("u2")]);

    let Request::BatchGetItem(batch) = store.transport().last_request() else {
        panic!("expected a batch get request");
    };
    assert_eq!(batch.request_items["users"].keys.len(), 2);
}

#[tokio::test]
async fn test_empty_batches_skip_the_transport() {
    let store = users_store(MockTransport::default());

    let got = store.batch_get(&[]).await.unwrap();
    let written = store.batch_write(Vec::new()).await.unwrap();

    assert!(got.items.is_empty());
    assert!(written.unprocessed.is_empty());
    assert!(store.transport().requests().is_empty());
}

#[tokio::test]
async fn test_batch_write_mixed_operations() {
    let output = BatchWriteItemOutput {
        unprocessed_items: HashMap::from([(
            "users".to_string(),
            vec![WriteRequest::DeleteRequest(DeleteRequest {
                key: item(&[("id", s("u9"))]),
            })],
        )]),
    };
    let store = users_store(MockTransport::default().respond(Response::BatchWriteItem(output)));

    let put = store
        .write_operation("put", record_from_json(json!({"id": "u1", "name": "Jane"})))
        .unwrap();
    let delete = store
        .write_operation("delete", record_from_json(json!({"id": "u9"})))
        .unwrap();

    let outcome = store.batch_write(vec![put, delete]).await.unwrap();
    assert_eq!(
        outcome.unprocessed,
        vec![WriteOperation::Delete(Key::new("u9"))]
    );

    let Request::BatchWriteItem(batch) = store.transport().last_request() else {
        panic!("expected a batch write request");
    };
    let writes = &batch.request_items["users"];
    assert_eq!(writes.len(), 2);
    assert!(matches!(writes[0], WriteRequest::PutRequest(_)));
    assert!(matches!(writes[1], WriteRequest::DeleteRequest(_)));
}

#[tokio::test]
async fn test_batch_write_invalid_entry_fails_before_sending() {
    let store = users_store(MockTransport::default());

    let err = store
        .batch_write(vec![
            WriteOperation::Put(record_from_json(json!({"id": "u1", "name": "Jane"}))),
            WriteOperation::Put(record_from_json(json!({"id": "u2", "name": "J"}))),
        ])
        .await
        .unwrap_err();

    assert!(matches!(err, DocumentStoreError::Validation(_)));
    assert!(store.transport().requests().is_empty());
}

#[test]
fn test_write_operation_rejects_unknown_tag() {
    let store = users_store(MockTransport::default());

    let err = store
        .write_operation("upsert", record_from_json(json!({"id": "u1"})))
        .unwrap_err();

    match err {
        DocumentStoreError::InvalidBatchOperation(tag) => assert_eq!(tag, "upsert"),
        other => panic!("unexpected error: {other}"),
    }
}

// ============================================================================
// Transport and Response Handling Tests
// ============================================================================

#[tokio::test]
async fn test_transport_error_passes_through() {
    let store = users_store(MockTransport::default().fail("throttled"));

    let err = store.get(&Key::new("u1")).await.unwrap_err();

    assert!(matches!(err, DocumentStoreError::Transport(_)));
    assert_eq!(err.to_string(), "throttled");
}

#[tokio::test]
async fn test_wrong_response_kind_is_rejected() {
    let store = users_store(
        MockTransport::default().respond(Response::Scan(PageOutput::default())),
    );

    let err = store.get(&Key::new("u1")).await.unwrap_err();

    match err {
        DocumentStoreError::UnexpectedResponse(msg) => {
            assert_eq!(msg, "expected GetItem response, got Scan")
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_set_round_trip_through_store() {
    let store = users_store(MockTransport::default().respond(Response::PutItem(
        PutItemOutput::default(),
    )));

    let mut record = record_from_json(json!({"id": "u1", "name": "Jane"}));
    record.insert(
        "tags".to_string(),
        Value::Set(SetValue::strings(["admin", "ops"])),
    );
    store.create(record).await.unwrap();

    let Request::PutItem(put) = store.transport().last_request() else {
        panic!("expected a put request");
    };
    let tags = put.item.get("tags").unwrap().clone();
    assert_eq!(tags, AttributeValue::L(vec![s("admin"), s("ops")]));

    let store = users_store(MockTransport::default().respond(Response::GetItem(
        GetItemOutput {
            item: Some(put.item),
        },
    )));
    let fetched = store.get(&Key::new("u1")).await.unwrap().unwrap();
    assert_eq!(
        fetched["tags"],
        Value::Set(SetValue::strings(["admin", "ops"]))
    );
}
