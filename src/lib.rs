//! # runtara-document-store
//!
//! A schema-driven access layer over a remote key-value/document store.
//!
//! Callers declare the shape of their records once and get default values,
//! validation, CRUD, single-partition queries, scans and batch operations
//! against a store whose wire format represents values as tagged attributes.
//! The crate never talks to the network itself: every operation builds one
//! request descriptor and hands it to a caller-supplied [`Transport`].
//!
//! ## Features
//!
//! - **Declarative Schemas**: String, Number, Boolean, Date, Array, Object and Set fields
//! - **Defaults**: Literal values, generators, the current instant or a fresh UUID
//! - **Validation**: Required fields, length/pattern/range constraints, custom validators
//! - **Wire Transcoding**: Native values to and from tagged attributes
//! - **Expression Building**: Aliased condition, filter, projection and update expressions
//! - **Batch Operations**: Batch get and mixed put/delete batch writes
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use runtara_document_store::{
//!     DocumentStore, Field, Key, Query, Request, Response, Schema, TableConfig, Transport,
//!     TransportError, predicate_helpers, record_from_json,
//! };
//!
//! struct MyTransport;
//!
//! #[async_trait::async_trait]
//! impl Transport for MyTransport {
//!     async fn send(&self, request: Request) -> Result<Response, TransportError> {
//!         // Forward `request` to the remote store
//!         unimplemented!()
//!     }
//! }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = Schema::default()
//!     .field("id", Field::string().default_uuid())
//!     .field("name", Field::string().required().min_length(2))
//!     .field("age", Field::number().integer().min(0.0));
//!
//! let config = TableConfig::builder("users", "id")
//!     .global_index("byName", "name", None)
//!     .build();
//!
//! let store = DocumentStore::new(MyTransport, config, schema);
//!
//! let user = store
//!     .create(record_from_json(serde_json::json!({"name": "Ada", "age": 36})))
//!     .await?;
//!
//! let page = store
//!     .query(
//!         Query::new("Ada")
//!             .index("byName")
//!             .filter(predicate_helpers::gt("age", 30)),
//!     )
//!     .await?;
//!
//! store.delete(&Key::new(user["id"].clone())).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! The table is described with `TableConfig`:
//!
//! ```rust
//! use runtara_document_store::TableConfig;
//!
//! let config = TableConfig::builder("orders", "customerId")
//!     .sort_key("orderedAt")               // Optional sort key
//!     .local_index("byTotal", "total")     // Shares the table partition key
//!     .auto_created_at("createdAt")        // Stamped on create (default: off)
//!     .auto_updated_at("updatedAt")        // Stamped on create and update (default: off)
//!     .prevent_overwrite(true)             // Fail creates over existing items
//!     .build();
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod expr;
pub mod operation;
pub mod request;
pub mod schema;
pub mod store;
pub mod transport;
pub mod types;
pub mod validate;
pub mod value;
pub mod wire;

// Re-export main types for convenience
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{AutoAttributes, TableConfig, TableConfigBuilder};
pub use error::{DocumentStoreError, Result, ValidationError};
pub use expr::{
    CompiledExpression, ExpressionAttributes, Operator, Predicate, SortKeyCondition, compile,
    predicate_helpers,
};
pub use operation::{
    BatchGetOutcome, BatchWriteOutcome, ContinuationToken, Key, Page, Query, Scan,
    WriteOperation,
};
pub use request::{Request, Response};
pub use schema::Schema;
pub use store::{DocumentStore, MAX_BATCH_GET_KEYS, MAX_BATCH_WRITE_ITEMS};
pub use transport::{Transport, TransportError};
pub use types::{
    DefaultValue, Field, FieldKind, IndexDefinition, IndexKind, NumberConstraints, SetItemKind,
    StringConstraints,
};
pub use validate::{validate, validate_partial};
pub use value::{Record, SetValue, Value, record_from_json};
pub use wire::{AttributeValue, Item};
