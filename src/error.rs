//! Error types for Document Store operations

use thiserror::Error;

use crate::transport::TransportError;

/// A schema violation for a single field
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Validation error on field '{field}': {reason}")]
pub struct ValidationError {
    /// Name of the offending field
    pub field: String,
    /// Human-readable reason
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Errors that can occur during document store operations
#[derive(Debug, Error)]
pub enum DocumentStoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Invalid condition: {0}")]
    InvalidCondition(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unsupported batch operation: {0}")]
    InvalidBatchOperation(String),

    #[error("Invalid wire value: {0}")]
    InvalidWireValue(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Error surfaced by the transport, passed through as-is
    #[error(transparent)]
    Transport(TransportError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DocumentStoreError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation(ValidationError::new(field, reason))
    }

    pub fn invalid_condition(msg: impl Into<String>) -> Self {
        Self::InvalidCondition(msg.into())
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn invalid_wire_value(msg: impl Into<String>) -> Self {
        Self::InvalidWireValue(msg.into())
    }

    pub fn unexpected_response(msg: impl Into<String>) -> Self {
        Self::UnexpectedResponse(msg.into())
    }

    /// The field-scoped violation, if this is a validation failure
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DocumentStoreError>;
