//! Transport boundary
//!
//! The store never opens connections or retries calls itself. Every operation
//! hands exactly one [`Request`] to a [`Transport`] and awaits one [`Response`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::request::{Request, Response};

/// Opaque error produced by a transport implementation
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

/// Sends request descriptors to the remote store.
///
/// Implementations own connection handling, authentication, retries and
/// timeouts. Errors are surfaced to callers unchanged.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a single request and return the matching response
    async fn send(&self, request: Request) -> Result<Response, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        (**self).send(request).await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        (**self).send(request).await
    }
}
