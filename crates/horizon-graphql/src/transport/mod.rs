//! The wire transport seam.
//!
//! A [`Transport`] takes a fully-formed POST request and returns the raw HTTP
//! response. Connection pooling, TLS and timeouts belong to the transport; the
//! client neither inspects nor retries transport faults. [`HttpTransport`] is
//! the reqwest-backed implementation.

mod http;

pub use self::http::{HttpTransport, HttpTransportBuilder, HttpTransportConfig};

use std::sync::Arc;

use bytes::Bytes;
use futures_util::future::BoxFuture;
use url::Url;

use crate::error::TransportError;

/// A single request handed to a [`Transport`]. Always a POST.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// The endpoint to POST to.
    pub url: Url,
    /// Request headers.
    pub headers: ::http::HeaderMap,
    /// The serialized GraphQL request body.
    pub body: Bytes,
}

/// The raw response returned by a [`Transport`].
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: ::http::HeaderMap,
    /// Response body.
    pub body: Bytes,
}

impl TransportResponse {
    /// Create a response with no headers.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: ::http::HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Check if the status code indicates success (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The body as UTF-8 text, if it is valid UTF-8.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

/// Executes GraphQL HTTP exchanges.
///
/// Implementations must be shareable across concurrent calls. The returned
/// future must not borrow the transport.
pub trait Transport: Send + Sync + 'static {
    /// Execute one request.
    fn execute(
        &self,
        request: TransportRequest,
    ) -> BoxFuture<'static, Result<TransportResponse, TransportError>>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn execute(
        &self,
        request: TransportRequest,
    ) -> BoxFuture<'static, Result<TransportResponse, TransportError>> {
        (**self).execute(request)
    }
}
