//! Raw calls: one bound execution of one operation.
//!
//! A [`RawCall`] is produced by the client for every operation invocation and
//! handed to the client's [`ResultAdapter`](crate::ResultAdapter). It owns no
//! state in common with any other call: its id, lifecycle state and cancel
//! channel are its own, while the endpoint, transport and codec it references
//! are immutable.
//!
//! Lifecycle: `Created -> Adapted -> Executing -> Completed | Failed | Canceled`.
//! A call may be canceled at any point before it finishes.

use std::fmt;
use std::future::IntoFuture;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use bytes::Bytes;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::Instrument;
use url::Url;

use crate::codec::Codec;
use crate::error::{CallError, EncodeError};
use crate::operation::{Operation, ResponseFieldMapper};
use crate::request::GraphQLRequest;
use crate::response::{Response, ResponseEnvelope};
use crate::runtime;
use crate::transport::{Transport, TransportRequest};

/// Unique identifier for a call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallId(u64);

impl CallId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw id value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state of a call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CallState {
    /// Constructed by the client, not yet handed to an adapter.
    Created = 0,
    /// Wrapped by the result adapter and returned to the caller.
    Adapted = 1,
    /// The request is in flight.
    Executing = 2,
    /// A response was received and mapped.
    Completed = 3,
    /// Encoding, transport or decoding failed.
    Failed = 4,
    /// The call was canceled before it finished.
    Canceled = 5,
}

impl CallState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Created,
            1 => Self::Adapted,
            2 => Self::Executing,
            3 => Self::Completed,
            4 => Self::Failed,
            _ => Self::Canceled,
        }
    }

    /// Check if the call has reached a final state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Canceled)
    }
}

struct CallShared {
    id: CallId,
    state: AtomicU8,
    // Taken on completion or cancellation; `Some` while the call is pending.
    cancel_tx: Mutex<Option<oneshot::Sender<()>>>,
}

impl CallShared {
    fn state(&self) -> CallState {
        CallState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: CallState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn advance(&self, from: CallState, to: CallState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// A handle to a call that can observe and cancel it.
///
/// Handles are cheap to clone and may outlive the call.
#[derive(Clone)]
pub struct CallHandle {
    shared: Arc<CallShared>,
}

impl CallHandle {
    /// The call's id.
    pub fn id(&self) -> CallId {
        self.shared.id
    }

    /// The call's current state.
    pub fn state(&self) -> CallState {
        self.shared.state()
    }

    /// Cancel the call.
    ///
    /// Returns `true` if the call was still pending. A call canceled before it
    /// starts fails with [`CallError::Canceled`] as soon as it is executed.
    pub fn cancel(&self) -> bool {
        let Some(tx) = self.shared.cancel_tx.lock().take() else {
            return false;
        };
        self.shared.set_state(CallState::Canceled);
        // The receiver is gone only if the call was dropped unexecuted.
        let _ = tx.send(());
        tracing::debug!(target: "horizon_graphql::call", id = %self.shared.id, "call canceled");
        true
    }

    /// Check if the call has neither finished nor been canceled.
    pub fn is_pending(&self) -> bool {
        self.shared.cancel_tx.lock().is_some()
    }
}

impl fmt::Debug for CallHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallHandle")
            .field("id", &self.shared.id)
            .field("state", &self.shared.state())
            .finish()
    }
}

/// The immutable pieces of a call, shared with the client configuration.
struct CallRequest<D: Send + 'static> {
    operation: Arc<dyn Operation<Data = D>>,
    mapper: Arc<dyn ResponseFieldMapper<Data = D>>,
    endpoint: Url,
    transport: Arc<dyn Transport>,
    codec: Arc<Codec>,
    headers: Arc<::http::HeaderMap>,
}

impl<D: Send + 'static> Clone for CallRequest<D> {
    fn clone(&self) -> Self {
        Self {
            operation: self.operation.clone(),
            mapper: self.mapper.clone(),
            endpoint: self.endpoint.clone(),
            transport: self.transport.clone(),
            codec: self.codec.clone(),
            headers: self.headers.clone(),
        }
    }
}

impl<D: Send + 'static> CallRequest<D> {
    async fn run(&self) -> Result<Response<D>, CallError> {
        let variables = self.codec.encode_variables(&self.operation.variables())?;
        let body = GraphQLRequest::new(self.operation.document())
            .operation_name(self.operation.name())
            .variables(variables)
            .to_bytes()
            .map_err(EncodeError::from)?;

        let mut headers = (*self.headers).clone();
        headers.insert(
            ::http::header::CONTENT_TYPE,
            ::http::HeaderValue::from_static("application/json"),
        );
        headers
            .entry(::http::header::ACCEPT)
            .or_insert(::http::HeaderValue::from_static("application/json"));

        let response = self
            .transport
            .execute(TransportRequest {
                url: self.endpoint.clone(),
                headers,
                body: Bytes::from(body),
            })
            .await?;

        if !response.is_success() {
            return Err(CallError::HttpStatus {
                status: response.status,
                body: response.text().map(str::to_owned),
            });
        }

        let tree = self.codec.parse(&response.body)?;
        let envelope: ResponseEnvelope = self.codec.decode(&tree)?;

        let data = match envelope.data {
            Some(Value::Null) | None => None,
            Some(data) => match self.mapper.map(&self.codec.reader(&data)) {
                Ok(mapped) => Some(mapped),
                // Partial data that fails to map is explained by the server's errors.
                Err(_) if !envelope.errors.is_empty() => {
                    return Err(CallError::GraphQL(envelope.errors));
                }
                Err(err) => return Err(err.into()),
            },
        };

        Ok(Response {
            operation_name: self.operation.name().to_string(),
            data,
            errors: envelope.errors,
            extensions: envelope.extensions,
        })
    }
}

/// One pending execution of an operation against a frozen client
/// configuration.
///
/// A raw call executes at most once. Use [`duplicate`](Self::duplicate) to
/// run the same operation again.
pub struct RawCall<D: Send + 'static> {
    shared: Arc<CallShared>,
    cancel_rx: oneshot::Receiver<()>,
    request: CallRequest<D>,
}

impl<D: Send + 'static> RawCall<D> {
    pub(crate) fn new(
        operation: Arc<dyn Operation<Data = D>>,
        endpoint: Url,
        transport: Arc<dyn Transport>,
        codec: Arc<Codec>,
        headers: Arc<::http::HeaderMap>,
    ) -> Self {
        let mapper = Arc::from(operation.response_field_mapper());
        Self::from_request(CallRequest {
            operation,
            mapper,
            endpoint,
            transport,
            codec,
            headers,
        })
    }

    fn from_request(request: CallRequest<D>) -> Self {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        Self {
            shared: Arc::new(CallShared {
                id: CallId::next(),
                state: AtomicU8::new(CallState::Created as u8),
                cancel_tx: Mutex::new(Some(cancel_tx)),
            }),
            cancel_rx,
            request,
        }
    }

    /// The call's id.
    pub fn id(&self) -> CallId {
        self.shared.id
    }

    /// The call's current state.
    pub fn state(&self) -> CallState {
        self.shared.state()
    }

    /// The name of the operation this call executes.
    pub fn operation_name(&self) -> &str {
        self.request.operation.name()
    }

    /// The endpoint this call is bound to.
    pub fn endpoint(&self) -> &Url {
        &self.request.endpoint
    }

    /// Get a handle that can cancel this call.
    pub fn handle(&self) -> CallHandle {
        CallHandle {
            shared: self.shared.clone(),
        }
    }

    /// Cancel this call. See [`CallHandle::cancel`].
    pub fn cancel(&self) -> bool {
        self.handle().cancel()
    }

    /// Create a fresh call for the same operation and configuration.
    ///
    /// The duplicate has its own id, state and cancel channel; canceling or
    /// executing one does not affect the other.
    pub fn duplicate(&self) -> Self {
        Self::from_request(self.request.clone())
    }

    pub(crate) fn mark_adapted(&self) {
        self.shared.advance(CallState::Created, CallState::Adapted);
    }

    /// Execute the call.
    ///
    /// Resolves to [`CallError::Canceled`] if the call is canceled before or
    /// while it runs.
    pub async fn execute(self) -> Result<Response<D>, CallError> {
        let Self {
            shared,
            mut cancel_rx,
            request,
        } = self;

        if shared.state() == CallState::Canceled {
            return Err(CallError::Canceled);
        }
        shared.set_state(CallState::Executing);

        let span = tracing::info_span!(
            target: "horizon_graphql::call",
            "graphql_call",
            id = shared.id.0,
            operation = request.operation.name()
        );

        async move {
            tracing::debug!(target: "horizon_graphql::call", "executing");

            let result = tokio::select! {
                result = request.run() => result,
                Ok(()) = &mut cancel_rx => Err(CallError::Canceled),
            };

            // A cancel that raced completion wins.
            let finished = shared.cancel_tx.lock().take().is_some();
            let result = if finished { result } else { Err(CallError::Canceled) };

            match &result {
                Ok(_) => {
                    shared.advance(CallState::Executing, CallState::Completed);
                }
                Err(CallError::Canceled) => {
                    shared.set_state(CallState::Canceled);
                    tracing::warn!(target: "horizon_graphql::call", "call canceled");
                }
                Err(err) => {
                    shared.advance(CallState::Executing, CallState::Failed);
                    tracing::warn!(target: "horizon_graphql::call", error = %err, "call failed");
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Execute the call in the background and deliver the result to
    /// `callback`.
    ///
    /// Runs on the current tokio runtime if there is one, otherwise on the
    /// crate's global runtime.
    pub fn enqueue<F>(self, callback: F) -> CallHandle
    where
        F: FnOnce(Result<Response<D>, CallError>) + Send + 'static,
    {
        let handle = self.handle();
        runtime::spawn(async move { callback(self.execute().await) });
        handle
    }
}

impl<D: Send + 'static> IntoFuture for RawCall<D> {
    type Output = Result<Response<D>, CallError>;
    type IntoFuture = BoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        self.execute().boxed()
    }
}

impl<D: Send + 'static> fmt::Debug for RawCall<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawCall")
            .field("id", &self.shared.id)
            .field("state", &self.shared.state())
            .field("operation", &self.request.operation.name())
            .field("endpoint", &self.request.endpoint.as_str())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::operation::{ResponseFieldMapper, mapper};
    use crate::transport::TransportResponse;
    use std::time::Duration;

    struct Ping;

    impl Operation for Ping {
        type Data = String;

        fn document(&self) -> &str {
            "query Ping { ping }"
        }

        fn name(&self) -> &str {
            "Ping"
        }

        fn response_field_mapper(&self) -> Box<dyn ResponseFieldMapper<Data = String>> {
            Box::new(mapper(|data| data.field("ping").string()))
        }
    }

    struct Fixed {
        status: u16,
        body: &'static str,
        delay: Duration,
    }

    impl Transport for Fixed {
        fn execute(
            &self,
            _request: TransportRequest,
        ) -> BoxFuture<'static, Result<TransportResponse, TransportError>> {
            let (status, body, delay) = (self.status, self.body, self.delay);
            async move {
                tokio::time::sleep(delay).await;
                Ok(TransportResponse::new(status, body))
            }
            .boxed()
        }
    }

    fn call(status: u16, body: &'static str, delay: Duration) -> RawCall<String> {
        RawCall::new(
            Arc::new(Ping),
            Url::parse("https://api.example.com/graphql").unwrap(),
            Arc::new(Fixed {
                status,
                body,
                delay,
            }),
            Arc::new(Codec::standard()),
            Arc::new(::http::HeaderMap::new()),
        )
    }

    #[tokio::test]
    async fn test_execute_success() {
        let call = call(200, r#"{"data":{"ping":"pong"}}"#, Duration::ZERO);
        let handle = call.handle();
        assert_eq!(handle.state(), CallState::Created);

        let response = call.execute().await.unwrap();
        assert_eq!(response.data.as_deref(), Some("pong"));
        assert_eq!(response.operation_name, "Ping");
        assert_eq!(handle.state(), CallState::Completed);
        assert!(!handle.is_pending());
        assert!(!handle.cancel());
    }

    #[tokio::test]
    async fn test_null_data_skips_mapper() {
        let call = call(
            200,
            r#"{"data":null,"errors":[{"message":"boom"}]}"#,
            Duration::ZERO,
        );
        let response = call.await.unwrap();
        assert!(response.data.is_none());
        assert_eq!(response.error_message().as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let call = call(500, "oops", Duration::ZERO);
        let handle = call.handle();
        let err = call.execute().await.unwrap_err();

        assert!(matches!(err, CallError::HttpStatus { status: 500, ref body } if body.as_deref() == Some("oops")));
        assert_eq!(handle.state(), CallState::Failed);
    }

    #[tokio::test]
    async fn test_mapper_failure_is_decode_error() {
        let call = call(200, r#"{"data":{"ping":3}}"#, Duration::ZERO);
        let err = call.execute().await.unwrap_err();
        assert!(matches!(err, CallError::Decode(_)));
    }

    #[tokio::test]
    async fn test_unmappable_partial_data_reports_server_errors() {
        let call = call(
            200,
            r#"{"data":{"ping":null},"errors":[{"message":"ping unavailable"}]}"#,
            Duration::ZERO,
        );
        let handle = call.handle();

        match call.execute().await {
            Err(CallError::GraphQL(errors)) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].message, "ping unavailable");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(handle.state(), CallState::Failed);
    }

    #[tokio::test]
    async fn test_cancel_before_execute() {
        let call = call(200, r#"{"data":{"ping":"pong"}}"#, Duration::ZERO);
        assert!(call.cancel());
        assert_eq!(call.state(), CallState::Canceled);

        let err = call.execute().await.unwrap_err();
        assert!(err.is_canceled());
    }

    #[tokio::test]
    async fn test_cancel_in_flight() {
        let call = call(200, r#"{"data":{"ping":"pong"}}"#, Duration::from_secs(30));
        let handle = call.handle();
        let task = tokio::spawn(call.execute());

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(handle.state(), CallState::Executing);
        assert!(handle.cancel());

        let err = task.await.unwrap().unwrap_err();
        assert!(err.is_canceled());
        assert_eq!(handle.state(), CallState::Canceled);
    }

    #[tokio::test]
    async fn test_duplicate_is_independent() {
        let original = call(200, r#"{"data":{"ping":"pong"}}"#, Duration::ZERO);
        let copy = original.duplicate();

        assert_ne!(original.id(), copy.id());
        assert!(original.cancel());
        assert_eq!(copy.state(), CallState::Created);
        assert!(copy.handle().is_pending());

        assert!(original.execute().await.unwrap_err().is_canceled());
        assert_eq!(copy.execute().await.unwrap().data.as_deref(), Some("pong"));
    }

    #[tokio::test]
    async fn test_enqueue_delivers_result() {
        let call = call(200, r#"{"data":{"ping":"pong"}}"#, Duration::ZERO);
        let (tx, rx) = oneshot::channel();
        let handle = call.enqueue(move |result| {
            let _ = tx.send(result);
        });

        let response = rx.await.unwrap().unwrap();
        assert_eq!(response.data.as_deref(), Some("pong"));
        assert_eq!(handle.state(), CallState::Completed);
    }
}
