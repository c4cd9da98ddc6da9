//! Result adapters: how a raw call reaches the caller.
//!
//! The client is generic over one [`ResultAdapter`], fixed when the client is
//! built. Every [`RawCall`] the client creates passes through the adapter's
//! [`adapt`](ResultAdapter::adapt), and what `adapt` returns is what the
//! caller of [`GraphQLClient::new_call`](crate::GraphQLClient::new_call) gets.
//!
//! | Adapter | Caller receives | Executes |
//! |---|---|---|
//! | [`RawCallAdapter`] | `RawCall<D>` | when the caller decides |
//! | [`FutureAdapter`] | `BoxFuture<Result<Response<D>, CallError>>` | when polled |
//! | [`StreamAdapter`] | `BoxStream<Result<Response<D>, CallError>>` | when polled |
//! | [`SpawnAdapter`] | [`SpawnedCall<D>`] | immediately, in the background |
//! | [`BlockingAdapter`] | `Result<Response<D>, CallError>` | immediately, blocking |

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::future::BoxFuture;
use futures_util::stream::{self, BoxStream};
use futures_util::{FutureExt, StreamExt};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::task::JoinHandle;

use crate::call::{CallHandle, CallId, RawCall};
use crate::error::CallError;
use crate::response::Response;
use crate::runtime;

/// Result of executing a call.
pub type CallResult<D> = Result<Response<D>, CallError>;

/// Converts a [`RawCall`] into the caller-facing representation.
///
/// `adapt` decides when (and whether) the call runs. Adapters hold no
/// per-call state and are shared by all calls of a client.
pub trait ResultAdapter: Send + Sync + 'static {
    /// What the caller receives for a call producing `D`.
    type Output<D: Send + 'static>;

    /// Wrap a freshly created call.
    fn adapt<D: Send + 'static>(&self, call: RawCall<D>) -> Self::Output<D>;
}

/// Returns the raw call unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawCallAdapter;

impl ResultAdapter for RawCallAdapter {
    type Output<D: Send + 'static> = RawCall<D>;

    fn adapt<D: Send + 'static>(&self, call: RawCall<D>) -> RawCall<D> {
        call
    }
}

/// Returns a lazy future; nothing is sent until it is polled.
#[derive(Debug, Clone, Copy, Default)]
pub struct FutureAdapter;

impl ResultAdapter for FutureAdapter {
    type Output<D: Send + 'static> = BoxFuture<'static, CallResult<D>>;

    fn adapt<D: Send + 'static>(&self, call: RawCall<D>) -> Self::Output<D> {
        call.execute().boxed()
    }
}

/// Returns a stream that yields the call's single result.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamAdapter;

impl ResultAdapter for StreamAdapter {
    type Output<D: Send + 'static> = BoxStream<'static, CallResult<D>>;

    fn adapt<D: Send + 'static>(&self, call: RawCall<D>) -> Self::Output<D> {
        stream::once(call.execute()).boxed()
    }
}

/// Starts the call in the background as soon as it is created.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpawnAdapter;

impl ResultAdapter for SpawnAdapter {
    type Output<D: Send + 'static> = SpawnedCall<D>;

    fn adapt<D: Send + 'static>(&self, call: RawCall<D>) -> SpawnedCall<D> {
        let handle = call.handle();
        let task = runtime::spawn(call.execute());
        SpawnedCall { handle, task }
    }
}

/// A call running in the background.
///
/// Await it for the result. Dropping it does not stop the call; use
/// [`cancel`](Self::cancel) for that.
pub struct SpawnedCall<D> {
    handle: CallHandle,
    task: JoinHandle<CallResult<D>>,
}

impl<D> SpawnedCall<D> {
    /// The call's id.
    pub fn id(&self) -> CallId {
        self.handle.id()
    }

    /// A handle to the running call.
    pub fn handle(&self) -> &CallHandle {
        &self.handle
    }

    /// Cancel the call. See [`CallHandle::cancel`].
    pub fn cancel(&self) -> bool {
        self.handle.cancel()
    }

    /// Check if the background task has finished.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl<D> Future for SpawnedCall<D> {
    type Output = CallResult<D>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.task)
            .poll(cx)
            .map(|joined| joined.unwrap_or_else(|e| Err(CallError::Task(e.to_string()))))
    }
}

impl<D> std::fmt::Debug for SpawnedCall<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpawnedCall")
            .field("handle", &self.handle)
            .field("finished", &self.task.is_finished())
            .finish()
    }
}

/// Executes the call synchronously and returns its result.
///
/// - Outside a tokio runtime the call runs to completion on the crate's
///   global runtime.
/// - On a multi-thread runtime worker the call runs in
///   [`block_in_place`](tokio::task::block_in_place), so the worker's other
///   tasks move to another thread while it waits.
/// - On a current-thread runtime the call is handed to the global runtime and
///   the calling thread waits for it. Called from one of that runtime's
///   tasks, nothing else on the runtime makes progress until the call
///   finishes; call from `spawn_blocking` or a plain thread instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockingAdapter;

impl ResultAdapter for BlockingAdapter {
    type Output<D: Send + 'static> = CallResult<D>;

    fn adapt<D: Send + 'static>(&self, call: RawCall<D>) -> CallResult<D> {
        let Ok(handle) = Handle::try_current() else {
            return runtime::block_on(call.execute());
        };

        if handle.runtime_flavor() != RuntimeFlavor::CurrentThread {
            return tokio::task::block_in_place(|| handle.block_on(call.execute()));
        }

        tracing::debug!(
            target: "horizon_graphql::call",
            id = %call.id(),
            "handing blocking call to the shared runtime"
        );
        let (tx, rx) = std::sync::mpsc::sync_channel(1);
        runtime::get().spawn(async move {
            let _ = tx.send(call.execute().await);
        });
        rx.recv()
            .unwrap_or_else(|_| Err(CallError::Task("call task dropped its result".into())))
    }
}
