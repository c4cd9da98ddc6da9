//! Runtime management for calls driven outside an async context.
//!
//! [`BlockingAdapter`](crate::BlockingAdapter) and
//! [`SpawnAdapter`](crate::SpawnAdapter) need somewhere to run the call's
//! future. When the caller is already inside a tokio runtime its handle is
//! used; otherwise calls run on a global multi-thread runtime created on first
//! use.

use std::future::Future;
use std::sync::OnceLock;

use tokio::runtime::{Handle, Runtime};

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Initialize the global runtime.
///
/// Optional: the runtime is created lazily on first use.
pub fn init() -> &'static Runtime {
    RUNTIME.get_or_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("horizon-graphql")
            .enable_all()
            .build()
            .expect("Failed to create tokio runtime")
    })
}

/// Get a reference to the global runtime.
pub fn get() -> &'static Runtime {
    init()
}

/// Block on a future using the global runtime.
///
/// # Warning
///
/// Do not call this from within an async context; tokio panics when a
/// runtime is blocked on from one of its own worker threads.
pub fn block_on<F: Future>(future: F) -> F::Output {
    get().block_on(future)
}

/// Spawn a future on the current runtime, or on the global runtime when
/// called from outside any runtime.
pub fn spawn<F>(future: F) -> tokio::task::JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    match Handle::try_current() {
        Ok(handle) => handle.spawn(future),
        Err(_) => get().spawn(future),
    }
}
