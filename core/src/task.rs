use std::future::Future;

use tokio::{runtime::Handle, task::JoinHandle};

/// The execution context a cursor runs its asynchronous sub-computations on.
///
/// Pipelined operators spawn their in-flight work here; a cursor chain shares
/// one executor so that a caller can pin all of it to a given runtime.
#[derive(Debug, Clone, Default)]
pub struct Executor {
    handle: Option<Handle>,
}

impl Executor {
    /// Capture the runtime of the calling task, if any
    pub fn current() -> Self { Self { handle: Handle::try_current().ok() } }

    pub fn with_handle(handle: Handle) -> Self { Self { handle: Some(handle) } }

    /// Spawn a task
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        match &self.handle {
            Some(handle) => handle.spawn(future),
            None => tokio::spawn(future),
        }
    }
}
