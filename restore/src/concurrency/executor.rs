use futures::future::BoxFuture;
use std::sync::Arc;
use tokio::runtime::Handle;

/// Runs independent units of work submitted by the replication driver.
///
/// Every step of a replication session is submitted as its own task, so an
/// implementation must not run the task inline on the calling stack.
pub trait Executor: Send + Sync + 'static {
    fn execute(&self, task: BoxFuture<'static, ()>);
}

impl<E> Executor for Arc<E>
where
    E: Executor,
{
    fn execute(&self, task: BoxFuture<'static, ()>) {
        (**self).execute(task)
    }
}

/// [`Executor`] spawning tasks on a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: Handle,
}

impl TokioExecutor {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Creates an executor for the runtime the caller is running in.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

impl Executor for TokioExecutor {
    fn execute(&self, task: BoxFuture<'static, ()>) {
        // Detached: tasks report through their session.
        drop(self.handle.spawn(task));
    }
}
