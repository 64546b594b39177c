use futures::future::BoxFuture;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::concurrency::executor::{Executor, TokioExecutor};

/// [`TokioExecutor`] counting the tasks submitted to it.
#[derive(Debug)]
pub struct CountingExecutor {
    executor: TokioExecutor,
    executed: AtomicUsize,
}

impl CountingExecutor {
    pub fn current() -> Self {
        Self {
            executor: TokioExecutor::current(),
            executed: AtomicUsize::new(0),
        }
    }

    pub fn executed(&self) -> usize {
        self.executed.load(Ordering::SeqCst)
    }
}

impl Executor for CountingExecutor {
    fn execute(&self, task: BoxFuture<'static, ()>) {
        self.executed.fetch_add(1, Ordering::SeqCst);
        self.executor.execute(task);
    }
}
