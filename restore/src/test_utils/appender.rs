use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::appender::LogReplicationAppender;
use crate::error::{RestoreError, RestoreResult};
use crate::types::LogPosition;

/// Outcome forced on a given append by a [`TestAppenderWrapper`].
#[derive(Debug, Clone)]
pub enum ScriptedAppend {
    Result(i64),
    Error(RestoreError),
    Panic,
}

#[derive(Default)]
struct Inner {
    scripted: HashMap<usize, ScriptedAppend>,
    appends: Vec<(LogPosition, Bytes)>,
}

/// Appender recording every append before delegating to the wrapped appender.
///
/// Individual appends, counted from zero, can be scripted to return a given result,
/// an error or to panic instead of reaching the wrapped appender.
#[derive(Clone)]
pub struct TestAppenderWrapper<A> {
    wrapped: A,
    inner: Arc<Mutex<Inner>>,
}

impl<A> TestAppenderWrapper<A> {
    pub fn wrap(appender: A) -> Self {
        Self {
            wrapped: appender,
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    pub async fn script(&self, index: usize, append: ScriptedAppend) {
        self.inner.lock().await.scripted.insert(index, append);
    }

    /// Returns every attempted append, including scripted ones.
    pub async fn appends(&self) -> Vec<(LogPosition, Bytes)> {
        self.inner.lock().await.appends.clone()
    }

    pub fn wrapped(&self) -> &A {
        &self.wrapped
    }
}

impl<A> LogReplicationAppender for TestAppenderWrapper<A>
where
    A: LogReplicationAppender + Send + Sync,
{
    async fn append(&self, to_position: LogPosition, serialized_events: Bytes) -> RestoreResult<i64> {
        let scripted = {
            let mut inner = self.inner.lock().await;
            let index = inner.appends.len();
            inner.appends.push((to_position, serialized_events.clone()));
            inner.scripted.remove(&index)
        };

        match scripted {
            Some(ScriptedAppend::Result(result)) => Ok(result),
            Some(ScriptedAppend::Error(error)) => Err(error),
            Some(ScriptedAppend::Panic) => panic!("scripted panic while appending up to {to_position}"),
            None => self.wrapped.append(to_position, serialized_events).await,
        }
    }
}
