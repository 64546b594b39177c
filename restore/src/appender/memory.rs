use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::appender::LogReplicationAppender;
use crate::error::RestoreResult;
use crate::types::LogPosition;

#[derive(Debug, Default)]
struct Inner {
    chunks: Vec<(LogPosition, Bytes)>,
}

/// Appender keeping every accepted chunk in memory.
///
/// Chunks that carry no events or that do not move the log forward are rejected
/// with a result of `0`.
#[derive(Debug, Clone, Default)]
pub struct MemoryLogAppender {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryLogAppender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the accepted chunks in append order.
    pub async fn chunks(&self) -> Vec<(LogPosition, Bytes)> {
        self.inner.lock().await.chunks.clone()
    }

    pub async fn last_position(&self) -> Option<LogPosition> {
        self.inner
            .lock()
            .await
            .chunks
            .last()
            .map(|(position, _)| *position)
    }

    /// Returns all accepted events concatenated.
    pub async fn events(&self) -> Vec<u8> {
        let inner = self.inner.lock().await;
        inner
            .chunks
            .iter()
            .flat_map(|(_, events)| events.iter().copied())
            .collect()
    }
}

impl LogReplicationAppender for MemoryLogAppender {
    async fn append(&self, to_position: LogPosition, serialized_events: Bytes) -> RestoreResult<i64> {
        let mut inner = self.inner.lock().await;

        if serialized_events.is_empty() {
            debug!(%to_position, "rejecting empty chunk");
            return Ok(0);
        }

        if let Some((last_position, _)) = inner.chunks.last()
            && *last_position >= to_position
        {
            debug!(%to_position, %last_position, "rejecting chunk that does not advance the log");
            return Ok(0);
        }

        let written = serialized_events.len() as i64;
        debug!(%to_position, written, "appending chunk");
        inner.chunks.push((to_position, serialized_events));

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn accepted_chunks_are_kept_in_order() {
        let appender = MemoryLogAppender::new();

        assert_eq!(
            appender
                .append(LogPosition::new(10), Bytes::from_static(b"ab"))
                .await
                .unwrap(),
            2
        );
        assert_eq!(
            appender
                .append(LogPosition::new(20), Bytes::from_static(b"cde"))
                .await
                .unwrap(),
            3
        );

        assert_eq!(appender.last_position().await, Some(LogPosition::new(20)));
        assert_eq!(appender.events().await, b"abcde");
        assert_eq!(appender.chunks().await.len(), 2);
    }

    #[tokio::test]
    async fn empty_or_backwards_chunks_are_rejected() {
        let appender = MemoryLogAppender::new();
        appender
            .append(LogPosition::new(10), Bytes::from_static(b"a"))
            .await
            .unwrap();

        assert_eq!(
            appender
                .append(LogPosition::new(11), Bytes::new())
                .await
                .unwrap(),
            0
        );
        assert_eq!(
            appender
                .append(LogPosition::new(10), Bytes::from_static(b"b"))
                .await
                .unwrap(),
            0
        );
        assert_eq!(appender.chunks().await.len(), 1);
    }
}
