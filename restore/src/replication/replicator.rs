use bytes::Bytes;
use core::pin::Pin;
use core::task::{Context, Poll};
use futures::future::BoxFuture;
use futures::{Future, FutureExt, ready};
use pin_project_lite::pin_project;
use restore_config::shared::{ReplicatorConfig, ValidationError};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{Instrument, Span, debug, error, info, info_span};

use crate::appender::LogReplicationAppender;
use crate::client::RestoreClient;
use crate::concurrency::completion::{CompletionRx, CompletionTx, create_completion};
use crate::concurrency::executor::Executor;
use crate::error::{RestoreError, RestoreResult};
#[cfg(feature = "failpoints")]
use crate::failpoints::{REPLICATOR__BEFORE_APPEND, restore_fail_point};
use crate::types::{
    LogPosition, LogReplicationRequest, LogReplicationResponse, MemberId, PartitionId,
    ReplicationRange,
};

/// Terminal failure of a replication session.
#[derive(Debug, Error)]
pub enum ReplicationError {
    #[error(
        "Failed to request events {request} of partition {partition_id} from member {member}: {source}"
    )]
    Transport {
        partition_id: PartitionId,
        member: MemberId,
        request: LogReplicationRequest,
        #[source]
        source: RestoreError,
    },

    #[error("Member {member} returned an invalid response to request {request}")]
    InvalidResponse {
        member: MemberId,
        request: LogReplicationRequest,
        response: LogReplicationResponse,
    },

    #[error(
        "Failed to append events ({from}, {to}] of partition {partition_id} replicated from member {member}, append result {append_result}"
    )]
    FailedAppend {
        partition_id: PartitionId,
        member: MemberId,
        from: LogPosition,
        to: LogPosition,
        append_result: i64,
    },

    #[error("An error occurred while appending events ({from}, {to}] of partition {partition_id}: {source}")]
    Append {
        partition_id: PartitionId,
        from: LogPosition,
        to: LogPosition,
        #[source]
        source: RestoreError,
    },

    #[error("The replication session ended without a result")]
    SessionAbandoned,
}

type ReplicationResult = Result<LogPosition, ReplicationError>;

pin_project! {
    /// Outcome of a replication session started with [`LogReplicator::replicate`].
    ///
    /// Resolves to the highest position appended, or to the error that stopped the
    /// session. Dropping the future cancels the session before its next request.
    #[must_use = "futures do nothing unless polled"]
    #[derive(Debug)]
    pub struct ReplicationFuture {
        #[pin]
        rx: CompletionRx<ReplicationResult>,
    }
}

impl Future for ReplicationFuture {
    type Output = ReplicationResult;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let result = ready!(this.rx.poll(cx));

        Poll::Ready(result.unwrap_or(Err(ReplicationError::SessionAbandoned)))
    }
}

/// Restores a range of a partition log by pulling it chunk by chunk from a member.
///
/// Each call to [`LogReplicator::replicate`] starts an independent session. A session
/// sends one request at a time through the [`RestoreClient`], appends every valid
/// response through the [`LogReplicationAppender`] and keeps requesting until the
/// member reports no more events or the end of the range has been reached. Every
/// request after the first runs as a new task on the [`Executor`].
#[derive(Debug)]
pub struct LogReplicator<A, C, E> {
    partition_id: PartitionId,
    appender: Arc<A>,
    client: Arc<C>,
    executor: Arc<E>,
    session_permits: Option<Arc<Semaphore>>,
}

impl<A, C, E> LogReplicator<A, C, E>
where
    A: LogReplicationAppender + Send + Sync + 'static,
    C: RestoreClient + Send + Sync + 'static,
    E: Executor,
{
    /// Creates a replicator which runs any number of sessions at the same time.
    pub fn new(partition_id: PartitionId, appender: A, client: C, executor: E) -> Self {
        Self {
            partition_id,
            appender: Arc::new(appender),
            client: Arc::new(client),
            executor: Arc::new(executor),
            session_permits: None,
        }
    }

    /// Creates a replicator from its configuration.
    ///
    /// At most `max_concurrent_sessions` sessions exchange chunks at the same time; the
    /// others wait before sending their first request.
    pub fn from_config(
        config: &ReplicatorConfig,
        appender: A,
        client: C,
        executor: E,
    ) -> Result<Self, ValidationError> {
        config.validate()?;

        let mut replicator = Self::new(config.partition_id, appender, client, executor);
        replicator.session_permits = Some(Arc::new(Semaphore::new(
            config.max_concurrent_sessions as usize,
        )));

        Ok(replicator)
    }

    pub fn partition_id(&self) -> PartitionId {
        self.partition_id
    }

    /// Returns the number of sessions that could start right away, or `None` when
    /// sessions are not limited.
    pub fn available_sessions(&self) -> Option<usize> {
        self.session_permits
            .as_ref()
            .map(|permits| permits.available_permits())
    }

    /// Replicates the events after `from` up to `to` from `member`.
    pub fn replicate(
        &self,
        member: MemberId,
        from: LogPosition,
        to: LogPosition,
    ) -> ReplicationFuture {
        self.replicate_with(member, from, to, false)
    }

    /// Replicates the events from `from` up to `to` from `member`.
    ///
    /// With `include_from_position` the event at `from` is requested as well. The
    /// session starts on the executor, this method never waits.
    pub fn replicate_with(
        &self,
        member: MemberId,
        from: LogPosition,
        to: LogPosition,
        include_from_position: bool,
    ) -> ReplicationFuture {
        let (tx, rx) = create_completion();

        let partition_id = self.partition_id;
        let span = info_span!("log_replication", partition_id, member = %member);
        span.in_scope(|| info!(%from, %to, include_from_position, "starting log replication"));

        let session = ReplicationSession {
            partition_id,
            member,
            appender: self.appender.clone(),
            client: self.client.clone(),
            executor: self.executor.clone(),
            session_permits: self.session_permits.clone(),
            permit: None,
            result: tx,
            span,
        };
        session.schedule(
            ReplicationRange::new(from, to).with_include_from_position(include_from_position),
        );

        ReplicationFuture { rx }
    }
}

/// State of one replication session, moved from step to step.
struct ReplicationSession<A, C, E> {
    partition_id: PartitionId,
    member: MemberId,
    appender: Arc<A>,
    client: Arc<C>,
    executor: Arc<E>,
    session_permits: Option<Arc<Semaphore>>,
    permit: Option<OwnedSemaphorePermit>,
    result: CompletionTx<ReplicationResult>,
    span: Span,
}

impl<A, C, E> ReplicationSession<A, C, E>
where
    A: LogReplicationAppender + Send + Sync + 'static,
    C: RestoreClient + Send + Sync + 'static,
    E: Executor,
{
    fn schedule(self, range: ReplicationRange) {
        let executor = self.executor.clone();
        executor.execute(self.step(range));
    }

    fn step(mut self, range: ReplicationRange) -> BoxFuture<'static, ()> {
        let span = self.span.clone();

        async move {
            if self.result.is_cancelled() {
                debug!(from = %range.from(), "replication cancelled before requesting events");
                return;
            }

            if self.permit.is_none()
                && let Some(permits) = &self.session_permits
            {
                debug!("waiting for a free replication session");
                // The semaphore is never closed.
                self.permit = permits.clone().acquire_owned().await.ok();

                if self.result.is_cancelled() {
                    debug!("replication cancelled while waiting for a free session");
                    return;
                }
            }

            let request = LogReplicationRequest::from(range);
            debug!(%request, "requesting events");

            let response = match self
                .client
                .request_log_replication(&self.member, request)
                .await
            {
                Ok(response) => response,
                Err(err) => {
                    error!(%request, error = %err, "error replicating events");
                    self.result.complete(Err(ReplicationError::Transport {
                        partition_id: self.partition_id,
                        member: self.member.clone(),
                        request,
                        source: err,
                    }));
                    return;
                }
            };

            if !response.is_valid() {
                debug!(%request, "received invalid response {response:#?}");
                self.result.complete(Err(ReplicationError::InvalidResponse {
                    member: self.member.clone(),
                    request,
                    response,
                }));
                return;
            }

            let to_position = response.to_position();
            if let Err(err) = self
                .append_events(range, to_position, response.serialized_events().clone())
                .await
            {
                self.result.complete(Err(err));
                return;
            }

            if to_position < range.to() && response.has_more_available() {
                self.schedule(range.continue_from(to_position));
            } else {
                info!(%to_position, "log replication completed");
                self.result.complete(Ok(to_position));
            }
        }
        .instrument(span)
        .boxed()
    }

    async fn append_events(
        &self,
        range: ReplicationRange,
        to_position: LogPosition,
        serialized_events: Bytes,
    ) -> Result<(), ReplicationError> {
        let events_len = serialized_events.len();

        match self.append(to_position, serialized_events).await {
            Ok(append_result) if append_result > 0 => {
                debug!(%to_position, events_len, append_result, "appended events");
                Ok(())
            }
            Ok(append_result) => {
                error!(
                    from = %range.from(),
                    to = %range.to(),
                    append_result,
                    "failed to append events"
                );
                Err(ReplicationError::FailedAppend {
                    partition_id: self.partition_id,
                    member: self.member.clone(),
                    from: range.from(),
                    to: range.to(),
                    append_result,
                })
            }
            Err(err) => {
                error!(
                    from = %range.from(),
                    to = %range.to(),
                    error = %err,
                    "error while appending events"
                );
                Err(ReplicationError::Append {
                    partition_id: self.partition_id,
                    from: range.from(),
                    to: range.to(),
                    source: err,
                })
            }
        }
    }

    async fn append(&self, to_position: LogPosition, serialized_events: Bytes) -> RestoreResult<i64> {
        #[cfg(feature = "failpoints")]
        restore_fail_point(REPLICATOR__BEFORE_APPEND)?;

        self.appender.append(to_position, serialized_events).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appender::memory::MemoryLogAppender;
    use crate::concurrency::executor::TokioExecutor;
    use crate::test_utils::client::ScriptedRestoreClient;

    fn position(value: i64) -> LogPosition {
        LogPosition::new(value)
    }

    #[tokio::test]
    async fn single_chunk_covering_the_range_completes() {
        let client = ScriptedRestoreClient::new();
        client
            .push_response(LogReplicationResponse::new(position(20), &b"events"[..], false))
            .await;

        let appender = MemoryLogAppender::new();
        let replicator = LogReplicator::new(
            1,
            appender.clone(),
            client.clone(),
            TokioExecutor::current(),
        );

        let result = replicator
            .replicate(MemberId::from("member-1"), position(10), position(20))
            .await;

        assert_eq!(result.unwrap(), position(20));
        assert_eq!(appender.events().await, b"events");
        assert_eq!(client.requests().await.len(), 1);
    }

    #[test]
    fn errors_describe_their_context() {
        let request = LogReplicationRequest::from(ReplicationRange::new(position(1), position(5)));

        let err = ReplicationError::FailedAppend {
            partition_id: 3,
            member: MemberId::from("m"),
            from: position(1),
            to: position(5),
            append_result: -1,
        };
        assert_eq!(
            err.to_string(),
            "Failed to append events (1, 5] of partition 3 replicated from member m, append result -1"
        );

        let err = ReplicationError::InvalidResponse {
            member: MemberId::from("m"),
            request,
            response: LogReplicationResponse::empty(),
        };
        assert_eq!(
            err.to_string(),
            "Member m returned an invalid response to request (1, 5]"
        );
    }
}
