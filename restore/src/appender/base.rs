use bytes::Bytes;
use std::future::Future;

use crate::error::RestoreResult;
use crate::types::LogPosition;

/// Local sink that appends replicated events to the partition log.
pub trait LogReplicationAppender {
    /// Appends `serialized_events`, which end at `to_position`.
    ///
    /// Resolves to a strictly positive value when the events were written. Zero or a
    /// negative value means the append was rejected and nothing was written.
    fn append(
        &self,
        to_position: LogPosition,
        serialized_events: Bytes,
    ) -> impl Future<Output = RestoreResult<i64>> + Send;
}
