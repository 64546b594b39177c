use std::future::Future;

use crate::error::RestoreResult;
use crate::types::{LogReplicationRequest, LogReplicationResponse, MemberId};

/// Transport used to fetch chunks of a remote log from a cluster member.
///
/// Implementations complete with an error when the request could not be delivered
/// or the member failed to answer. A member that answers without events should
/// return an invalid [`LogReplicationResponse`] rather than an error.
pub trait RestoreClient {
    fn request_log_replication(
        &self,
        member: &MemberId,
        request: LogReplicationRequest,
    ) -> impl Future<Output = RestoreResult<LogReplicationResponse>> + Send;
}
