//! Shared helpers for replication session tests.

use restore::appender::memory::MemoryLogAppender;
use restore::test_utils::appender::TestAppenderWrapper;
use restore::test_utils::client::ScriptedRestoreClient;
use restore::types::{LogPosition, LogReplicationResponse, MemberId};

pub fn position(value: i64) -> LogPosition {
    LogPosition::new(value)
}

pub fn member() -> MemberId {
    MemberId::from("member-1")
}

/// Builds a valid response whose events spell out the position it ends at.
pub fn chunk(to_position: i64, more_available: bool) -> LogReplicationResponse {
    LogReplicationResponse::new(
        position(to_position),
        format!("events-up-to-{to_position};").into_bytes(),
        more_available,
    )
}

pub async fn scripted_client(responses: Vec<LogReplicationResponse>) -> ScriptedRestoreClient {
    let client = ScriptedRestoreClient::new();
    for response in responses {
        client.push_response(response).await;
    }

    client
}

pub fn memory_appender() -> TestAppenderWrapper<MemoryLogAppender> {
    TestAppenderWrapper::wrap(MemoryLogAppender::new())
}
