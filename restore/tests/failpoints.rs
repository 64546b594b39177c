#![cfg(feature = "failpoints")]

use fail::FailScenario;
use restore::concurrency::executor::TokioExecutor;
use restore::error::ErrorKind;
use restore::failpoints::REPLICATOR__BEFORE_APPEND;
use restore::replication::replicator::{LogReplicator, ReplicationError};
use restore_telemetry::init_test_tracing;

use crate::common::{chunk, member, memory_appender, position, scripted_client};

mod common;

#[tokio::test]
async fn failing_before_append_stops_replication() {
    let _scenario = FailScenario::setup();
    fail::cfg(REPLICATOR__BEFORE_APPEND, "return(disk full)").unwrap();

    init_test_tracing();

    let client = scripted_client(vec![chunk(300, true), chunk(500, false)]).await;
    let appender = memory_appender();
    let replicator = LogReplicator::new(1, appender.clone(), client.clone(), TokioExecutor::current());

    let err = replicator
        .replicate(member(), position(100), position(500))
        .await
        .unwrap_err();

    match err {
        ReplicationError::Append { source, .. } => {
            assert_eq!(source.kind(), ErrorKind::FailpointTriggered);
            assert!(source.detail().unwrap().contains("disk full"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(appender.appends().await.is_empty());
    assert_eq!(client.requests().await.len(), 1);
}

#[tokio::test]
async fn panicking_before_append_abandons_the_session() {
    let _scenario = FailScenario::setup();
    fail::cfg(REPLICATOR__BEFORE_APPEND, "panic").unwrap();

    init_test_tracing();

    let client = scripted_client(vec![chunk(300, true), chunk(500, false)]).await;
    let replicator = LogReplicator::new(1, memory_appender(), client, TokioExecutor::current());

    let err = replicator
        .replicate(member(), position(100), position(500))
        .await
        .unwrap_err();

    assert!(matches!(err, ReplicationError::SessionAbandoned));
}
