//! Paginated log replication for restoring a partition from a remote member.
//!
//! The entry point is [`replication::replicator::LogReplicator`], which pulls
//! chunks of a remote log through a [`client::RestoreClient`] and writes them
//! through a [`appender::LogReplicationAppender`] until the requested range has
//! been restored.

pub mod appender;
pub mod buffer;
pub mod client;
pub mod concurrency;
pub mod error;
#[cfg(feature = "failpoints")]
pub mod failpoints;
mod macros;
pub mod replication;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;
