//! Scriptable collaborators for testing replication sessions.

pub mod appender;
pub mod client;
pub mod executor;
