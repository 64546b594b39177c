use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Maximum concurrent replication sessions cannot be zero.
    #[error("`max_concurrent_sessions` cannot be zero")]
    MaxConcurrentSessionsZero,
}
