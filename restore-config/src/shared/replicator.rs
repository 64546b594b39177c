use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Configuration for the log replicator of a single partition.
///
/// Typically loaded from configuration files at startup through [`crate::load_config`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ReplicatorConfig {
    /// Identifier of the partition whose log is being restored.
    ///
    /// Only used as diagnostic context in logs and errors.
    pub partition_id: u32,
    /// Maximum number of replication sessions that may run at the same time.
    ///
    /// A session waits for a free slot before issuing its first request.
    #[serde(default = "default_max_concurrent_sessions")]
    pub max_concurrent_sessions: u16,
}

impl ReplicatorConfig {
    /// Validates the replicator configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_concurrent_sessions == 0 {
            return Err(ValidationError::MaxConcurrentSessionsZero);
        }

        Ok(())
    }
}

fn default_max_concurrent_sessions() -> u16 {
    4
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_yaml(yaml: &str) -> ReplicatorConfig {
        config::Config::builder()
            .add_source(config::File::from_str(yaml, config::FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn max_concurrent_sessions_defaults_when_missing() {
        let config = from_yaml("partition_id: 3");

        assert_eq!(config.partition_id, 3);
        assert_eq!(config.max_concurrent_sessions, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_concurrent_sessions_is_rejected() {
        let config = from_yaml("partition_id: 1\nmax_concurrent_sessions: 0");

        assert!(matches!(
            config.validate(),
            Err(ValidationError::MaxConcurrentSessionsZero)
        ));
    }
}
