use std::path::Path;

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::environment::Environment;

/// Directory, relative to the working directory, holding the configuration files.
const CONFIGURATION_DIR: &str = "configuration";

/// File loaded for every environment before the environment-specific one.
const BASE_CONFIG_FILE: &str = "base.yaml";

/// Prefix of environment variable overrides, e.g. `APP_PARTITION_ID=3`.
const ENV_PREFIX: &str = "APP";
const ENV_PREFIX_SEPARATOR: &str = "_";

/// Separator for nested keys: `APP_REPLICATOR__PARTITION_ID` sets `replicator.partition_id`.
const ENV_SEPARATOR: &str = "__";

/// Errors returned while assembling a configuration.
#[derive(Debug, Error)]
pub enum LoadConfigError {
    #[error("could not determine the current directory: {0}")]
    CurrentDir(#[source] std::io::Error),

    #[error("could not determine the runtime environment: {0}")]
    Environment(#[source] std::io::Error),

    #[error("could not build the configuration: {0}")]
    Config(#[from] config::ConfigError),
}

/// Loads `T` from `./configuration` for the environment named by `APP_ENVIRONMENT`.
///
/// Sources are layered in this order, later ones overriding earlier ones:
/// 1. `configuration/base.yaml`
/// 2. `configuration/{environment}.yaml`
/// 3. environment variables prefixed with `APP_`
pub fn load_config<T>() -> Result<T, LoadConfigError>
where
    T: DeserializeOwned,
{
    let base_path = std::env::current_dir().map_err(LoadConfigError::CurrentDir)?;
    let environment = Environment::load().map_err(LoadConfigError::Environment)?;

    load_config_from(&base_path.join(CONFIGURATION_DIR), environment)
}

/// Loads `T` from an explicit configuration directory and environment.
pub fn load_config_from<T>(directory: &Path, environment: Environment) -> Result<T, LoadConfigError>
where
    T: DeserializeOwned,
{
    let environment_source = config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_PREFIX_SEPARATOR)
        .separator(ENV_SEPARATOR);

    let settings = config::Config::builder()
        .add_source(config::File::from(directory.join(BASE_CONFIG_FILE)))
        .add_source(
            config::File::from(directory.join(format!("{environment}.yaml"))).required(false),
        )
        .add_source(environment_source)
        .build()?;

    Ok(settings.try_deserialize::<T>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::ReplicatorConfig;

    #[test]
    fn environment_file_overrides_base_file() {
        let directory = std::env::temp_dir().join(format!(
            "restore-config-test-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&directory).unwrap();
        std::fs::write(
            directory.join(BASE_CONFIG_FILE),
            "partition_id: 1\nmax_concurrent_sessions: 2\n",
        )
        .unwrap();
        std::fs::write(directory.join("dev.yaml"), "partition_id: 7\n").unwrap();

        let config: ReplicatorConfig = load_config_from(&directory, Environment::Dev).unwrap();
        assert_eq!(config.partition_id, 7);
        assert_eq!(config.max_concurrent_sessions, 2);

        // A missing environment file is not an error.
        let config: ReplicatorConfig = load_config_from(&directory, Environment::Staging).unwrap();
        assert_eq!(config.partition_id, 1);

        std::fs::remove_dir_all(&directory).unwrap();
    }

    #[test]
    fn missing_base_file_is_an_error() {
        let directory = std::env::temp_dir().join("restore-config-test-missing-base");

        let result: Result<ReplicatorConfig, _> = load_config_from(&directory, Environment::Dev);
        assert!(matches!(result, Err(LoadConfigError::Config(_))));
    }
}
