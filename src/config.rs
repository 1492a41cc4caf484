//! Configuration for the query service and its loaders.
//!
//! Values come from three layers, later ones overriding earlier ones:
//! 1. Defaults (hardcoded)
//! 2. An optional YAML file
//! 3. Environment variables prefixed with `GRAPHLOAD_`, using `__` for nesting
//!    (`GRAPHLOAD_LOADER__MAX_BATCH_SIZE=100` sets `loader.max_batch_size`)

use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tokio::runtime::{Handle, RuntimeFlavor};

/// Top level configuration of a [`crate::GraphService`].
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct GraphConfig {
    /// Queries nested deeper than this are rejected before any resolver runs.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    #[serde(default)]
    pub loader: LoaderConfig,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self { max_depth: default_max_depth(), loader: LoaderConfig::default() }
    }
}

fn default_max_depth() -> usize {
    5
}

/// Tuning shared by every loader of a request.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Extra time a worker waits after the first request of a frame before flushing. Zero flushes
    /// as soon as the requesting tasks stop enqueueing. Unset means zero on a current-thread
    /// runtime and [`MULTI_THREAD_BATCH_DELAY`] on a multi-thread one.
    #[serde(default)]
    pub batch_delay_ms: Option<u64>,

    /// Upper bound on keys per bulk fetch. Unset means one bulk fetch per flush.
    #[serde(default)]
    pub max_batch_size: Option<usize>,
}

/// Default batch delay when loaders run on a multi-thread runtime, where the resolvers feeding a
/// frame resume on other worker threads.
pub const MULTI_THREAD_BATCH_DELAY: Duration = Duration::from_millis(1);

impl LoaderConfig {
    pub fn batch_delay(&self) -> Option<Duration> {
        match self.batch_delay_ms {
            Some(0) => None,
            Some(ms) => Some(Duration::from_millis(ms)),
            None => runtime_batch_delay(),
        }
    }
}

fn runtime_batch_delay() -> Option<Duration> {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            Some(MULTI_THREAD_BATCH_DELAY)
        }
        _ => None,
    }
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl GraphConfig {
    /// Loads configuration from a YAML file with environment variable overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound { path: path.display().to_string() });
        }

        let config = Config::builder()
            .add_source(Config::try_from(&GraphConfig::default())?)
            .add_source(File::from(path).format(FileFormat::Yaml))
            .add_source(environment())
            .build()?;

        let graph_config: GraphConfig = config.try_deserialize()?;
        graph_config.validate()?;
        Ok(graph_config)
    }

    /// Loads configuration from defaults and `GRAPHLOAD_` environment variables only.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(Config::try_from(&GraphConfig::default())?)
            .add_source(environment())
            .build()?;

        let graph_config: GraphConfig = config.try_deserialize()?;
        graph_config.validate()?;
        Ok(graph_config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::Invalid {
                message: "max_depth must be greater than 0".to_string(),
            });
        }
        if self.loader.max_batch_size == Some(0) {
            return Err(ConfigError::Invalid {
                message: "loader.max_batch_size must be greater than 0 when set".to_string(),
            });
        }
        Ok(())
    }
}

fn environment() -> Environment {
    Environment::with_prefix("GRAPHLOAD").prefix_separator("_").separator("__").try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = GraphConfig::default();
        assert_eq!(config.max_depth, 5);
        assert_eq!(config.loader.batch_delay_ms, None);
        assert_eq!(config.loader.batch_delay(), None);
        assert!(config.validate().is_ok());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn current_thread_runtime_flushes_without_delay() {
        assert_eq!(LoaderConfig::default().batch_delay(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn multi_thread_runtime_waits_by_default() {
        assert_eq!(LoaderConfig::default().batch_delay(), Some(MULTI_THREAD_BATCH_DELAY));
        let explicit = LoaderConfig { batch_delay_ms: Some(0), ..Default::default() };
        assert_eq!(explicit.batch_delay(), None);
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let config = GraphConfig {
            loader: LoaderConfig { max_batch_size: Some(0), ..Default::default() },
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = GraphConfig::load("/nonexistent/graphload.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: GraphConfig =
            serde_json::from_str(r#"{"loader": {"batch_delay_ms": 2}}"#).unwrap();
        assert_eq!(config.max_depth, 5);
        assert_eq!(config.loader.batch_delay(), Some(Duration::from_millis(2)));
        assert_eq!(config.loader.max_batch_size, None);
    }
}
