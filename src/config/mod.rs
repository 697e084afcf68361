//! Configuration management for the cluster harness.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support
//! - Environment variable overrides
//! - Component-wise validation
mod cluster;
mod network;
mod retry;
pub use cluster::*;
pub use network::*;
pub use retry::*;


use std::env;

use config::Config;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Environment variable naming an optional configuration file
pub const CONFIG_PATH_ENV: &str = "REDIS_CLUSTER_CONFIG";

/// Prefix of environment overrides, e.g. `REDIS_CLUSTER__CLUSTER__SERVER_BINARY`
pub const ENV_PREFIX: &str = "REDIS_CLUSTER";

/// Main configuration container for the harness
///
/// Combines all subsystem configurations with hierarchical override support:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `REDIS_CLUSTER_CONFIG`
/// 3. Environment variables (highest priority)
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct HarnessConfig {
    /// Server binary, bind host and working directory settings
    #[serde(default)]
    pub cluster: ClusterConfig,
    /// Control connection timeouts
    #[serde(default)]
    pub network: NetworkConfig,
    /// Bounded polling policies for startup, replication and convergence
    #[serde(default)]
    pub retry: RetryPolicies,
}

impl HarnessConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Sources are merged in order (later sources override earlier):
    /// 1. Type defaults
    /// 2. File named by `REDIS_CLUSTER_CONFIG` (if set)
    /// 3. Environment variables with `REDIS_CLUSTER__` prefix
    ///
    /// Callers must call `validate()` once all overrides are applied.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("REDIS_CLUSTER__CLUSTER__SERVER_BINARY", "/opt/redis/bin/redis-server");
    /// let cfg = HarnessConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var(CONFIG_PATH_ENV) {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(environment_source());

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies additional overrides from a file without validation.
    ///
    /// Merging order (later sources override earlier):
    /// 1. Current configuration values
    /// 2. New configuration file
    /// 3. Latest environment variables
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(environment_source())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates every section and returns the validated instance.
    pub fn validate(self) -> Result<Self> {
        self.cluster.validate()?;
        self.network.validate()?;
        self.retry.validate()?;
        Ok(self)
    }
}

fn environment_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
}

pub(super) fn invalid(message: String) -> Error {
    Error::Config(ConfigError::Message(message))
}
