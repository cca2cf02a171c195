//! Configuration management for the cluster watcher.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support
//! - Environment variable overrides (`CLUSTER_WATCH__SECTION__FIELD`)
mod coordinator;
mod discovery;
mod retry;
pub use coordinator::*;
pub use discovery::*;
pub use retry::*;


use std::env;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

pub(crate) const ENV_PREFIX: &str = "CLUSTER_WATCH";

/// Main configuration container
///
/// Sources are merged in the following order (later sources override earlier):
/// 1. Default values from code
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables (highest priority)
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Settings {
    /// Coordination-service session and path layout
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
    /// Session bootstrap backoff
    #[serde(default)]
    pub retry: BackoffPolicy,
    /// Named-service lookup
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

impl Settings {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Callers must call [`Settings::validate`] once all overrides are applied.
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(env_source());

        let settings: Self = builder.build()?.try_deserialize()?;
        Ok(settings)
    }

    /// Applies additional overrides from file without validation.
    ///
    /// Merging order: current values, then the file, then environment variables.
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let settings: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(env_source())
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Validates every section and returns the validated instance.
    pub fn validate(self) -> Result<Self> {
        self.coordinator.validate()?;
        self.retry.validate()?;
        self.discovery.validate()?;
        Ok(self)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
}
