//! Configuration management for the Consul watcher.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support (`CONFIG_PATH`)
//! - Environment variable overrides (`CONSUL_WATCH__` prefix)
//! - Component-wise validation
mod blocking_queries;
mod consul;
mod watch;
pub use blocking_queries::*;
pub use consul::*;
pub use watch::*;


use std::env;
use std::fmt::Debug;
use std::path::Path;
use std::path::PathBuf;

use config::Config;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

const ENV_PREFIX: &str = "CONSUL_WATCH";

/// Main configuration container for the watcher process
///
/// Combines all subsystem configurations with hierarchical override support:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables (highest priority)
#[derive(Serialize, Deserialize, Clone)]
pub struct WatcherSettings {
    /// Consul agent location and configuration layout
    #[serde(default)]
    pub consul: ConsulConfig,

    /// Watch toggle
    #[serde(default)]
    pub watch: WatchConfig,

    /// Long-poll tuning
    #[serde(default)]
    pub blocking_queries: BlockingQueriesConfig,

    /// Active profile names, each one adds a `name,profile` path per configuration
    #[serde(default)]
    pub environments: Vec<String>,

    /// Directory receiving the process log file
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

impl Debug for WatcherSettings {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("WatcherSettings")
            .field("consul", &self.consul)
            .field("watch", &self.watch)
            .field("environments", &self.environments)
            .finish_non_exhaustive()
    }
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            consul: ConsulConfig::default(),
            watch: WatchConfig::default(),
            blocking_queries: BlockingQueriesConfig::default(),
            environments: Vec::new(),
            log_dir: default_log_dir(),
        }
    }
}

impl WatcherSettings {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Configuration sources are merged in the following order (later sources override earlier):
    /// 1. Type defaults (lowest priority)
    /// 2. Configuration file from `CONFIG_PATH` environment variable (if set)
    /// 3. Environment variables with `CONSUL_WATCH__` prefix (highest priority)
    ///
    /// # Note
    /// Validation is deferred so further overrides can be applied with
    /// `with_override_config()`. Callers MUST call `validate()` before use.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("CONFIG_PATH", "config/watcher.toml");
    /// std::env::set_var("CONSUL_WATCH__WATCH__ENABLED", "true");
    /// let cfg = WatcherSettings::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(env_source());

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies additional configuration overrides from file without validation.
    ///
    /// Merging order (later sources override earlier):
    /// 1. Current configuration values
    /// 2. New configuration file
    /// 3. Latest environment variables (highest priority)
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(env_source())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates configuration and returns the validated instance.
    ///
    /// # Errors
    /// - Empty Consul host or port 0
    /// - Missing service id while watching is enabled
    /// - Unparsable or zero max wait duration, zero delay
    /// - Empty log directory
    pub fn validate(self) -> Result<Self> {
        self.consul.validate()?;
        self.blocking_queries.validate()?;
        if self.watch.enabled && self.consul.service_id.trim().is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "consul.service_id is required when watching is enabled".into(),
            )));
        }
        if self.environments.iter().any(|name| name.trim().is_empty()) {
            return Err(Error::Config(ConfigError::Message(
                "environments cannot contain blank profile names".into(),
            )));
        }
        validate_directory(&self.log_dir, "log_dir")?;
        Ok(self)
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .ignore_empty(true)
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("environments")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("./logs")
}

/// Ensures directory path is valid and writable
pub(super) fn validate_directory(
    path: &Path,
    name: &str,
) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(Error::Config(ConfigError::Message(format!(
            "{name} path cannot be empty"
        ))));
    }

    #[cfg(not(test))]
    {
        use std::fs;
        if !path.exists() {
            fs::create_dir_all(path).map_err(|e| {
                Error::Config(ConfigError::Message(format!(
                    "Failed to create {} directory at {}: {}",
                    name,
                    path.display(),
                    e
                )))
            })?;
        }
    }

    Ok(())
}
