use std::fmt;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::CONSUL_PATH_SEPARATOR;
use crate::constants::DEFAULT_PATH;
use crate::Error;
use crate::Result;

/// Consul agent location and the layout of the configuration stored in its KV
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ConsulConfig {
    /// `http` or `https`
    #[serde(default = "default_scheme")]
    pub scheme: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Application name, used for the application-specific configuration path
    #[serde(default)]
    pub service_id: String,

    /// Where and how the configuration is laid out in the KV store
    #[serde(default)]
    pub config: ConfigDiscoveryConfig,
}

impl Default for ConsulConfig {
    fn default() -> Self {
        Self {
            scheme: default_scheme(),
            host: default_host(),
            port: default_port(),
            service_id: String::new(),
            config: ConfigDiscoveryConfig::default(),
        }
    }
}

impl ConsulConfig {
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Config(ConfigError::Message("consul.host cannot be empty".into())));
        }

        if self.port == 0 {
            return Err(Error::Config(ConfigError::Message("consul.port must be greater than 0".into())));
        }

        if self.scheme != "http" && self.scheme != "https" {
            return Err(Error::Config(ConfigError::Message(format!(
                "consul.scheme must be http or https, got {}",
                self.scheme
            ))));
        }

        Ok(())
    }

    /// Base URL of the agent HTTP API, e.g. `http://localhost:8500`
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }

    /// Configured KV base path, always ending with `/`
    pub fn configuration_path(&self) -> String {
        let path = self.config.path.trim();
        if path.is_empty() {
            return DEFAULT_PATH.to_string();
        }

        let mut path = path.to_string();
        if !path.ends_with(CONSUL_PATH_SEPARATOR) {
            path.push(CONSUL_PATH_SEPARATOR);
        }
        path
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ConfigDiscoveryConfig {
    /// KV base path holding the configurations
    #[serde(default = "default_path")]
    pub path: String,

    #[serde(default)]
    pub format: ConfigFormat,
}

impl Default for ConfigDiscoveryConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            format: ConfigFormat::default(),
        }
    }
}

/// How configurations are stored in the KV store
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConfigFormat {
    /// One KV entry per property under the configuration prefix
    Native,
    /// One JSON document per configuration
    Json,
    /// One YAML document per configuration
    #[default]
    Yaml,
    /// One `.properties` document per configuration
    Properties,
    /// Configuration files referenced from the KV store; not watchable
    File,
}

impl fmt::Display for ConfigFormat {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let name = match self {
            ConfigFormat::Native => "native",
            ConfigFormat::Json => "json",
            ConfigFormat::Yaml => "yaml",
            ConfigFormat::Properties => "properties",
            ConfigFormat::File => "file",
        };
        f.write_str(name)
    }
}

fn default_scheme() -> String {
    "http".to_string()
}
fn default_host() -> String {
    "localhost".to_string()
}
fn default_port() -> u16 {
    8500
}
fn default_path() -> String {
    DEFAULT_PATH.to_string()
}
