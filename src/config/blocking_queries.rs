use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::READ_TIMEOUT_MARGIN_DIVISOR;
use crate::utils::time::format_consul_duration;
use crate::utils::time::parse_duration;
use crate::Error;
use crate::Result;

/// Tuning of Consul blocking queries
///
/// The max wait is kept in Consul's duration notation (`10m`, `30s`) because it
/// is forwarded verbatim as the `wait` query parameter.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BlockingQueriesConfig {
    /// Longest time Consul may hold a blocking query open
    #[serde(default = "default_max_wait_duration")]
    pub max_wait_duration: String,

    /// Pause before each query, avoids flooding Consul when values change quickly
    #[serde(default = "default_delay_duration_in_ms")]
    pub delay_duration_in_ms: u64,
}

impl Default for BlockingQueriesConfig {
    fn default() -> Self {
        Self {
            max_wait_duration: default_max_wait_duration(),
            delay_duration_in_ms: default_delay_duration_in_ms(),
        }
    }
}

impl BlockingQueriesConfig {
    pub fn validate(&self) -> Result<()> {
        let max_wait = self.max_wait()?;
        if max_wait.is_zero() {
            return Err(Error::Config(ConfigError::Message(
                "blocking_queries.max_wait_duration must be greater than 0".into(),
            )));
        }

        if self.delay_duration_in_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "blocking_queries.delay_duration_in_ms must be at least 1ms".into(),
            )));
        }

        Ok(())
    }

    pub fn max_wait(&self) -> Result<Duration> {
        parse_duration(&self.max_wait_duration).ok_or_else(|| {
            Error::Config(ConfigError::Message(format!(
                "blocking_queries.max_wait_duration is not a duration: {}",
                self.max_wait_duration
            )))
        })
    }

    /// Max wait as sent in the `wait` query parameter
    ///
    /// The configured text is parsed and re-formatted, so looser spellings
    /// such as `600` or `10min` reach Consul as `600s`.
    pub fn wait_parameter(&self) -> Result<String> {
        Ok(format_consul_duration(self.max_wait()?))
    }

    /// Client read timeout, strictly greater than the server wait so a long-poll
    /// answered at the last moment is never cut by the client.
    pub fn read_timeout(&self) -> Result<Duration> {
        let max_wait = self.max_wait()?;
        Ok(max_wait + max_wait / READ_TIMEOUT_MARGIN_DIVISOR)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_duration_in_ms)
    }
}

fn default_max_wait_duration() -> String {
    "10m".to_string()
}
fn default_delay_duration_in_ms() -> u64 {
    50
}
