//! Consul Watcher Error Hierarchy
//!
//! Errors are grouped by the layer that raises them: configuration, the KV
//! long-poll transport, value decoding, change dispatching and the watcher
//! lifecycle itself.

use std::time::Duration;

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid or unsupported settings, raised before any polling starts
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Consul KV query failures
    #[error(transparent)]
    Kv(#[from] KvError),

    /// Watcher lifecycle misuse
    #[error(transparent)]
    Watch(#[from] WatchError),

    /// Raw value could not be turned into a property map
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Property source update or refresh publication failed
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Local I/O (log files)
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Unrecoverable failures requiring process termination
    #[error("Fatal error: {0}")]
    Fatal(String),
}

/// Outcome of a failed blocking query against `/v1/kv`.
///
/// The watch loop classifies these three ways: `NotFound` and everything
/// unclassified abandon the path, `ReadTimeout` re-polls with the same cursor.
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    /// The key or prefix does not exist (HTTP 404)
    #[error("No KV found for key {key}")]
    NotFound { key: String },

    /// The long-poll outlived the client read timeout without an answer
    #[error("Read timeout after {timeout:?} watching key {key}")]
    ReadTimeout { key: String, timeout: Duration },

    /// Any other non-success HTTP status
    #[error("Consul answered {status} for key {key}: {body}")]
    Status { key: String, status: u16, body: String },

    /// Connection or protocol failure below HTTP
    #[error("Transport failure watching key {key}: {source}")]
    Transport {
        key: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Body was not the JSON array Consul is expected to return
    #[error("Invalid KV response for key {key}: {reason}")]
    InvalidResponse { key: String, reason: String },
}

impl KvError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, KvError::NotFound { .. })
    }

    pub fn is_read_timeout(&self) -> bool {
        matches!(self, KvError::ReadTimeout { .. })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// `start` was called on a group that is already running
    #[error("Watcher is already started")]
    AlreadyStarted,
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Consul values are base64 encoded
    #[error("Value of key {key} is not valid base64")]
    Base64 {
        key: String,
        #[source]
        source: base64::DecodeError,
    },

    /// Native values are exposed as strings
    #[error("Value of key {key} is not valid UTF-8")]
    Utf8 {
        key: String,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("Invalid JSON document in {name}")]
    Json {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid YAML document in {name}")]
    Yaml {
        name: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid properties in {name} at line {line}: {reason}")]
    Properties { name: String, line: usize, reason: String },

    /// Structured documents must have a mapping at the top level
    #[error("Document {name} does not contain a mapping at its root")]
    NotAMapping { name: String },
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The property source store rejected the replacement
    #[error("Failed to update property source {name}: {reason}")]
    Store { name: String, reason: String },

    /// The refresh notification could not be delivered
    #[error("Failed to publish refresh event: {0}")]
    Publish(String),
}
