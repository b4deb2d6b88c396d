//! Consul KV access for blocking queries.
//!
//! [`KvQuery`] is the only capability the watcher needs from Consul: read a key
//! (or a prefix) and, when an index is given, block until something newer than
//! that index exists or the server-side wait elapses. [`ConsulKvClient`] is the
//! HTTP implementation against the agent's `/v1/kv` endpoint.

mod consul_client;
mod kv_utils;
pub use consul_client::*;
pub use kv_utils::*;


use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
#[cfg(test)]
use mockall::automock;
use serde::Deserialize;
use serde::Serialize;

use crate::DecodeError;
use crate::KvError;

/// One entry of Consul's KV store as returned by `GET /v1/kv/{key}`
///
/// `value` is kept base64 encoded, exactly as Consul sends it; folders and
/// empty keys come back with a `null` value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeyValue {
    pub key: String,

    #[serde(default)]
    pub value: Option<String>,

    #[serde(default)]
    pub create_index: u64,

    #[serde(default)]
    pub modify_index: u64,

    #[serde(default)]
    pub lock_index: u64,

    #[serde(default)]
    pub flags: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
}

impl KeyValue {
    /// Builds an entry from a raw (not yet encoded) value
    pub fn new(
        key: impl Into<String>,
        raw_value: impl AsRef<[u8]>,
        modify_index: u64,
    ) -> Self {
        Self {
            key: key.into(),
            value: Some(STANDARD.encode(raw_value)),
            create_index: modify_index,
            modify_index,
            lock_index: 0,
            flags: 0,
            session: None,
        }
    }

    /// True when the entry carries no value (folder markers, empty keys)
    pub fn is_empty(&self) -> bool {
        self.value.as_deref().map(str::is_empty).unwrap_or(true)
    }

    /// Decodes the base64 value, `None` for empty entries
    pub fn decoded_value(&self) -> std::result::Result<Option<Vec<u8>>, DecodeError> {
        match self.value.as_deref() {
            None | Some("") => Ok(None),
            Some(encoded) => STANDARD.decode(encoded).map(Some).map_err(|source| DecodeError::Base64 {
                key: self.key.clone(),
                source,
            }),
        }
    }
}

/// Blocking KV reads against Consul
///
/// # Contract
/// - `index = None` returns the current state immediately
/// - `index = Some(i)` blocks server side until the data moves past `i` or the
///   configured max wait elapses, then returns the current state
/// - a missing key or prefix is reported as [`KvError::NotFound`], a client side
///   read timeout as [`KvError::ReadTimeout`]
#[cfg_attr(test, automock)]
#[async_trait]
pub trait KvQuery: Send + Sync + 'static {
    async fn watch_values(
        &self,
        key: &str,
        recurse: bool,
        index: Option<u64>,
    ) -> std::result::Result<Vec<KeyValue>, KvError>;
}
