use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;
use tracing::trace;

use super::KeyValue;
use super::KvQuery;
use crate::constants::PARAMETER_INDEX;
use crate::constants::PARAMETER_RECURSE;
use crate::constants::PARAMETER_WAIT;
use crate::BlockingQueriesConfig;
use crate::ConsulConfig;
use crate::Error;
use crate::KvError;
use crate::Result;

/// HTTP client for Consul blocking queries on `/v1/kv`
///
/// Every request that carries an `index` also carries `wait` so Consul holds it
/// open for at most the configured max wait. The client timeout is derived from
/// that same value and is always longer.
#[derive(Debug, Clone)]
pub struct ConsulKvClient {
    client: reqwest::Client,
    base_url: String,
    max_wait: String,
    read_timeout: Duration,
}

impl ConsulKvClient {
    pub fn new(
        consul: &ConsulConfig,
        blocking_queries: &BlockingQueriesConfig,
    ) -> Result<Self> {
        let read_timeout = blocking_queries.read_timeout()?;
        let client = reqwest::Client::builder()
            .timeout(read_timeout)
            .build()
            .map_err(|e| Error::Fatal(format!("Failed to build Consul HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: consul.base_url(),
            max_wait: blocking_queries.wait_parameter()?,
            read_timeout,
        })
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub(crate) fn kv_url(
        &self,
        key: &str,
    ) -> String {
        format!("{}/v1/kv/{}", self.base_url.trim_end_matches('/'), key.trim_start_matches('/'))
    }

    /// Query string for one blocking read
    ///
    /// `recurse` is a presence flag for Consul, so it is only sent when set.
    pub(crate) fn query_params(
        &self,
        recurse: bool,
        index: Option<u64>,
    ) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(3);
        if recurse {
            params.push((PARAMETER_RECURSE, "true".to_string()));
        }
        if let Some(index) = index {
            params.push((PARAMETER_INDEX, index.to_string()));
            params.push((PARAMETER_WAIT, self.max_wait.clone()));
        }
        params
    }

    fn transport_error(
        &self,
        key: &str,
        err: reqwest::Error,
    ) -> KvError {
        if err.is_timeout() {
            KvError::ReadTimeout {
                key: key.to_string(),
                timeout: self.read_timeout,
            }
        } else {
            KvError::Transport {
                key: key.to_string(),
                source: Box::new(err),
            }
        }
    }
}

#[async_trait]
impl KvQuery for ConsulKvClient {
    async fn watch_values(
        &self,
        key: &str,
        recurse: bool,
        index: Option<u64>,
    ) -> std::result::Result<Vec<KeyValue>, KvError> {
        let url = self.kv_url(key);
        let params = self.query_params(recurse, index);
        trace!(%url, ?params, "Sending blocking query");

        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| self.transport_error(key, e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(KvError::NotFound { key: key.to_string() });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(KvError::Status {
                key: key.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes().await.map_err(|e| self.transport_error(key, e))?;
        let entries: Vec<KeyValue> = serde_json::from_slice(&body).map_err(|e| KvError::InvalidResponse {
            key: key.to_string(),
            reason: e.to_string(),
        })?;

        debug!(key, entries = entries.len(), "Blocking query answered");
        Ok(entries)
    }
}
