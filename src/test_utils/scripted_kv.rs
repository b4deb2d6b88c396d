use std::collections::HashMap;
use std::collections::VecDeque;
use std::future::pending;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::kv::KeyValue;
use crate::kv::KvQuery;
use crate::KvError;

/// One recorded `watch_values` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvCall {
    pub key: String,
    pub recurse: bool,
    pub index: Option<u64>,
}

enum Scripted {
    Respond(std::result::Result<Vec<KeyValue>, KvError>),
    Delayed(Duration, std::result::Result<Vec<KeyValue>, KvError>),
}

/// [`KvQuery`] answering from per-key queues
///
/// Once a key's queue is exhausted its calls never complete, like a blocking
/// query held open by Consul.
#[derive(Default)]
pub struct ScriptedKvQuery {
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<KvCall>>,
}

impl ScriptedKvQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(
        &self,
        key: &str,
        result: std::result::Result<Vec<KeyValue>, KvError>,
    ) -> &Self {
        self.push(key, Scripted::Respond(result))
    }

    /// Answers only after `delay` of tokio time
    pub fn respond_after(
        &self,
        key: &str,
        delay: Duration,
        result: std::result::Result<Vec<KeyValue>, KvError>,
    ) -> &Self {
        self.push(key, Scripted::Delayed(delay, result))
    }

    fn push(
        &self,
        key: &str,
        scripted: Scripted,
    ) -> &Self {
        self.scripts.lock().entry(key.to_string()).or_default().push_back(scripted);
        self
    }

    pub fn calls(&self) -> Vec<KvCall> {
        self.calls.lock().clone()
    }

    pub fn calls_for(
        &self,
        key: &str,
    ) -> Vec<KvCall> {
        self.calls.lock().iter().filter(|c| c.key == key).cloned().collect()
    }
}

#[async_trait]
impl KvQuery for ScriptedKvQuery {
    async fn watch_values(
        &self,
        key: &str,
        recurse: bool,
        index: Option<u64>,
    ) -> std::result::Result<Vec<KeyValue>, KvError> {
        self.calls.lock().push(KvCall {
            key: key.to_string(),
            recurse,
            index,
        });

        let next = self.scripts.lock().get_mut(key).and_then(VecDeque::pop_front);
        match next {
            Some(Scripted::Respond(result)) => result,
            Some(Scripted::Delayed(delay, result)) => {
                tokio::time::sleep(delay).await;
                result
            }
            None => pending().await,
        }
    }
}

pub fn not_found(key: &str) -> KvError {
    KvError::NotFound { key: key.to_string() }
}

pub fn read_timeout(key: &str) -> KvError {
    KvError::ReadTimeout {
        key: key.to_string(),
        timeout: Duration::from_secs(1),
    }
}
