use crate::kv::max_modify_index;
use crate::kv::KeyValue;

/// Last answer a path watcher accepted from Consul
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observed {
    /// Single document entry, key equal to the watched path
    Single(KeyValue),
    /// Every entry under a watched prefix
    Multi(Vec<KeyValue>),
}

impl Observed {
    /// Blocking-query cursor implied by this answer
    pub fn next_index(&self) -> Option<u64> {
        match self {
            Observed::Single(entry) => Some(entry.modify_index),
            Observed::Multi(entries) => max_modify_index(entries),
        }
    }
}

/// Per-path memory of a watch loop, owned by that loop alone
///
/// Empty until the first successful poll; dropped with the loop, so a stopped
/// and restarted group begins every path without a cursor.
#[derive(Debug, Default)]
pub struct WatchState {
    last_observed: Option<Observed>,
}

impl WatchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_observed(&self) -> Option<&Observed> {
        self.last_observed.as_ref()
    }

    pub fn index(&self) -> Option<u64> {
        self.last_observed.as_ref().and_then(Observed::next_index)
    }

    /// Stores `observed`, returning what it replaced
    pub fn observe(
        &mut self,
        observed: Observed,
    ) -> Option<Observed> {
        self.last_observed.replace(observed)
    }
}

/// Classification of one poll result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// First answer for the path, nothing dispatched
    Init,
    /// Same content as before
    NoChange,
    /// Content moved, changes dispatched
    Changed,
    /// Key or prefix missing, path abandoned
    NotFound,
    /// Client read timeout, re-poll with the same cursor
    Timeout,
    /// Unclassified error, path abandoned
    Failed,
}

impl PollOutcome {
    pub fn is_terminal(self) -> bool {
        matches!(self, PollOutcome::NotFound | PollOutcome::Failed)
    }
}
