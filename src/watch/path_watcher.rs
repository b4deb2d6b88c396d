use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::trace;
use tracing::warn;

use super::Observed;
use super::PollOutcome;
use super::WatchState;
use super::WatchStrategy;
use crate::codec::PropertyMap;
use crate::dispatch::ChangeDispatcher;
use crate::kv::KeyValue;
use crate::kv::KvQuery;
use crate::KvError;

/// Why a path loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PathExit {
    Cancelled,
    Abandoned,
}

/// Poll loop of one watched path
///
/// The only writer of its [`WatchState`]. Both suspension points are raced
/// against the cancellation token with cancellation checked first, so a
/// stopped loop never handles a late answer nor schedules another poll.
pub(crate) struct PathWatcher {
    path: String,
    kv: Arc<dyn KvQuery>,
    strategy: WatchStrategy,
    dispatcher: Arc<ChangeDispatcher>,
    delay: Duration,
    initialized: Arc<AtomicBool>,
    state: WatchState,
}

impl PathWatcher {
    pub(crate) fn new(
        path: String,
        kv: Arc<dyn KvQuery>,
        strategy: WatchStrategy,
        dispatcher: Arc<ChangeDispatcher>,
        delay: Duration,
        initialized: Arc<AtomicBool>,
    ) -> Self {
        Self {
            path,
            kv,
            strategy,
            dispatcher,
            delay,
            initialized,
            state: WatchState::new(),
        }
    }

    pub(crate) async fn run(
        mut self,
        token: CancellationToken,
    ) -> PathExit {
        debug!(path = %self.path, "Watching path");
        loop {
            match self.poll_once(&token).await {
                None => {
                    trace!(path = %self.path, "Path watch cancelled");
                    return PathExit::Cancelled;
                }
                Some(outcome) if outcome.is_terminal() => return PathExit::Abandoned,
                Some(_) => {}
            }
        }
    }

    /// One delay + query round, `None` once cancelled
    pub(crate) async fn poll_once(
        &mut self,
        token: &CancellationToken,
    ) -> Option<PollOutcome> {
        tokio::select! {
            biased;
            _ = token.cancelled() => return None,
            _ = sleep(self.delay) => {}
        }

        let index = self.state.index();
        let result = tokio::select! {
            biased;
            _ = token.cancelled() => return None,
            result = self.kv.watch_values(&self.path, self.strategy.recurse(), index) => result,
        };

        Some(self.handle_result(result))
    }

    fn handle_result(
        &mut self,
        result: std::result::Result<Vec<KeyValue>, KvError>,
    ) -> PollOutcome {
        match result {
            Ok(entries) => match self.strategy.select(&self.path, entries) {
                Some(observed) => self.handle_observed(observed),
                None => {
                    trace!(path = %self.path, "No entry matches the watched key, stop watching");
                    PollOutcome::NotFound
                }
            },
            Err(e) if e.is_not_found() => {
                trace!(path = %self.path, "No KV found, stop watching");
                PollOutcome::NotFound
            }
            Err(e) if e.is_read_timeout() => {
                warn!(path = %self.path, error = %e, "Blocking query timed out, polling again");
                PollOutcome::Timeout
            }
            Err(e) => {
                error!(path = %self.path, error = %e, "Watching failed, stop watching");
                PollOutcome::Failed
            }
        }
    }

    fn handle_observed(
        &mut self,
        observed: Observed,
    ) -> PollOutcome {
        let outcome = match self.state.last_observed() {
            None => {
                self.initialized.store(true, Ordering::Release);
                debug!(path = %self.path, index = ?observed.next_index(), "Watch initialized");
                PollOutcome::Init
            }
            Some(previous) if self.strategy.are_equal(previous, &observed) => {
                trace!(path = %self.path, "Content unchanged");
                PollOutcome::NoChange
            }
            Some(previous) => {
                self.dispatch(previous, &observed);
                PollOutcome::Changed
            }
        };

        // the cursor follows every answer, equal content included
        self.state.observe(observed);
        outcome
    }

    fn dispatch(
        &self,
        previous: &Observed,
        next: &Observed,
    ) {
        let next_properties = match self.strategy.read(next) {
            Ok(properties) => properties,
            Err(e) => {
                error!(path = %self.path, error = %e, "Failed to decode changed configuration");
                return;
            }
        };
        let previous_properties = self.strategy.read(previous).unwrap_or_else(|e| {
            warn!(path = %self.path, error = %e, "Previous configuration unreadable, diffing against empty");
            PropertyMap::new()
        });

        self.dispatcher.handle_changes(&self.path, &previous_properties, &next_properties);
    }
}
