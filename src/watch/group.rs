use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::DashSet;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::trace;
use tracing::warn;

use super::PathExit;
use super::PathWatcher;
use super::WatchStrategy;
use crate::dispatch::ChangeDispatcher;
use crate::kv::KvQuery;
use crate::Result;
use crate::WatchError;

/// Running poll loop of one path
#[derive(Debug)]
struct PathHandle {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// One `start` to `stop` span; its readiness flag is never shared with a later run
#[derive(Debug)]
struct Run {
    token: CancellationToken,
    initialized: Arc<AtomicBool>,
}

/// Watches a fixed list of paths, one background task each
///
/// # Lifecycle
/// - [`start`](Self::start) spawns a loop for every path that was not
///   abandoned, returns immediately
/// - [`is_watching`](Self::is_watching) turns true once any path completed its
///   first successful poll
/// - [`stop`](Self::stop) cancels every loop and forgets all cursors
///
/// A path abandoned after not-found or an unclassified error stays abandoned
/// for the lifetime of the group, across stop and start.
pub struct WatcherGroup {
    paths: Vec<String>,
    kv: Arc<dyn KvQuery>,
    strategy: WatchStrategy,
    dispatcher: Arc<ChangeDispatcher>,
    delay: Duration,

    /// Current run, `None` while stopped
    lifecycle: Mutex<Option<Run>>,
    registry: DashMap<String, PathHandle>,
    abandoned: Arc<DashSet<String>>,
}

impl std::fmt::Debug for WatcherGroup {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("WatcherGroup")
            .field("paths", &self.paths)
            .field("strategy", &self.strategy)
            .field("active", &self.registry.len())
            .field("abandoned", &self.abandoned.len())
            .finish()
    }
}

impl WatcherGroup {
    pub fn new(
        paths: Vec<String>,
        kv: Arc<dyn KvQuery>,
        strategy: WatchStrategy,
        dispatcher: Arc<ChangeDispatcher>,
        delay: Duration,
    ) -> Self {
        Self {
            paths,
            kv,
            strategy,
            dispatcher,
            delay,
            lifecycle: Mutex::new(None),
            registry: DashMap::new(),
            abandoned: Arc::new(DashSet::new()),
        }
    }

    /// Spawns the poll loops; must be called within a tokio runtime.
    pub fn start(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.is_some() {
            return Err(WatchError::AlreadyStarted.into());
        }

        let run = Run {
            token: CancellationToken::new(),
            initialized: Arc::new(AtomicBool::new(false)),
        };
        for path in &self.paths {
            if self.abandoned.contains(path) {
                trace!(%path, "Skipping abandoned path");
                continue;
            }
            self.spawn_path(path, run.token.child_token(), run.initialized.clone());
        }
        *lifecycle = Some(run);

        info!(paths = ?self.paths, strategy = ?self.strategy, "Watching configuration");
        Ok(())
    }

    fn spawn_path(
        &self,
        path: &str,
        token: CancellationToken,
        initialized: Arc<AtomicBool>,
    ) {
        let watcher = PathWatcher::new(
            path.to_string(),
            self.kv.clone(),
            self.strategy.clone(),
            self.dispatcher.clone(),
            self.delay,
            initialized,
        );
        let abandoned = self.abandoned.clone();
        let task_path = path.to_string();
        let task_token = token.clone();

        let handle = tokio::spawn(async move {
            if watcher.run(task_token).await == PathExit::Abandoned {
                debug!(path = %task_path, "Path abandoned");
                abandoned.insert(task_path);
            }
        });

        self.registry.insert(path.to_string(), PathHandle { token, handle });
    }

    /// Started and at least one path initialized
    pub fn is_watching(&self) -> bool {
        self.lifecycle
            .lock()
            .as_ref()
            .is_some_and(|run| run.initialized.load(Ordering::Acquire))
    }

    /// Cancels every poll loop; a no-op with a warning when not started.
    pub fn stop(&self) {
        let Some(run) = self.lifecycle.lock().take() else {
            warn!("You tried to stop an unstarted watcher");
            return;
        };

        run.token.cancel();
        let paths: Vec<String> = self.registry.iter().map(|entry| entry.key().clone()).collect();
        for path in paths {
            if let Some((_, path_handle)) = self.registry.remove(&path) {
                path_handle.token.cancel();
                path_handle.handle.abort();
            }
        }

        info!("Stopped watching configuration");
    }

    #[cfg(test)]
    pub(super) fn run_readiness(&self) -> Option<Arc<AtomicBool>> {
        self.lifecycle.lock().as_ref().map(|run| run.initialized.clone())
    }

    /// Every path this group was built with
    pub fn watched_paths(&self) -> &[String] {
        &self.paths
    }

    /// Paths with a running loop, in watch order
    pub fn active_paths(&self) -> Vec<String> {
        self.paths
            .iter()
            .filter(|path| self.registry.contains_key(*path) && !self.abandoned.contains(*path))
            .cloned()
            .collect()
    }

    /// Paths given up for good, in watch order
    pub fn abandoned_paths(&self) -> Vec<String> {
        self.paths.iter().filter(|path| self.abandoned.contains(*path)).cloned().collect()
    }
}

impl Drop for WatcherGroup {
    fn drop(&mut self) {
        if let Some(run) = self.lifecycle.get_mut().take() {
            run.token.cancel();
        }
    }
}
