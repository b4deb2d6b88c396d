use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;
use tracing::error;
use tracing::info;

use super::ChangeSet;
use super::PropertySource;
use super::PropertySourceStore;
use super::RefreshEvent;
use super::RefreshPublisher;
use crate::codec::PropertyMap;
use crate::constants::CONSUL_PATH_SEPARATOR;
use crate::constants::PROFILE_SEPARATOR;
use crate::constants::SERVICE_ID;
use crate::DispatchError;

/// Order given to a property source the store does not know yet
pub const DEFAULT_SOURCE_ORDER: i32 = 0;

/// Turns a detected change on one watched path into a store update and a
/// refresh event.
///
/// Shared by every path task of a group. Errors never escape
/// [`ChangeDispatcher::handle_changes`]; a failed dispatch must not stop the
/// poll loop that reported it.
pub struct ChangeDispatcher {
    store: Arc<dyn PropertySourceStore>,
    publisher: Arc<dyn RefreshPublisher>,
    source_names: DashMap<String, String>,
}

impl std::fmt::Debug for ChangeDispatcher {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ChangeDispatcher")
            .field("source_names", &self.source_names.len())
            .finish()
    }
}

impl ChangeDispatcher {
    pub fn new(
        store: Arc<dyn PropertySourceStore>,
        publisher: Arc<dyn RefreshPublisher>,
    ) -> Self {
        Self {
            store,
            publisher,
            source_names: DashMap::new(),
        }
    }

    pub fn handle_changes(
        &self,
        path: &str,
        previous: &PropertyMap,
        next: &PropertyMap,
    ) {
        match self.dispatch(path, previous, next) {
            Ok(Some(changes)) => {
                info!(path, keys = ?changes.keys().collect::<Vec<_>>(), "Configuration changed");
            }
            Ok(None) => {
                debug!(path, "Content changed without property changes");
            }
            Err(e) => {
                error!(path, error = %e, "Failed to apply configuration changes");
            }
        }
    }

    fn dispatch(
        &self,
        path: &str,
        previous: &PropertyMap,
        next: &PropertyMap,
    ) -> std::result::Result<Option<ChangeSet>, DispatchError> {
        let changes = ChangeSet::between(previous, next);
        if changes.is_empty() {
            return Ok(None);
        }

        let name = self.resolve_property_source_name(path);
        self.replace_property_source(&name, next)?;
        self.publisher.publish(RefreshEvent::new(changes.clone()))?;

        Ok(Some(changes))
    }

    /// Property source name for a watched path: `consul-<name>` or
    /// `consul-<name>[<profile>]`, cached per path.
    pub fn resolve_property_source_name(
        &self,
        path: &str,
    ) -> String {
        self.source_names
            .entry(path.to_string())
            .or_insert_with(|| property_source_name(path))
            .clone()
    }

    /// Replaces the source named `name`, keeping its order
    ///
    /// Only that one source is written; sources owned by other paths may be
    /// updated concurrently.
    fn replace_property_source(
        &self,
        name: &str,
        next: &PropertyMap,
    ) -> std::result::Result<(), DispatchError> {
        let order = match self.store.property_sources().into_iter().find(|s| s.name == name) {
            Some(existing) => existing.order,
            None => {
                debug!(name, "Registering new property source");
                DEFAULT_SOURCE_ORDER
            }
        };

        self.store.add_property_source(PropertySource::new(name, next.clone(), order))
    }
}

fn property_source_name(path: &str) -> String {
    let trimmed = path.trim_end_matches(CONSUL_PATH_SEPARATOR);
    let segment = trimmed.rsplit(CONSUL_PATH_SEPARATOR).next().unwrap_or(trimmed);

    match segment.split_once(PROFILE_SEPARATOR) {
        Some((name, profile)) => format!("{SERVICE_ID}-{name}[{profile}]"),
        None => format!("{SERVICE_ID}-{segment}"),
    }
}
