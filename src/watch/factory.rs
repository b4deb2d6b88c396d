use std::sync::Arc;

use config::ConfigError;
use tracing::debug;

use super::WatchStrategy;
use super::WatcherGroup;
use crate::constants::CONSUL_PATH_SEPARATOR;
use crate::constants::DEFAULT_NAME;
use crate::constants::PROFILE_SEPARATOR;
use crate::dispatch::ChangeDispatcher;
use crate::dispatch::PropertySourceStore;
use crate::dispatch::RefreshPublisher;
use crate::kv::KvQuery;
use crate::ConfigFormat;
use crate::ConsulConfig;
use crate::Error;
use crate::Result;
use crate::WatcherSettings;

/// Builds the [`WatcherGroup`] matching the configured format
pub struct WatchFactory;

impl WatchFactory {
    /// KV paths to watch, lowest precedence first
    ///
    /// Shared configuration, then the application's own, then both again per
    /// active profile in profile order.
    pub fn compute_watched_paths(
        consul: &ConsulConfig,
        environments: &[String],
    ) -> Result<Vec<String>> {
        let application = consul.service_id.trim();
        if application.is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "consul.service_id is required to compute watched paths".into(),
            )));
        }

        let base = consul.configuration_path();
        let common_path = format!("{base}{DEFAULT_NAME}");
        let application_path = format!("{base}{application}");

        let mut paths = Vec::with_capacity(2 + 2 * environments.len());
        paths.push(common_path.clone());
        paths.push(application_path.clone());
        for profile in environments {
            paths.push(format!("{common_path}{PROFILE_SEPARATOR}{profile}"));
            paths.push(format!("{application_path}{PROFILE_SEPARATOR}{profile}"));
        }
        Ok(paths)
    }

    pub fn create_watcher(
        settings: &WatcherSettings,
        kv: Arc<dyn KvQuery>,
        store: Arc<dyn PropertySourceStore>,
        publisher: Arc<dyn RefreshPublisher>,
    ) -> Result<WatcherGroup> {
        let format = settings.consul.config.format;
        let strategy = WatchStrategy::for_format(format)?;

        let mut paths = Self::compute_watched_paths(&settings.consul, &settings.environments)?;
        if format == ConfigFormat::Native {
            // `path/` must not prefix-match `path,profile/`
            for path in paths.iter_mut() {
                path.push(CONSUL_PATH_SEPARATOR);
            }
        }
        debug!(%format, ?paths, "Creating watcher");

        let dispatcher = Arc::new(ChangeDispatcher::new(store, publisher));
        Ok(WatcherGroup::new(
            paths,
            kv,
            strategy,
            dispatcher,
            settings.blocking_queries.delay(),
        ))
    }
}
