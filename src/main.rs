use std::path::Path;
use std::sync::Arc;

use consul_watch::dispatch::BroadcastRefreshPublisher;
use consul_watch::dispatch::InMemoryPropertySourceStore;
use consul_watch::kv::ConsulKvClient;
use consul_watch::utils::file_io::open_file_for_append;
use consul_watch::watch::WatchFactory;
use consul_watch::Result;
use consul_watch::WatcherSettings;
use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tokio_stream::StreamExt;
use tracing::error;
use tracing::info;
use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;

const REFRESH_CHANNEL_CAPACITY: usize = 64;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    let settings = WatcherSettings::new()?.validate()?;

    // Initializing Logs
    let _guard = init_observability(&settings.log_dir)?;

    if !settings.watch.enabled {
        info!("Configuration watching is disabled, nothing to do");
        return Ok(());
    }

    let kv = Arc::new(ConsulKvClient::new(&settings.consul, &settings.blocking_queries)?);
    let store = Arc::new(InMemoryPropertySourceStore::new());
    let publisher = Arc::new(BroadcastRefreshPublisher::new(REFRESH_CHANNEL_CAPACITY));

    let mut refreshes = publisher.stream();
    tokio::spawn(async move {
        while let Some(event) = refreshes.next().await {
            match event {
                Ok(event) => {
                    info!(keys = ?event.changes.keys().collect::<Vec<_>>(), "Configuration refreshed");
                }
                Err(e) => {
                    warn!("Refresh listener lagging: {}", e);
                }
            }
        }
    });

    let group = WatchFactory::create_watcher(&settings, kv, store, publisher)?;
    group.start()?;
    info!("Application started. Waiting for CTRL+C signal...");

    if let Err(e) = graceful_shutdown().await {
        error!("Failed to listen for shutdown signals: {:?}", e);
    }
    group.stop();

    info!("Exiting program.");
    Ok(())
}

async fn graceful_shutdown() -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C detected.");
        },
    }

    info!("Shutdown watcher..");
    Ok(())
}

pub fn init_observability(log_dir: &Path) -> Result<WorkerGuard> {
    let log_file = open_file_for_append(&log_dir.join("consul-watch.log"))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(log_file);
    let base_subscriber = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(base_subscriber).init();

    Ok(guard)
}
