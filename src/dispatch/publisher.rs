#[cfg(test)]
use mockall::automock;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;

use super::ChangeSet;
use crate::DispatchError;

/// Notification that configuration keys changed
///
/// Carries the [`ChangeSet`] only, never the full new configuration, so
/// consumers can invalidate exactly what moved.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshEvent {
    pub changes: ChangeSet,
}

impl RefreshEvent {
    pub fn new(changes: ChangeSet) -> Self {
        Self { changes }
    }
}

/// Notification bus for refresh events, fire-and-forget
#[cfg_attr(test, automock)]
pub trait RefreshPublisher: Send + Sync + 'static {
    fn publish(
        &self,
        event: RefreshEvent,
    ) -> std::result::Result<(), DispatchError>;
}

/// [`RefreshPublisher`] over a tokio broadcast channel
#[derive(Debug, Clone)]
pub struct BroadcastRefreshPublisher {
    sender: broadcast::Sender<RefreshEvent>,
}

impl BroadcastRefreshPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RefreshEvent> {
        self.sender.subscribe()
    }

    /// Subscribes as a stream; lagging consumers see `Err(Lagged)` items
    pub fn stream(&self) -> BroadcastStream<RefreshEvent> {
        BroadcastStream::new(self.sender.subscribe())
    }
}

impl RefreshPublisher for BroadcastRefreshPublisher {
    fn publish(
        &self,
        event: RefreshEvent,
    ) -> std::result::Result<(), DispatchError> {
        match self.sender.send(event) {
            Ok(receivers) => {
                debug!(receivers, "Refresh event published");
            }
            Err(_) => {
                debug!("Refresh event dropped, no subscriber");
            }
        }
        Ok(())
    }
}
