//! Watch-channel snapshot of the watcher's progress, for the
//! collection task and any host supervisor.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Point-in-time view of the watcher.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatcherStatus {
    /// Highest block accepted into the finality buffer.
    pub latest_finalized_height: i64,
    /// End height of the last emitted epoch window.
    pub last_epoch_end_height: i64,
    /// Epochs emitted since construction (speedup included).
    pub epochs_emitted: i64,
}

/// Shared handle around a `watch` pair. The watcher publishes, anyone
/// with a clone observes.
#[derive(Clone, Debug)]
pub struct StatusChannel {
    tx: Arc<watch::Sender<WatcherStatus>>,
    rx: watch::Receiver<WatcherStatus>,
}

impl StatusChannel {
    pub fn new(initial: WatcherStatus) -> Self {
        let (tx, rx) = watch::channel(initial);
        Self { tx: Arc::new(tx), rx }
    }

    pub fn get(&self) -> WatcherStatus {
        self.rx.borrow().clone()
    }

    pub fn update(&self, status: WatcherStatus) {
        // Cannot fail while this handle holds a receiver.
        let _ = self.tx.send(status);
    }
}

impl Default for StatusChannel {
    fn default() -> Self {
        Self::new(WatcherStatus::default())
    }
}
