//! Settings change subscription.

use crate::store::SettingsEvent;
use tokio::sync::broadcast;

/// Explicit subscription to settings-change signals.
///
/// Both the process-wide `ads-updated` broadcast and the cross-context
/// storage-change signal arrive here; either one means "re-read the
/// settings". Dropping the watcher ends the subscription.
pub struct SettingsWatcher {
    rx: broadcast::Receiver<SettingsEvent>,
}

impl SettingsWatcher {
    pub(crate) fn new(rx: broadcast::Receiver<SettingsEvent>) -> Self {
        Self { rx }
    }

    /// Wait for the next change signal. `None` once the store is gone.
    pub async fn changed(&mut self) -> Option<SettingsEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                // Missed signals all mean the same re-read; collapse them
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking poll for a pending change signal.
    pub fn try_changed(&mut self) -> Option<SettingsEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}
