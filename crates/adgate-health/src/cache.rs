//! TTL-gated verdict cache over a [`StatusStore`].

use crate::clock::Clock;
use crate::record::{HealthRecord, StatusRecord, DEFAULT_TTL, STATUS_KEY};
use crate::store::{StatusStore, StoreError, StoreEvent};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Cache-layer errors. Reads never produce these: a read that fails for
/// any reason behaves as a miss. Writes surface them so callers can log.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("record contains an untested verdict and cannot be cached")]
    UntestedVerdict,
}

/// Persists and expires network-availability verdicts.
///
/// Every read goes through to the underlying store, so a clear performed
/// by another execution context is observed on the next `get` without any
/// coordination beyond the shared store itself.
pub struct ResultCache {
    store: Arc<dyn StatusStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(store: Arc<dyn StatusStore>, clock: Arc<dyn Clock>) -> Self {
        Self::with_ttl(store, clock, DEFAULT_TTL)
    }

    pub fn with_ttl(store: Arc<dyn StatusStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self { store, clock, ttl }
    }

    /// Current record, or `None` when absent, expired, or unreadable.
    pub fn get(&self) -> Option<HealthRecord> {
        let raw = match self.store.load(STATUS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                debug!("status store read failed, treating as absent: {}", e);
                return None;
            }
        };

        let record = match StatusRecord::decode(&raw) {
            Some(record) => record,
            None => {
                warn!("corrupt status record under {}, treating as absent", STATUS_KEY);
                return None;
            }
        };

        if record.is_expired(self.clock.now_ms(), self.ttl) {
            debug!(
                "cached verdicts expired (observed_at={}, ttl={:?})",
                record.observed_at(),
                self.ttl
            );
            return None;
        }

        Some(record)
    }

    /// Overwrite the stored entry wholesale.
    pub fn put(&self, record: &HealthRecord) -> Result<(), CacheError> {
        let raw = StatusRecord::encode(record).ok_or(CacheError::UntestedVerdict)?;
        self.store.save(STATUS_KEY, &raw)?;
        Ok(())
    }

    /// Drop the stored entry.
    pub fn invalidate(&self) {
        if let Err(e) = self.store.clear(STATUS_KEY) {
            warn!("failed to clear status record: {}", e);
        }
    }

    /// Change notifications from the underlying store.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.store.subscribe()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
