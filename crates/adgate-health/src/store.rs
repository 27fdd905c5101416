//! Persistence behind the verdict cache.
//!
//! The status record is the only resource shared across execution contexts
//! of the same client, so the store is a capability: `load`/`save`/`clear`
//! of an opaque string plus a change-notification subscription. Writers
//! overwrite wholesale; readers observe external clears through the
//! subscription (or simply by the next read coming back empty).

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;

/// Capacity of the change-notification channel. Consumers that lag simply
/// coalesce missed signals into the next read.
const EVENT_CAPACITY: usize = 16;

/// Storage errors. Callers above the cache layer never see these; the
/// cache folds them into "absent".
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Change notification emitted by a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// A value was written under the key.
    Saved(String),
    /// The value under the key was removed.
    Cleared(String),
}

/// Where persisted records live.
///
/// Implementations broadcast a [`StoreEvent`] on every write or clear so
/// that other consumers of the same store can react.
pub trait StatusStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn save(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn clear(&self, key: &str) -> Result<(), StoreError>;
    /// Subscribe to change notifications.
    fn subscribe(&self) -> broadcast::Receiver<StoreEvent>;
}

/// In-process store. Shared across consumers via `Arc`.
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    events: broadcast::Sender<StoreEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            entries: Mutex::new(HashMap::new()),
            events,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        let _ = self.events.send(StoreEvent::Saved(key.to_string()));
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().unwrap().remove(key);
        let _ = self.events.send(StoreEvent::Cleared(key.to_string()));
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}

/// File-backed store: one JSON file per key, written atomically
/// (tmp-then-rename) so a crash mid-write never leaves a torn record.
pub struct FileStore {
    dir: PathBuf,
    events: broadcast::Sender<StoreEvent>,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Result<Self, StoreError> {
        fs::create_dir_all(&dir)?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self { dir, events })
    }

    /// Store under the platform data directory.
    pub fn with_defaults() -> Result<Self, StoreError> {
        let dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("adgate");
        Self::new(dir)
    }

    fn key_path(&self, key: &str) -> PathBuf {
        // Keys are fixed identifiers like "ad-network-status"; strip
        // anything that could escape the store directory.
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", safe))
    }
}

impl StatusStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.key_path(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.key_path(key);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        debug!("saved {} bytes under {}", value.len(), key);
        let _ = self.events.send(StoreEvent::Saved(key.to_string()));
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<(), StoreError> {
        let path = self.key_path(key);
        if path.exists() {
            fs::remove_file(path)?;
        }
        let _ = self.events.send(StoreEvent::Cleared(key.to_string()));
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        assert!(store.load("k").unwrap().is_none());

        store.save("k", "v1").unwrap();
        assert_eq!(store.load("k").unwrap().as_deref(), Some("v1"));

        store.save("k", "v2").unwrap();
        assert_eq!(store.load("k").unwrap().as_deref(), Some("v2"));

        store.clear("k").unwrap();
        assert!(store.load("k").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_store_notifies_subscribers() {
        let store = MemoryStore::new();
        let mut rx = store.subscribe();

        store.save("k", "v").unwrap();
        store.clear("k").unwrap();

        assert_eq!(rx.recv().await.unwrap(), StoreEvent::Saved("k".into()));
        assert_eq!(rx.recv().await.unwrap(), StoreEvent::Cleared("k".into()));
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();

        assert!(store.load("ad-network-status").unwrap().is_none());
        store.save("ad-network-status", "{}").unwrap();
        assert_eq!(
            store.load("ad-network-status").unwrap().as_deref(),
            Some("{}")
        );

        store.clear("ad-network-status").unwrap();
        assert!(store.load("ad-network-status").unwrap().is_none());
        // Clearing an absent key is not an error
        store.clear("ad-network-status").unwrap();
    }

    #[test]
    fn test_file_store_sanitizes_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();

        store.save("../escape", "x").unwrap();
        assert_eq!(store.load("../escape").unwrap().as_deref(), Some("x"));
        // Nothing was written outside the store directory
        assert!(!dir.path().parent().unwrap().join("escape.json").exists());
    }

    #[test]
    fn test_file_store_leaves_no_tmp_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().to_path_buf()).unwrap();

        store.save("k", "value").unwrap();
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map(|x| x == "tmp").unwrap_or(false))
            .collect();
        assert!(leftovers.is_empty());
    }
}
