//! Persisted settings document with change signals.

use crate::model::AdSettings;
use crate::watcher::SettingsWatcher;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Name of the process-wide settings-change broadcast.
pub const SETTINGS_EVENT: &str = "ads-updated";

/// Capacity of the change-notification channel.
const EVENT_CAPACITY: usize = 16;

/// Settings persistence errors.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Why a settings re-read is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsEvent {
    /// Settings were rewritten through this store (`ads-updated`).
    Updated,
    /// The underlying storage changed outside this store
    /// (cross-context storage-change signal).
    External,
}

/// JSON-document store for [`AdSettings`].
///
/// Every successful save broadcasts [`SettingsEvent::Updated`]; glue code
/// that observes the underlying storage changing from another context
/// reports it through [`SettingsStore::notify_external_change`]. Either
/// event means the same thing to consumers: re-read the settings.
pub struct SettingsStore {
    path: PathBuf,
    events: broadcast::Sender<SettingsEvent>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self, SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        info!("settings store at {}", path.display());
        Ok(Self { path, events })
    }

    /// Store under the platform data directory.
    pub fn with_defaults() -> Result<Self, SettingsError> {
        let path = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("adgate")
            .join("ad-settings.json");
        Self::new(path)
    }

    /// Read the current settings.
    ///
    /// An absent document yields the defaults. A malformed document also
    /// yields the defaults: settings only enter the store through the
    /// validated save path, so unreadable content means the storage was
    /// tampered with, and serving defaults is the fail-safe answer.
    pub fn load(&self) -> AdSettings {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return AdSettings::default();
            }
            Err(e) => {
                warn!("settings unreadable, serving defaults: {}", e);
                return AdSettings::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("settings document malformed, serving defaults: {}", e);
                AdSettings::default()
            }
        }
    }

    /// Persist the settings atomically and broadcast `ads-updated`.
    pub fn save(&self, settings: &AdSettings) -> Result<(), SettingsError> {
        let raw = serde_json::to_string_pretty(settings)
            .map_err(|e| SettingsError::Serialization(e.to_string()))?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &self.path)?;

        debug!("settings saved, broadcasting {}", SETTINGS_EVENT);
        let _ = self.events.send(SettingsEvent::Updated);
        Ok(())
    }

    /// Subscribe to change signals. The subscription ends when the
    /// returned watcher is dropped.
    pub fn watch(&self) -> SettingsWatcher {
        SettingsWatcher::new(self.events.subscribe())
    }

    /// Report that the underlying storage changed from another execution
    /// context.
    pub fn notify_external_change(&self) {
        let _ = self.events.send(SettingsEvent::External);
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}
