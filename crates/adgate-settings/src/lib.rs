//! AdGate Settings
//!
//! Operator-authored ad configuration: the persisted settings document,
//! its change signals, and the validation boundary that refuses to
//! persist a creative the validator would refuse to render.

mod model;
mod service;
mod store;
mod watcher;

pub use model::{AdSettings, PlacementConfig};
pub use service::{SettingsService, ValidationAction, ValidationRequest, ValidationResponse};
pub use store::{SettingsError, SettingsEvent, SettingsStore, SETTINGS_EVENT};
pub use watcher::SettingsWatcher;
