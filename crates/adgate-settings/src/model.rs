//! The ad settings document.

use adgate_creative::Creative;
use adgate_health::NetworkId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Creative configuration for one placement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlacementConfig {
    /// Operator fallback shown when no network is preferred.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<Creative>,
    /// Markup creative served when the markup network is preferred.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markup: Option<Creative>,
    /// Provider slide served when the slide network is preferred.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slide: Option<Creative>,
}

impl PlacementConfig {
    /// All configured creatives for this placement.
    pub fn creatives(&self) -> impl Iterator<Item = &Creative> {
        self.fallback
            .iter()
            .chain(self.markup.iter())
            .chain(self.slide.iter())
    }
}

/// Operator-authored ad settings. Unknown fields on disk are tolerated;
/// missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Network priority order; the first available network wins.
    #[serde(default = "default_priority")]
    pub priority: Vec<NetworkId>,
    /// Verdict cache TTL override, in hours.
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u64,
    /// Placement name -> creatives. BTreeMap keeps the persisted
    /// document stable across saves.
    #[serde(default)]
    pub placements: BTreeMap<String, PlacementConfig>,
}

impl Default for AdSettings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            priority: default_priority(),
            ttl_hours: default_ttl_hours(),
            placements: BTreeMap::new(),
        }
    }
}

impl AdSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_hours * 60 * 60)
    }

    /// Every configured creative, with its placement name.
    pub fn creatives(&self) -> impl Iterator<Item = (&str, &Creative)> {
        self.placements
            .iter()
            .flat_map(|(name, placement)| placement.creatives().map(move |c| (name.as_str(), c)))
    }
}

fn default_enabled() -> bool {
    true
}

fn default_priority() -> Vec<NetworkId> {
    NetworkId::all().to_vec()
}

fn default_ttl_hours() -> u64 {
    24
}
