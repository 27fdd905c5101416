//! Adblocker presence heuristic.
//!
//! Plants a throwaway element carrying class tokens cosmetic filter lists
//! target, reads back whether the host suppressed it. Synchronous, no
//! network I/O. A heuristic, not a proof: false positives and false
//! negatives are accepted risks, and every ambiguity counts as "blocker
//! present" (fail-safe, never fail-open).

use thiserror::Error;
use tracing::{debug, warn};

/// Class tokens commonly targeted by cosmetic blocklists.
const BAIT_CLASSES: &[&str] = &[
    "adsbox",
    "ad-banner",
    "ad-placement",
    "pub_300x250",
    "textads",
];

/// Opaque handle to a planted bait element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BaitId(pub u64);

/// Rendered geometry of the bait as the host reports it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaitMeasurement {
    pub width: f32,
    pub height: f32,
    pub hidden: bool,
}

impl BaitMeasurement {
    /// Whether a blocker collapsed or hid the element.
    pub fn suppressed(&self) -> bool {
        self.hidden || self.width <= 0.0 || self.height <= 0.0
    }
}

/// Host-side failure while planting or measuring the bait.
#[derive(Debug, Error)]
#[error("bait host error: {0}")]
pub struct HostError(pub String);

/// Presentation-layer capability the heuristic probes through.
///
/// The real implementation attaches an invisible element to the live
/// document; tests inject a fake.
pub trait BaitHost: Send + Sync {
    /// Attach an invisible element carrying `class_names`.
    fn plant(&self, class_names: &str) -> Result<BaitId, HostError>;
    /// Read back the element's rendered geometry.
    fn measure(&self, id: BaitId) -> Result<BaitMeasurement, HostError>;
    /// Detach the element. Must be safe to call exactly once per plant.
    fn remove(&self, id: BaitId);
}

/// Synchronous adblocker presence check.
pub trait AdblockHeuristic: Send + Sync {
    /// `true` when a content blocker appears to be active.
    fn detect(&self) -> bool;
}

/// The bait-element heuristic.
pub struct BaitElementHeuristic<H: BaitHost> {
    host: H,
}

impl<H: BaitHost> BaitElementHeuristic<H> {
    pub fn new(host: H) -> Self {
        Self { host }
    }

    /// The class attribute planted on the bait element.
    pub fn bait_classes() -> String {
        BAIT_CLASSES.join(" ")
    }
}

impl<H: BaitHost> AdblockHeuristic for BaitElementHeuristic<H> {
    fn detect(&self) -> bool {
        let id = match self.host.plant(&Self::bait_classes()) {
            Ok(id) => id,
            Err(e) => {
                // Could not even attach the bait; assume a blocker interfered
                warn!("bait plant failed, assuming blocker present: {}", e);
                return true;
            }
        };

        let suppressed = match self.host.measure(id) {
            Ok(measurement) => measurement.suppressed(),
            Err(e) => {
                warn!("bait measurement failed, assuming blocker present: {}", e);
                true
            }
        };

        // Cleanup happens on both branches, whatever the outcome
        self.host.remove(id);

        if suppressed {
            debug!("bait element suppressed; content blocker assumed present");
        }
        suppressed
    }
}
