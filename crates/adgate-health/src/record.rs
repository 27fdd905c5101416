//! Health records and their persisted wire shape.

use crate::network::{NetworkId, Verdict};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Key the status record is persisted under.
pub const STATUS_KEY: &str = "ad-network-status";

/// Maximum age before cached verdicts are treated as absent.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Verdicts from one probe cycle.
///
/// Immutable once written: a new cycle produces a new record, never a
/// partial mutation of an old one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthRecord {
    verdicts: HashMap<NetworkId, Verdict>,
    observed_at: u64,
}

impl HealthRecord {
    pub fn new(verdicts: HashMap<NetworkId, Verdict>, observed_at: u64) -> Self {
        Self {
            verdicts,
            observed_at,
        }
    }

    /// Verdict for a network; missing networks are `Untested`.
    pub fn verdict(&self, network: NetworkId) -> Verdict {
        self.verdicts
            .get(&network)
            .copied()
            .unwrap_or(Verdict::Untested)
    }

    pub fn verdicts(&self) -> &HashMap<NetworkId, Verdict> {
        &self.verdicts
    }

    /// Milliseconds since the Unix epoch at which this cycle ran.
    pub fn observed_at(&self) -> u64 {
        self.observed_at
    }

    /// Whether the record is older than `ttl` as seen from `now_ms`.
    pub fn is_expired(&self, now_ms: u64, ttl: Duration) -> bool {
        now_ms.saturating_sub(self.observed_at) >= ttl.as_millis() as u64
    }
}

/// Persisted wire shape under [`STATUS_KEY`]:
/// `{ "status": { "<code>": "available" | "blocked", ... }, "timestamp": <epoch-ms> }`.
///
/// Anything failing to parse as this shape is treated as absent by the
/// cache layer, never as an error. A record containing `untested` is
/// corrupt by definition: untested verdicts are never cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRecord {
    status: HashMap<NetworkId, Verdict>,
    timestamp: u64,
}

impl StatusRecord {
    /// Encode a health record for persistence.
    ///
    /// Returns `None` if the record contains an untested verdict; such a
    /// record must never reach the store.
    pub fn encode(record: &HealthRecord) -> Option<String> {
        if record
            .verdicts()
            .values()
            .any(|v| *v == Verdict::Untested)
        {
            return None;
        }
        let wire = StatusRecord {
            status: record.verdicts().clone(),
            timestamp: record.observed_at(),
        };
        serde_json::to_string(&wire).ok()
    }

    /// Decode a persisted record; `None` for any malformed input.
    pub fn decode(raw: &str) -> Option<HealthRecord> {
        let wire: StatusRecord = serde_json::from_str(raw).ok()?;
        if wire.status.values().any(|v| *v == Verdict::Untested) {
            return None;
        }
        Some(HealthRecord::new(wire.status, wire.timestamp))
    }
}
