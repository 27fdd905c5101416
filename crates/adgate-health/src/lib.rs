//! AdGate Health Detection
//!
//! Decides whether each configured ad network is currently reachable,
//! caches the verdicts with a TTL, and reduces them to a single preferred
//! network (or a safe fallback).
//!
//! Pipeline:
//! 1. `resolve()` reads the persisted verdict cache
//! 2. On a miss, the adblock heuristic runs first (cheap, synchronous)
//! 3. Only if no blocker is found, all networks are probed concurrently
//! 4. Merged verdicts are written back and ranked by priority order

mod cache;
mod clock;
mod heuristic;
mod network;
mod prober;
mod record;
mod service;
mod store;

pub use cache::{CacheError, ResultCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use heuristic::{
    AdblockHeuristic, BaitElementHeuristic, BaitHost, BaitId, BaitMeasurement, HostError,
};
pub use network::{NetworkId, ProbeTarget, UnknownNetwork, Verdict};
pub use prober::{
    LoadSignal, ProbeError, ProbeHandle, Prober, ResourceLoader, DETACH_SWEEP_INTERVAL,
    PROBE_TIMEOUT,
};
pub use record::{HealthRecord, StatusRecord, DEFAULT_TTL, STATUS_KEY};
pub use service::{HealthService, PreferredNetwork};
pub use store::{FileStore, MemoryStore, StatusStore, StoreError, StoreEvent};
