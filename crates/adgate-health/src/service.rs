//! Health service: cache-backed preference resolution.
//!
//! Owns the injected clock, store-backed cache, heuristic, and prober; no
//! ambient globals. Constructed once per process and passed by reference.

use crate::cache::ResultCache;
use crate::clock::Clock;
use crate::heuristic::AdblockHeuristic;
use crate::network::{NetworkId, ProbeTarget, Verdict};
use crate::prober::Prober;
use crate::record::HealthRecord;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// The single ranked choice derived from the current health record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferredNetwork {
    Network(NetworkId),
    /// No configured network is reachable; serve the operator fallback.
    Fallback,
}

impl PreferredNetwork {
    pub fn network(&self) -> Option<NetworkId> {
        match self {
            PreferredNetwork::Network(n) => Some(*n),
            PreferredNetwork::Fallback => None,
        }
    }
}

/// Decides which ad network to serve from.
pub struct HealthService {
    cache: ResultCache,
    heuristic: Arc<dyn AdblockHeuristic>,
    prober: Prober,
    clock: Arc<dyn Clock>,
    /// Fixed, total priority order; first `Available` entry wins.
    priority: Vec<NetworkId>,
    targets: Vec<ProbeTarget>,
    /// Single-flight guard: at most one probe cycle in flight.
    cycle: Mutex<()>,
    cycles_run: AtomicU64,
}

impl HealthService {
    pub fn new(
        cache: ResultCache,
        heuristic: Arc<dyn AdblockHeuristic>,
        prober: Prober,
        clock: Arc<dyn Clock>,
        priority: Vec<NetworkId>,
    ) -> Self {
        let targets = priority
            .iter()
            .map(|n| ProbeTarget::default_for(*n))
            .collect();
        Self::with_targets(cache, heuristic, prober, clock, priority, targets)
    }

    /// Construct with explicit probe targets (overriding the defaults).
    pub fn with_targets(
        cache: ResultCache,
        heuristic: Arc<dyn AdblockHeuristic>,
        prober: Prober,
        clock: Arc<dyn Clock>,
        priority: Vec<NetworkId>,
        targets: Vec<ProbeTarget>,
    ) -> Self {
        Self {
            cache,
            heuristic,
            prober,
            clock,
            priority,
            targets,
            cycle: Mutex::new(()),
            cycles_run: AtomicU64::new(0),
        }
    }

    /// Resolve the preferred network, probing on a cache miss.
    ///
    /// Concurrent callers while a cycle is in flight do not launch a
    /// second cycle; they wait on the guard and observe the finished
    /// cycle's result through the cache re-read.
    pub async fn resolve(&self) -> PreferredNetwork {
        if let Some(record) = self.cache.get() {
            return self.rank(&record);
        }

        let _guard = self.cycle.lock().await;

        // A caller that held the guard before us may have completed the
        // cycle already; its write-back satisfies us.
        if let Some(record) = self.cache.get() {
            return self.rank(&record);
        }

        let record = self.run_cycle().await;
        self.rank(&record)
    }

    /// Invalidate the cache and run a fresh cycle, ignoring TTL.
    ///
    /// Probes of a previously in-flight cycle are not cancelled; their
    /// results are simply discarded when this cycle overwrites the cache.
    pub async fn force_retest(&self) -> PreferredNetwork {
        self.cache.invalidate();

        let _guard = self.cycle.lock().await;
        let record = self.run_cycle().await;
        self.rank(&record)
    }

    /// Raw verdicts currently backing `resolve`, if any are cached.
    pub fn current_record(&self) -> Option<HealthRecord> {
        self.cache.get()
    }

    /// Number of probe cycles this service has run.
    pub fn cycles_run(&self) -> u64 {
        self.cycles_run.load(Ordering::Relaxed)
    }

    async fn run_cycle(&self) -> HealthRecord {
        self.cycles_run.fetch_add(1, Ordering::Relaxed);

        let verdicts: HashMap<NetworkId, Verdict> = if self.heuristic.detect() {
            // Probing known-blocked networks is wasted latency and may
            // itself be logged by the blocker.
            info!("content blocker detected, short-circuiting all networks to blocked");
            self.targets
                .iter()
                .map(|t| (t.network, Verdict::Blocked))
                .collect()
        } else {
            self.prober.test_all(&self.targets).await
        };

        let record = HealthRecord::new(verdicts, self.clock.now_ms());
        if let Err(e) = self.cache.put(&record) {
            warn!("failed to persist health record: {}", e);
        }

        debug!(
            "probe cycle complete: {} networks, observed_at={}",
            record.verdicts().len(),
            record.observed_at()
        );
        record
    }

    fn rank(&self, record: &HealthRecord) -> PreferredNetwork {
        for network in &self.priority {
            if record.verdict(*network).is_available() {
                return PreferredNetwork::Network(*network);
            }
        }
        PreferredNetwork::Fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::heuristic::AdblockHeuristic;
    use crate::prober::{LoadSignal, ProbeError, ProbeHandle, ResourceLoader};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::time::Duration;

    struct FixedHeuristic(bool);

    impl AdblockHeuristic for FixedHeuristic {
        fn detect(&self) -> bool {
            self.0
        }
    }

    struct FixedHandle(Verdict);

    #[async_trait]
    impl ProbeHandle for FixedHandle {
        async fn signal(&self) -> Result<LoadSignal, ProbeError> {
            match self.0 {
                Verdict::Available => Ok(LoadSignal::Loaded),
                _ => Ok(LoadSignal::Failed),
            }
        }

        fn attached(&self) -> bool {
            true
        }

        fn cleanup(&self) {}
    }

    /// Loader that answers each network with a scripted verdict and
    /// counts how many probes were issued.
    struct ScriptedLoader {
        verdicts: HashMap<NetworkId, Verdict>,
        begins: AtomicU64,
    }

    impl ScriptedLoader {
        fn new(verdicts: &[(NetworkId, Verdict)]) -> Self {
            Self {
                verdicts: verdicts.iter().copied().collect(),
                begins: AtomicU64::new(0),
            }
        }
    }

    #[async_trait]
    impl ResourceLoader for &'static ScriptedLoader {
        async fn begin(&self, target: &ProbeTarget) -> Result<Box<dyn ProbeHandle>, ProbeError> {
            self.begins.fetch_add(1, Ordering::SeqCst);
            let verdict = self
                .verdicts
                .get(&target.network)
                .copied()
                .unwrap_or(Verdict::Blocked);
            Ok(Box::new(FixedHandle(verdict)))
        }
    }

    fn leak(loader: ScriptedLoader) -> &'static ScriptedLoader {
        Box::leak(Box::new(loader))
    }

    fn service(
        loader: &'static ScriptedLoader,
        blocker_present: bool,
        clock: Arc<ManualClock>,
    ) -> HealthService {
        let store = Arc::new(MemoryStore::new());
        let cache = ResultCache::with_ttl(store, clock.clone(), Duration::from_secs(60));
        let prober = Prober::with_timing(
            Arc::new(loader),
            Duration::from_millis(100),
            Duration::from_millis(20),
        );
        HealthService::new(
            cache,
            Arc::new(FixedHeuristic(blocker_present)),
            prober,
            clock,
            vec![NetworkId::AdSense, NetworkId::Adsterra],
        )
    }

    #[tokio::test]
    async fn test_blocker_present_means_fallback_and_no_probes() {
        let loader = leak(ScriptedLoader::new(&[(
            NetworkId::AdSense,
            Verdict::Available,
        )]));
        let service = service(loader, true, Arc::new(ManualClock::new(0)));

        assert_eq!(service.resolve().await, PreferredNetwork::Fallback);
        assert_eq!(loader.begins.load(Ordering::SeqCst), 0);

        // The short-circuited verdicts were still cached
        let record = service.current_record().unwrap();
        assert_eq!(record.verdict(NetworkId::AdSense), Verdict::Blocked);
    }

    #[tokio::test]
    async fn test_priority_law_first_available_wins() {
        let loader = leak(ScriptedLoader::new(&[
            (NetworkId::AdSense, Verdict::Blocked),
            (NetworkId::Adsterra, Verdict::Available),
        ]));
        let svc = service(loader, false, Arc::new(ManualClock::new(0)));
        assert_eq!(
            svc.resolve().await,
            PreferredNetwork::Network(NetworkId::Adsterra)
        );

        let loader = leak(ScriptedLoader::new(&[
            (NetworkId::AdSense, Verdict::Available),
            (NetworkId::Adsterra, Verdict::Available),
        ]));
        let svc = service(loader, false, Arc::new(ManualClock::new(0)));
        assert_eq!(
            svc.resolve().await,
            PreferredNetwork::Network(NetworkId::AdSense)
        );
    }

    #[tokio::test]
    async fn test_all_blocked_means_fallback() {
        let loader = leak(ScriptedLoader::new(&[
            (NetworkId::AdSense, Verdict::Blocked),
            (NetworkId::Adsterra, Verdict::Blocked),
        ]));
        let service = service(loader, false, Arc::new(ManualClock::new(0)));
        assert_eq!(service.resolve().await, PreferredNetwork::Fallback);
    }

    #[tokio::test]
    async fn test_resolve_within_ttl_runs_one_cycle() {
        let loader = leak(ScriptedLoader::new(&[(
            NetworkId::AdSense,
            Verdict::Available,
        )]));
        let service = service(loader, false, Arc::new(ManualClock::new(0)));

        let first = service.resolve().await;
        let second = service.resolve().await;

        assert_eq!(first, second);
        assert_eq!(service.cycles_run(), 1);
        assert_eq!(loader.begins.load(Ordering::SeqCst), 2); // one per network
    }

    #[tokio::test]
    async fn test_expired_cache_triggers_a_new_cycle() {
        let clock = Arc::new(ManualClock::new(0));
        let loader = leak(ScriptedLoader::new(&[(
            NetworkId::AdSense,
            Verdict::Available,
        )]));
        let service = service(loader, false, clock.clone());

        service.resolve().await;
        clock.advance(Duration::from_secs(61));
        service.resolve().await;

        assert_eq!(service.cycles_run(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_resolves_share_one_cycle() {
        let loader = leak(ScriptedLoader::new(&[(
            NetworkId::AdSense,
            Verdict::Available,
        )]));
        let service = Arc::new(service(loader, false, Arc::new(ManualClock::new(0))));

        let a = {
            let s = service.clone();
            tokio::spawn(async move { s.resolve().await })
        };
        let b = {
            let s = service.clone();
            tokio::spawn(async move { s.resolve().await })
        };

        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        assert_eq!(a, b);
        assert_eq!(service.cycles_run(), 1);
    }

    #[tokio::test]
    async fn test_force_retest_ignores_ttl() {
        let loader = leak(ScriptedLoader::new(&[(
            NetworkId::AdSense,
            Verdict::Available,
        )]));
        let service = service(loader, false, Arc::new(ManualClock::new(0)));

        service.resolve().await;
        service.force_retest().await;

        assert_eq!(service.cycles_run(), 2);
    }
}
