//! Per-network reachability probes.
//!
//! Each probe begins loading the network's small script resource through
//! the injected [`ResourceLoader`], then races three outcomes:
//! 1. the resource reports a successful load -> `Available`
//! 2. the resource reports a load failure   -> `Blocked`
//! 3. a fixed timeout elapses               -> `Blocked`
//! A secondary sweep at a shorter interval catches resources a blocker
//! silently detached without firing an error event. All side effects are
//! cleaned up on every exit path, and all transport failures fold into
//! the `Blocked` verdict rather than surfacing as errors.

use crate::network::{NetworkId, ProbeTarget, Verdict};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Bound on a single network's probe. Per-probe, not per-cycle.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Interval of the silent-detachment sweep.
pub const DETACH_SWEEP_INTERVAL: Duration = Duration::from_millis(500);

/// Terminal signal from a resource load attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSignal {
    Loaded,
    Failed,
}

/// Loader-side failures. Every one of them folds into `Blocked`.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("probe resource failed to start: {0}")]
    Start(String),

    #[error("probe signal channel closed before a signal arrived")]
    ChannelClosed,
}

/// An in-flight probe resource.
#[async_trait]
pub trait ProbeHandle: Send + Sync {
    /// Wait for the resource's terminal load/error signal.
    async fn signal(&self) -> Result<LoadSignal, ProbeError>;

    /// Whether the resource is still attached to the document. A blocker
    /// may remove it without ever firing an error event.
    fn attached(&self) -> bool;

    /// Remove every side effect of the probe. Idempotent.
    fn cleanup(&self);
}

/// Capability that begins loading a network's probe resource.
///
/// The real implementation attaches a script element to the live
/// document; tests inject fakes instead of relying on network timing.
#[async_trait]
pub trait ResourceLoader: Send + Sync {
    async fn begin(&self, target: &ProbeTarget) -> Result<Box<dyn ProbeHandle>, ProbeError>;
}

/// Runs reachability probes against configured networks.
#[derive(Clone)]
pub struct Prober {
    loader: Arc<dyn ResourceLoader>,
    timeout: Duration,
    sweep_interval: Duration,
}

impl Prober {
    pub fn new(loader: Arc<dyn ResourceLoader>) -> Self {
        Self::with_timing(loader, PROBE_TIMEOUT, DETACH_SWEEP_INTERVAL)
    }

    /// Override the race windows. Tests shrink these.
    pub fn with_timing(
        loader: Arc<dyn ResourceLoader>,
        timeout: Duration,
        sweep_interval: Duration,
    ) -> Self {
        Self {
            loader,
            timeout,
            sweep_interval,
        }
    }

    /// Probe a single network.
    pub async fn test_network(&self, target: &ProbeTarget) -> Verdict {
        let handle = match self.loader.begin(target).await {
            Ok(handle) => handle,
            Err(e) => {
                debug!("{} probe failed to start: {}", target.network, e);
                return Verdict::Blocked;
            }
        };

        let verdict = self.race(handle.as_ref(), target.network).await;

        // Cleanup runs on every exit path of the race
        handle.cleanup();
        verdict
    }

    async fn race(&self, handle: &dyn ProbeHandle, network: NetworkId) -> Verdict {
        let mut sweep = tokio::time::interval(self.sweep_interval);
        let deadline = tokio::time::sleep(self.timeout);
        tokio::pin!(deadline);

        let signal = handle.signal();
        tokio::pin!(signal);

        loop {
            tokio::select! {
                outcome = &mut signal => {
                    return match outcome {
                        Ok(LoadSignal::Loaded) => {
                            debug!("{} probe resource loaded", network);
                            Verdict::Available
                        }
                        Ok(LoadSignal::Failed) => {
                            debug!("{} probe resource failed to load", network);
                            Verdict::Blocked
                        }
                        Err(e) => {
                            debug!("{} probe transport error: {}", network, e);
                            Verdict::Blocked
                        }
                    };
                }
                _ = &mut deadline => {
                    debug!("{} probe timed out after {:?}", network, self.timeout);
                    return Verdict::Blocked;
                }
                _ = sweep.tick() => {
                    if !handle.attached() {
                        debug!("{} probe resource silently detached", network);
                        return Verdict::Blocked;
                    }
                }
            }
        }
    }

    /// Probe all targets concurrently. Tasks start in the same tick and
    /// race independently; total latency is bounded by the slowest single
    /// probe, not the sum.
    pub async fn test_all(&self, targets: &[ProbeTarget]) -> HashMap<NetworkId, Verdict> {
        let mut tasks = Vec::with_capacity(targets.len());
        for target in targets {
            let prober = self.clone();
            let target = target.clone();
            tasks.push((
                target.network,
                tokio::spawn(async move { prober.test_network(&target).await }),
            ));
        }

        let mut verdicts = HashMap::with_capacity(tasks.len());
        for (network, task) in tasks {
            let verdict = match task.await {
                Ok(verdict) => verdict,
                Err(e) => {
                    warn!("{} probe task failed: {}", network, e);
                    Verdict::Blocked
                }
            };
            verdicts.insert(network, verdict);
        }
        verdicts
    }
}
