//! Backend liveness tracking
//!
//! Probe outcomes are cached per backend for a configurable window, so a
//! dead backend is retried at most once per window and a live backend is
//! not probed on every routing decision. Verdicts are shared by all
//! routing contexts.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Checks whether a backend currently accepts connections
///
/// Implementations wrap whatever connectivity test the deployment uses
/// (a ping, a trivial query). A returned error counts as a dead backend
/// and never propagates into routing decisions.
pub trait Prober: Send + Sync {
    /// Probe `backend`, returning whether it is alive
    fn probe(&self, backend: &str) -> anyhow::Result<bool>;
}

/// A cached probe outcome
#[derive(Debug, Clone, Copy)]
struct Verdict {
    alive: bool,
    checked_at: Instant,
}

impl Verdict {
    fn new(alive: bool) -> Self {
        Self {
            alive,
            checked_at: Instant::now(),
        }
    }

    /// Check if the verdict has outlived `window`
    fn is_expired(&self, window: Duration) -> bool {
        self.checked_at.elapsed() > window
    }
}

/// Caching liveness tracker shared across routing contexts
pub struct LivenessCache {
    prober: Arc<dyn Prober>,
    verdicts: DashMap<String, Verdict>,
    enabled: bool,
    downtime: Duration,
}

impl LivenessCache {
    /// Create a cache probing through `prober`
    ///
    /// When `enabled` is false every backend counts as alive and the
    /// prober is never called.
    pub fn new(prober: Arc<dyn Prober>, enabled: bool, downtime: Duration) -> Self {
        Self {
            prober,
            verdicts: DashMap::new(),
            enabled,
            downtime,
        }
    }

    /// Whether `backend` is alive, per the configured verdict window
    pub fn is_alive(&self, backend: &str) -> bool {
        self.is_alive_within(backend, self.downtime, 1)
    }

    /// Whether `backend` is alive, against an explicit window and probe
    /// budget
    ///
    /// A fresh cached verdict is returned as-is. Otherwise the backend is
    /// probed up to `tries` times, stopping at the first success, and the
    /// outcome replaces the cached verdict. Both live and dead verdicts
    /// stay authoritative for the same window.
    pub fn is_alive_within(&self, backend: &str, window: Duration, tries: u32) -> bool {
        if !self.enabled {
            return true;
        }

        let previous = match self.verdicts.get(backend) {
            Some(verdict) if !verdict.is_expired(window) => return verdict.alive,
            Some(verdict) => Some(verdict.alive),
            None => None,
        };

        let alive = self.run_probe(backend, tries);
        self.verdicts.insert(backend.to_string(), Verdict::new(alive));

        match (previous, alive) {
            (Some(false), true) => tracing::info!("Backend '{}' recovered", backend),
            (_, false) => tracing::warn!("Backend '{}' is down", backend),
            _ => {}
        }

        alive
    }

    /// Record `backend` as dead for the next verdict window without probing
    pub fn mark_dead(&self, backend: &str) {
        self.verdicts.insert(backend.to_string(), Verdict::new(false));
        tracing::warn!("Backend '{}' marked dead", backend);
    }

    fn run_probe(&self, backend: &str, tries: u32) -> bool {
        let mut alive = false;
        for attempt in 1..=tries.max(1) {
            alive = match self.prober.probe(backend) {
                Ok(alive) => alive,
                Err(err) => {
                    tracing::warn!(
                        "Probe of backend '{}' failed (attempt {}): {}",
                        backend,
                        attempt,
                        err
                    );
                    false
                }
            };
            if alive {
                break;
            }
        }
        alive
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockProber;

    fn cache_with(prober: &Arc<MockProber>, downtime: Duration) -> LivenessCache {
        LivenessCache::new(prober.clone(), true, downtime)
    }

    #[test]
    fn test_disabled_cache_skips_probing() {
        let prober = Arc::new(MockProber::new());
        prober.set_alive("db", false);
        let cache = LivenessCache::new(prober.clone(), false, Duration::from_secs(60));
        assert!(cache.is_alive("db"));
        assert_eq!(prober.probes("db"), 0);
    }

    #[test]
    fn test_verdict_cached_within_window() {
        let prober = Arc::new(MockProber::new());
        let cache = cache_with(&prober, Duration::from_secs(60));
        assert!(cache.is_alive("db"));
        assert!(cache.is_alive("db"));
        assert_eq!(prober.probes("db"), 1);
    }

    #[test]
    fn test_dead_verdict_cached_symmetrically() {
        let prober = Arc::new(MockProber::new());
        prober.set_alive("db", false);
        let cache = cache_with(&prober, Duration::from_secs(60));
        assert!(!cache.is_alive("db"));
        // recovery is not observed until the verdict expires
        prober.set_alive("db", true);
        assert!(!cache.is_alive("db"));
        assert_eq!(prober.probes("db"), 1);
    }

    #[test]
    fn test_stale_verdict_reprobed() {
        let prober = Arc::new(MockProber::new());
        prober.set_alive("db", false);
        let cache = cache_with(&prober, Duration::from_millis(1));
        assert!(!cache.is_alive("db"));
        prober.set_alive("db", true);
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.is_alive("db"));
        assert_eq!(prober.probes("db"), 2);
    }

    #[test]
    fn test_probe_error_counts_as_dead() {
        let prober = Arc::new(MockProber::new());
        prober.set_error("db");
        let cache = cache_with(&prober, Duration::from_secs(60));
        assert!(!cache.is_alive("db"));
        assert_eq!(prober.probes("db"), 1);
    }

    #[test]
    fn test_tries_stop_at_first_success() {
        let prober = Arc::new(MockProber::new());
        let cache = cache_with(&prober, Duration::from_secs(60));
        assert!(cache.is_alive_within("db", Duration::from_secs(60), 3));
        assert_eq!(prober.probes("db"), 1);
    }

    #[test]
    fn test_tries_exhausted_when_dead() {
        let prober = Arc::new(MockProber::new());
        prober.set_alive("db", false);
        let cache = cache_with(&prober, Duration::from_secs(60));
        assert!(!cache.is_alive_within("db", Duration::from_secs(60), 3));
        assert_eq!(prober.probes("db"), 3);
    }

    #[test]
    fn test_zero_tries_probes_once() {
        let prober = Arc::new(MockProber::new());
        let cache = cache_with(&prober, Duration::from_secs(60));
        assert!(cache.is_alive_within("db", Duration::from_secs(60), 0));
        assert_eq!(prober.probes("db"), 1);
    }

    #[test]
    fn test_mark_dead_overrides_probing() {
        let prober = Arc::new(MockProber::new());
        let cache = cache_with(&prober, Duration::from_secs(60));
        cache.mark_dead("db");
        assert!(!cache.is_alive("db"));
        assert_eq!(prober.probes("db"), 0);
    }

    #[test]
    fn test_verdicts_are_per_backend() {
        let prober = Arc::new(MockProber::new());
        prober.set_alive("dead", false);
        let cache = cache_with(&prober, Duration::from_secs(60));
        assert!(!cache.is_alive("dead"));
        assert!(cache.is_alive("live"));
    }
}
