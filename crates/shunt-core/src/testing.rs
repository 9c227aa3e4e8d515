//! Test doubles for exercising routing without real backends

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;

use crate::liveness::Prober;

/// Scriptable in-memory prober
///
/// Every backend reports alive until told otherwise. Verdicts can be
/// flipped per backend, probes can be made to fail outright, and probe
/// counts are recorded for inspection.
pub struct MockProber {
    verdicts: Mutex<HashMap<String, bool>>,
    errors: Mutex<HashSet<String>>,
    counts: Mutex<HashMap<String, u64>>,
}

impl MockProber {
    /// A prober that reports every backend alive
    pub fn new() -> Self {
        Self {
            verdicts: Mutex::new(HashMap::new()),
            errors: Mutex::new(HashSet::new()),
            counts: Mutex::new(HashMap::new()),
        }
    }

    /// Script the verdict for `backend`
    ///
    /// Clears any injected probe failure for it.
    pub fn set_alive(&self, backend: &str, alive: bool) {
        self.errors.lock().remove(backend);
        self.verdicts.lock().insert(backend.to_string(), alive);
    }

    /// Make probes of `backend` return an error instead of a verdict
    pub fn set_error(&self, backend: &str) {
        self.errors.lock().insert(backend.to_string());
    }

    /// Number of times `backend` has been probed
    pub fn probes(&self, backend: &str) -> u64 {
        self.counts.lock().get(backend).copied().unwrap_or(0)
    }

    /// Total probes across all backends
    pub fn total_probes(&self) -> u64 {
        self.counts.lock().values().sum()
    }
}

impl Default for MockProber {
    fn default() -> Self {
        Self::new()
    }
}

impl Prober for MockProber {
    fn probe(&self, backend: &str) -> anyhow::Result<bool> {
        *self.counts.lock().entry(backend.to_string()).or_insert(0) += 1;
        if self.errors.lock().contains(backend) {
            anyhow::bail!("injected probe failure for '{}'", backend);
        }
        Ok(self.verdicts.lock().get(backend).copied().unwrap_or(true))
    }
}
