//! Backend selection
//!
//! Turns the static topology plus current liveness verdicts into concrete
//! backend choices. Write selection walks a deterministic failover ladder;
//! read selection spreads load by shuffling the replica pool. Every path
//! ends at the primary itself, unchecked, so routing always produces a
//! backend name.

use std::sync::Arc;

use rand::seq::SliceRandom;

use crate::config::ReplicaSelection;
use crate::context::RoutingContext;
use crate::liveness::LivenessCache;
use crate::topology::Topology;

/// Chooses backends for reads and writes
pub struct Selector {
    topology: Arc<Topology>,
    liveness: Arc<LivenessCache>,
    replica_selection: ReplicaSelection,
    master_fallback: bool,
}

impl Selector {
    /// Create a selector over `topology` using `liveness` verdicts
    pub fn new(
        topology: Arc<Topology>,
        liveness: Arc<LivenessCache>,
        replica_selection: ReplicaSelection,
        master_fallback: bool,
    ) -> Self {
        Self {
            topology,
            liveness,
            replica_selection,
            master_fallback,
        }
    }

    /// Choose the master for `db` and pin it in `context`
    ///
    /// A previously pinned master is kept as long as master fallback is off
    /// or the backend is still alive. Otherwise the ladder runs: the primary
    /// first, then each submaster in declaration order, first alive wins,
    /// and the primary is the unchecked last resort.
    pub fn select_master(&self, context: &mut RoutingContext, db: &str) -> String {
        let pinned = context.sticky_master(db).map(str::to_string);
        if let Some(backend) = &pinned {
            if !self.master_fallback || self.liveness.is_alive(backend) {
                return backend.clone();
            }
        }

        let chosen = std::iter::once(db)
            .chain(self.topology.submasters(db).iter().map(String::as_str))
            .find(|candidate| self.liveness.is_alive(candidate))
            .unwrap_or(db)
            .to_string();

        match &pinned {
            Some(previous) if *previous != chosen => {
                tracing::info!(
                    "Master for '{}' failed over from '{}' to '{}'",
                    db,
                    previous,
                    chosen
                );
            }
            None if chosen != db => {
                tracing::info!("Master for '{}' failed over to '{}'", db, chosen);
            }
            _ => {}
        }

        context.pin_master(db, &chosen);
        chosen
    }

    /// Choose a replica to read `db` from
    ///
    /// Slaves are shuffled and walked for the first alive backend, then
    /// submasters the same way, then the primary unchecked.
    pub fn select_slave(&self, db: &str) -> String {
        let mut replicas: Vec<&str> = self
            .topology
            .slaves(db)
            .iter()
            .map(String::as_str)
            .collect();
        if self.replica_selection == ReplicaSelection::AllSlaves {
            replicas.extend(self.topology.sync_slaves(db).iter().map(String::as_str));
        }

        let mut submasters: Vec<&str> = self
            .topology
            .submasters(db)
            .iter()
            .map(String::as_str)
            .collect();

        let mut rng = rand::thread_rng();
        replicas.shuffle(&mut rng);
        submasters.shuffle(&mut rng);

        let chosen = self
            .first_alive(&replicas)
            .or_else(|| self.first_alive(&submasters))
            .unwrap_or(db);
        tracing::debug!("Read for '{}' routed to '{}'", db, chosen);
        chosen.to_string()
    }

    fn first_alive<'a>(&self, candidates: &[&'a str]) -> Option<&'a str> {
        candidates
            .iter()
            .copied()
            .find(|backend| self.liveness.is_alive(backend))
    }
}
