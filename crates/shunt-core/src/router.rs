//! Replication-aware routing facade
//!
//! [`Router`] is the long-lived entry point: built once from configuration,
//! shared across units of work, and handed a mutable [`RoutingContext`] per
//! call. All routing decisions funnel through here.

use std::sync::Arc;
use std::time::Duration;

use crate::config::RouterConfig;
use crate::context::{RoutingContext, RoutingState};
use crate::error::{Error, Result};
use crate::liveness::{LivenessCache, Prober};
use crate::selection::Selector;
use crate::topology::Topology;

/// Replication-aware database router
pub struct Router {
    topology: Arc<Topology>,
    liveness: Arc<LivenessCache>,
    selector: Selector,
    write_guard: bool,
    read_only_downtime: Duration,
    read_only_tries: u32,
}

impl Router {
    /// Build a router from `config`, probing backends through `prober`
    pub fn new(config: RouterConfig, prober: Arc<dyn Prober>) -> Result<Self> {
        config.validate()?;
        let topology = Arc::new(Topology::from_config(&config)?);
        let liveness = Arc::new(LivenessCache::new(
            prober,
            config.check_liveness,
            config.downtime,
        ));
        let selector = Selector::new(
            topology.clone(),
            liveness.clone(),
            config.replica_selection,
            config.master_fallback,
        );

        tracing::debug!(
            "Router ready: default '{}', liveness checking {}",
            topology.default_db(),
            if config.check_liveness { "on" } else { "off" }
        );

        Ok(Self {
            topology,
            liveness,
            selector,
            write_guard: config.write_guard,
            read_only_downtime: config.read_only_downtime,
            read_only_tries: config.read_only_tries,
        })
    }

    /// Replication topology the router routes over
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Liveness cache shared by all routing decisions
    pub fn liveness(&self) -> &LivenessCache {
        &self.liveness
    }

    /// Backend that serves writes to `db` for this unit of work
    ///
    /// Writes are rejected while the context is in slave state and the
    /// write guard is on. The decision overwrites any memoized read for
    /// the same state, so later reads observe the write's backend.
    pub fn db_for_write(&self, context: &mut RoutingContext, db: &str) -> Result<String> {
        self.ensure_known(db)?;
        let state = context.state();
        if state != RoutingState::Master && self.write_guard {
            return Err(Error::StateViolation { state });
        }
        let chosen = self.selector.select_master(context, db);
        context.remember(state, db, &chosen);
        Ok(chosen)
    }

    /// Backend that serves reads from `db` for this unit of work
    ///
    /// In master state reads go wherever writes go. In slave state the
    /// first call picks a replica and later calls return the same one.
    pub fn db_for_read(&self, context: &mut RoutingContext, db: &str) -> Result<String> {
        self.ensure_known(db)?;
        let state = context.state();
        if state == RoutingState::Master {
            return self.db_for_write(context, db);
        }
        if let Some(backend) = context.chosen(state, db) {
            return Ok(backend.to_string());
        }
        let chosen = self.selector.select_slave(db);
        context.remember(state, db, &chosen);
        Ok(chosen)
    }

    /// Whether `a` and `b` belong to the same replication group
    ///
    /// Backends outside any known group are never blocked.
    pub fn allow_relation(&self, a: &str, b: &str) -> bool {
        match (self.topology.owner(a), self.topology.owner(b)) {
            (Some(left), Some(right)) => left == right,
            _ => true,
        }
    }

    /// Whether the service should treat `db` as read-only right now
    ///
    /// Uses the dedicated read-only verdict window and probe budget, which
    /// are tighter than the routing window by default.
    pub fn is_read_only(&self, db: &str) -> bool {
        !self
            .liveness
            .is_alive_within(db, self.read_only_downtime, self.read_only_tries)
    }

    fn ensure_known(&self, db: &str) -> Result<()> {
        if self.topology.is_known(db) {
            return Ok(());
        }
        Err(Error::configuration(format!(
            "unknown logical database '{}'",
            db
        )))
    }
}
