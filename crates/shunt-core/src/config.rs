//! Routing engine configuration
//!
//! Every recognized option is an explicit field with a documented default;
//! configuration is deserialized once at startup and never consulted
//! dynamically afterwards.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

/// Which replica kinds may serve reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplicaSelection {
    /// Reads draw from asynchronous slaves, then submasters
    AsyncSlaves,
    /// Synchronous slaves join the replica pool alongside asynchronous ones
    AllSlaves,
}

impl Default for ReplicaSelection {
    fn default() -> Self {
        Self::AsyncSlaves
    }
}

/// Replication relations declared by a single backend
///
/// A backend may declare at most one owning logical database; declaring two
/// different relation targets is rejected at topology construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Logical database this backend replicates as an asynchronous slave
    pub slave_of: Option<String>,
    /// Logical database this backend replicates as a synchronous slave
    pub sync_slave_of: Option<String>,
    /// Logical database this backend can act as an alternate master for
    pub submaster_of: Option<String>,
}

impl BackendConfig {
    /// A backend with no replication relations (e.g. a primary)
    pub fn standalone() -> Self {
        Self::default()
    }

    /// An asynchronous slave of `db`
    pub fn slave(db: impl Into<String>) -> Self {
        Self {
            slave_of: Some(db.into()),
            ..Self::default()
        }
    }

    /// A synchronous slave of `db`
    pub fn sync_slave(db: impl Into<String>) -> Self {
        Self {
            sync_slave_of: Some(db.into()),
            ..Self::default()
        }
    }

    /// A submaster (failover master) of `db`
    pub fn submaster(db: impl Into<String>) -> Self {
        Self {
            submaster_of: Some(db.into()),
            ..Self::default()
        }
    }

    /// Relation targets this backend declares, in (slave, sync slave,
    /// submaster) order
    pub(crate) fn targets(&self) -> impl Iterator<Item = &String> {
        self.slave_of
            .iter()
            .chain(self.sync_slave_of.iter())
            .chain(self.submaster_of.iter())
    }
}

/// Routing engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Name of the default logical database
    pub default_db: String,

    /// Backend declarations, in declaration order
    ///
    /// Order matters: submaster fallback walks candidates in the order they
    /// were declared here.
    pub backends: Vec<(String, BackendConfig)>,

    /// Legacy flat list of slaves of the default logical database, merged
    /// (union, de-duplicated) into its slave list
    pub slaves: Vec<String>,

    /// Enable liveness checking; when off, every backend counts as alive
    pub check_liveness: bool,

    /// How long a cached liveness verdict stays authoritative
    pub downtime: Duration,

    /// Reject writes while the routing state is not master
    pub write_guard: bool,

    /// Re-probe a pinned master on every write and fail over when it is down
    pub master_fallback: bool,

    /// Which replica kinds may serve reads
    pub replica_selection: ReplicaSelection,

    /// Verdict freshness window for the service read-only check
    pub read_only_downtime: Duration,

    /// Probe attempts per backend for the service read-only check
    pub read_only_tries: u32,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            default_db: "default".to_string(),
            backends: Vec::new(),
            slaves: Vec::new(),
            check_liveness: true,
            downtime: Duration::from_secs(60),
            write_guard: true,
            master_fallback: false,
            replica_selection: ReplicaSelection::AsyncSlaves,
            read_only_downtime: Duration::from_secs(20),
            read_only_tries: 1,
        }
    }
}

impl RouterConfig {
    /// Configuration for a replication group rooted at `default_db`
    pub fn new(default_db: impl Into<String>) -> Self {
        Self {
            default_db: default_db.into(),
            ..Self::default()
        }
    }

    /// Declare a backend and its replication relations
    pub fn with_backend(mut self, name: impl Into<String>, backend: BackendConfig) -> Self {
        self.backends.push((name.into(), backend));
        self
    }

    /// Declare slaves of the default logical database (legacy flat form)
    pub fn with_slaves<I, S>(mut self, slaves: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.slaves.extend(slaves.into_iter().map(Into::into));
        self
    }

    /// Enable or disable liveness checking
    pub fn with_liveness_check(mut self, enabled: bool) -> Self {
        self.check_liveness = enabled;
        self
    }

    /// Set the liveness verdict window
    pub fn with_downtime(mut self, downtime: Duration) -> Self {
        self.downtime = downtime;
        self
    }

    /// Enable or disable the write guard
    pub fn with_write_guard(mut self, enabled: bool) -> Self {
        self.write_guard = enabled;
        self
    }

    /// Enable or disable master fallback
    pub fn with_master_fallback(mut self, enabled: bool) -> Self {
        self.master_fallback = enabled;
        self
    }

    /// Set the replica kinds that may serve reads
    pub fn with_replica_selection(mut self, selection: ReplicaSelection) -> Self {
        self.replica_selection = selection;
        self
    }

    /// Set the window and probe budget for the service read-only check
    pub fn with_read_only_probe(mut self, window: Duration, tries: u32) -> Self {
        self.read_only_downtime = window;
        self.read_only_tries = tries;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.downtime.is_zero() {
            return Err(Error::configuration("downtime must be non-zero"));
        }
        if self.read_only_tries == 0 {
            return Err(Error::configuration("read_only_tries must be at least 1"));
        }
        let mut seen = std::collections::HashSet::new();
        for (name, backend) in &self.backends {
            if !seen.insert(name.as_str()) {
                return Err(Error::configuration(format!(
                    "backend '{}' declared twice",
                    name
                )));
            }
            if backend.targets().any(|target| target == name) {
                return Err(Error::configuration(format!(
                    "backend '{}' cannot replicate from itself",
                    name
                )));
            }
        }
        Ok(())
    }
}
