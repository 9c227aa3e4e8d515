//! Static replication topology
//!
//! Built once from [`RouterConfig`] and shared read-only afterwards. The
//! topology resolves each backend's place in the replication graph: which
//! logical database it belongs to, and which backends can serve reads or
//! take over writes for a given logical database.

use std::collections::{HashMap, HashSet};

use crate::config::RouterConfig;
use crate::error::{Error, Result};

/// Immutable view of the replication graph
#[derive(Debug)]
pub struct Topology {
    default_db: String,
    slaves: HashMap<String, Vec<String>>,
    sync_slaves: HashMap<String, Vec<String>>,
    submasters: HashMap<String, Vec<String>>,
    owners: HashMap<String, String>,
    known: HashSet<String>,
}

impl Topology {
    /// Resolve the replication graph from configuration
    ///
    /// Relation lists preserve backend declaration order; submaster failover
    /// depends on it.
    pub fn from_config(config: &RouterConfig) -> Result<Self> {
        let mut known: HashSet<String> = config
            .backends
            .iter()
            .map(|(name, _)| name.clone())
            .collect();
        known.insert(config.default_db.clone());
        known.extend(config.slaves.iter().cloned());

        let mut slaves: HashMap<String, Vec<String>> = HashMap::new();
        let mut sync_slaves: HashMap<String, Vec<String>> = HashMap::new();
        let mut submasters: HashMap<String, Vec<String>> = HashMap::new();
        let mut owners: HashMap<String, String> = HashMap::new();

        let adopt = |owners: &mut HashMap<String, String>,
                     backend: &str,
                     target: &str|
         -> Result<()> {
            match owners.get(backend) {
                Some(existing) if existing != target => Err(Error::configuration(format!(
                    "backend '{}' replicates both '{}' and '{}'",
                    backend, existing, target
                ))),
                _ => {
                    owners.insert(backend.to_string(), target.to_string());
                    Ok(())
                }
            }
        };

        for (name, backend) in &config.backends {
            for target in backend.targets() {
                if !known.contains(target) {
                    return Err(Error::configuration(format!(
                        "backend '{}' replicates unknown database '{}'",
                        name, target
                    )));
                }
                adopt(&mut owners, name, target)?;
            }
            if let Some(target) = &backend.slave_of {
                slaves.entry(target.clone()).or_default().push(name.clone());
            }
            if let Some(target) = &backend.sync_slave_of {
                sync_slaves
                    .entry(target.clone())
                    .or_default()
                    .push(name.clone());
            }
            if let Some(target) = &backend.submaster_of {
                submasters
                    .entry(target.clone())
                    .or_default()
                    .push(name.clone());
            }
        }

        // Legacy flat slave list: union into the default group, declared
        // relations first.
        let default_slaves = slaves.entry(config.default_db.clone()).or_default();
        for name in &config.slaves {
            if !default_slaves.contains(name) {
                default_slaves.push(name.clone());
            }
            adopt(&mut owners, name, &config.default_db)?;
        }
        if default_slaves.is_empty() {
            slaves.remove(&config.default_db);
        }

        // Every replication target and the default database belong to their
        // own group.
        let targets: Vec<String> = slaves
            .keys()
            .chain(sync_slaves.keys())
            .chain(submasters.keys())
            .cloned()
            .collect();
        for target in targets {
            owners.entry(target.clone()).or_insert(target);
        }
        owners
            .entry(config.default_db.clone())
            .or_insert_with(|| config.default_db.clone());

        tracing::debug!(
            "Resolved topology: {} known backends, default '{}'",
            known.len(),
            config.default_db
        );

        Ok(Self {
            default_db: config.default_db.clone(),
            slaves,
            sync_slaves,
            submasters,
            owners,
            known,
        })
    }

    /// Name of the default logical database
    pub fn default_db(&self) -> &str {
        &self.default_db
    }

    /// Asynchronous slaves of `db`, in declaration order
    pub fn slaves(&self, db: &str) -> &[String] {
        self.slaves.get(db).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Synchronous slaves of `db`, in declaration order
    pub fn sync_slaves(&self, db: &str) -> &[String] {
        self.sync_slaves.get(db).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Submasters of `db`, in declaration order
    pub fn submasters(&self, db: &str) -> &[String] {
        self.submasters.get(db).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Logical database whose replication group `backend` belongs to
    ///
    /// Masters belong to their own group; backends outside any group return
    /// `None`.
    pub fn owner(&self, backend: &str) -> Option<&str> {
        self.owners.get(backend).map(String::as_str)
    }

    /// Whether `db` was declared anywhere in the configuration
    pub fn is_known(&self, db: &str) -> bool {
        self.known.contains(db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendConfig;

    fn group_config() -> RouterConfig {
        RouterConfig::default()
            .with_backend("slave1", BackendConfig::slave("default"))
            .with_backend("slave2", BackendConfig::slave("default"))
            .with_backend("sync1", BackendConfig::sync_slave("default"))
            .with_backend("master2", BackendConfig::submaster("default"))
            .with_backend("master3", BackendConfig::submaster("default"))
    }

    #[test]
    fn test_relations_preserve_declaration_order() {
        let topology = Topology::from_config(&group_config()).unwrap();
        assert_eq!(topology.slaves("default"), ["slave1", "slave2"]);
        assert_eq!(topology.sync_slaves("default"), ["sync1"]);
        assert_eq!(topology.submasters("default"), ["master2", "master3"]);
    }

    #[test]
    fn test_owners() {
        let topology = Topology::from_config(&group_config()).unwrap();
        assert_eq!(topology.owner("slave1"), Some("default"));
        assert_eq!(topology.owner("sync1"), Some("default"));
        assert_eq!(topology.owner("master2"), Some("default"));
        // the master heads its own group
        assert_eq!(topology.owner("default"), Some("default"));
        assert_eq!(topology.owner("elsewhere"), None);
    }

    #[test]
    fn test_legacy_slaves_merge_without_duplicates() {
        let config = RouterConfig::default()
            .with_backend("slave1", BackendConfig::slave("default"))
            .with_slaves(["slave1", "slave2", "slave2"]);
        let topology = Topology::from_config(&config).unwrap();
        assert_eq!(topology.slaves("default"), ["slave1", "slave2"]);
        assert_eq!(topology.owner("slave2"), Some("default"));
    }

    #[test]
    fn test_unknown_target_rejected() {
        let config =
            RouterConfig::default().with_backend("slave1", BackendConfig::slave("missing"));
        assert!(Topology::from_config(&config).is_err());
    }

    #[test]
    fn test_conflicting_owners_rejected() {
        let config = RouterConfig::default()
            .with_backend("other", BackendConfig::standalone())
            .with_backend(
                "torn",
                BackendConfig {
                    slave_of: Some("default".to_string()),
                    submaster_of: Some("other".to_string()),
                    ..BackendConfig::default()
                },
            );
        assert!(Topology::from_config(&config).is_err());
    }

    #[test]
    fn test_same_owner_through_two_relations_allowed() {
        let config = RouterConfig::default().with_backend(
            "standby",
            BackendConfig {
                sync_slave_of: Some("default".to_string()),
                submaster_of: Some("default".to_string()),
                ..BackendConfig::default()
            },
        );
        let topology = Topology::from_config(&config).unwrap();
        assert_eq!(topology.sync_slaves("default"), ["standby"]);
        assert_eq!(topology.submasters("default"), ["standby"]);
        assert_eq!(topology.owner("standby"), Some("default"));
    }

    #[test]
    fn test_known_covers_default_and_legacy() {
        let config = RouterConfig::default().with_slaves(["slave1"]);
        let topology = Topology::from_config(&config).unwrap();
        assert!(topology.is_known("default"));
        assert!(topology.is_known("slave1"));
        assert!(!topology.is_known("slave2"));
    }

    #[test]
    fn test_empty_relations_for_unknown_db() {
        let topology = Topology::from_config(&RouterConfig::default()).unwrap();
        assert!(topology.slaves("default").is_empty());
        assert!(topology.submasters("anything").is_empty());
    }
}
