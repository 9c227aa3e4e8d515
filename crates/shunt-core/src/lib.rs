//! Shunt Core - Replication-Aware Database Routing Engine
//!
//! This crate decides which database backend serves each read and write in
//! a master/replica deployment, implementing:
//! - Static replication topology (slaves, synchronous slaves, submasters)
//! - Cached liveness tracking with a symmetric downtime window
//! - Per-unit-of-work routing context (state stack, memoized decisions)
//! - Master failover ladder and randomized replica selection
//! - Replication-group relation checks and a service read-only probe
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                  Router                     │
//! │  (db_for_read / db_for_write / relations)   │
//! └──────────┬───────────────────┬──────────────┘
//!            │                   │
//! ┌──────────┴─────────┐ ┌───────┴─────────────┐
//! │   RoutingContext   │ │      Selector       │
//! │  (per-unit-of-work │ │  (failover ladder,  │
//! │   state stack)     │ │   replica shuffle)  │
//! └────────────────────┘ └───────┬─────────────┘
//!                                │
//!                  ┌─────────────┴─┬─────────────┐
//!                  │ LivenessCache │  Topology   │
//!                  │  (verdicts +  │  (groups,   │
//!                  │   prober)     │   owners)   │
//!                  └───────────────┴─────────────┘
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod context;
pub mod error;
pub mod liveness;
pub mod router;
pub mod selection;
pub mod testing;
pub mod topology;

pub use config::{BackendConfig, ReplicaSelection, RouterConfig};
pub use context::{RoutingContext, RoutingState};
pub use error::{Error, Result};
pub use liveness::{LivenessCache, Prober};
pub use router::Router;
pub use selection::Selector;
pub use topology::Topology;
