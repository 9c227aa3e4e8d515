//! Error types for the routing engine

use thiserror::Error;

use crate::context::RoutingState;

/// Result type alias using the routing Error
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for replication-aware routing
///
/// Probe failures are deliberately absent: the liveness cache converts them
/// to dead verdicts and they never escape the engine.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid topology declarations, or routing of a logical database the
    /// topology does not know
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A write was routed while the routing state forbids writes
    #[error("write attempted in {state} state")]
    StateViolation {
        /// The routing state the context was in when the write arrived
        state: RoutingState,
    },

    /// The use_state/revert pairing was broken by the caller
    #[error("context misuse: {0}")]
    ContextMisuse(String),
}

impl Error {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a context misuse error
    pub fn context_misuse(msg: impl Into<String>) -> Self {
        Self::ContextMisuse(msg.into())
    }
}
