//! Per-unit-of-work routing context
//!
//! Each unit of work (a request, a job) carries its own [`RoutingContext`].
//! The context holds the declared routing intent as a stack, memoized
//! routing decisions, and the master each logical database is pinned to.
//! Contexts are plain values; nothing here is shared between units of work.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Declared routing intent for a unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingState {
    /// Reads and writes both go to a master
    Master,
    /// Reads may go to replicas; writes are rejected while guarded
    Slave,
}

impl Default for RoutingState {
    fn default() -> Self {
        Self::Master
    }
}

impl fmt::Display for RoutingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Master => "master",
            Self::Slave => "slave",
        };
        f.write_str(label)
    }
}

impl FromStr for RoutingState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "master" => Ok(Self::Master),
            "slave" => Ok(Self::Slave),
            other => Err(Error::configuration(format!(
                "unknown routing state '{}'",
                other
            ))),
        }
    }
}

/// Mutable routing state for a single unit of work
#[derive(Debug, Clone)]
pub struct RoutingContext {
    state_stack: Vec<RoutingState>,
    chosen: HashMap<(RoutingState, String), String>,
    sticky_masters: HashMap<String, String>,
    state_change_enabled: bool,
}

impl RoutingContext {
    /// A fresh context with an empty state stack
    pub fn new() -> Self {
        Self {
            state_stack: Vec::new(),
            chosen: HashMap::new(),
            sticky_masters: HashMap::new(),
            state_change_enabled: true,
        }
    }

    /// A fresh context already in `state`
    pub fn with_state(state: RoutingState) -> Self {
        let mut context = Self::new();
        context.use_state(state);
        context
    }

    /// Reset the context for a new unit of work and enter `state`
    ///
    /// Drops memoized decisions, pinned masters, and any pinned-state
    /// setting from the previous unit of work.
    pub fn init(&mut self, state: RoutingState) {
        *self = Self::new();
        self.use_state(state);
    }

    /// Current routing state
    ///
    /// A context with no declared state behaves as master.
    pub fn state(&self) -> RoutingState {
        self.state_stack.last().copied().unwrap_or_default()
    }

    /// Enter `state` until the matching [`revert`](Self::revert)
    ///
    /// While state changes are pinned via
    /// [`set_state_change`](Self::set_state_change), the current state is
    /// re-entered instead, keeping the stack paired with `revert` calls.
    pub fn use_state(&mut self, state: RoutingState) -> &mut Self {
        let state = if self.state_change_enabled {
            state
        } else {
            self.state()
        };
        self.state_stack.push(state);
        self
    }

    /// Leave the innermost state entered with [`use_state`](Self::use_state)
    pub fn revert(&mut self) -> Result<()> {
        match self.state_stack.pop() {
            Some(_) => Ok(()),
            None => Err(Error::context_misuse(
                "revert() without matching use_state()",
            )),
        }
    }

    /// Allow or pin state changes
    ///
    /// While disabled, [`use_state`](Self::use_state) keeps the current
    /// state regardless of the state it was asked for.
    pub fn set_state_change(&mut self, enabled: bool) {
        self.state_change_enabled = enabled;
    }

    /// Memoized backend for `db` in `state`, if any
    pub fn chosen(&self, state: RoutingState, db: &str) -> Option<&str> {
        self.chosen
            .get(&(state, db.to_string()))
            .map(String::as_str)
    }

    /// Memoize `backend` as the decision for `db` in `state`
    pub fn remember(&mut self, state: RoutingState, db: &str, backend: &str) {
        self.chosen
            .insert((state, db.to_string()), backend.to_string());
    }

    /// Master `db` is pinned to for the rest of this unit of work, if any
    pub fn sticky_master(&self, db: &str) -> Option<&str> {
        self.sticky_masters.get(db).map(String::as_str)
    }

    /// Pin `db` to `backend` for subsequent writes in this unit of work
    pub fn pin_master(&mut self, db: &str, backend: &str) {
        self.sticky_masters
            .insert(db.to_string(), backend.to_string());
    }
}

impl Default for RoutingContext {
    fn default() -> Self {
        Self::new()
    }
}
