//! Deterministic simulation harness for Huddle sync testing.
//!
//! Virtual-time implementations of the Environment and Driver traits, so the
//! production [`huddle_app::Runtime`] can be driven step by step with
//! reproducible timing.
//!
//! # Invariant Testing
//!
//! The `invariants` module provides behavioral testing through invariant
//! checks over cache and engine snapshots. Use
//! [`InvariantRegistry::standard()`] for the common sync invariants.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod sim_driver;
pub mod sim_env;

pub use invariants::{
    ConnectedImpliesEnabled, FirstPageUnique, Invariant, InvariantRegistry, InvariantResult,
    NoRoomsWhileDisconnected, SyncSnapshot, Violation,
};
pub use sim_driver::{SimDriver, SimDriverError};
pub use sim_env::{SimEnv, SimInstant};
