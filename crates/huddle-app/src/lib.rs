//! Application layer for Huddle
//!
//! Generic runtime that runs the Sans-IO [`huddle_client::SyncEngine`]
//! against real or simulated I/O, so deterministic simulation tests exercise
//! the same orchestration code that runs in production.
//!
//! # Components
//!
//! - [`Driver`]: Trait for platform-specific I/O abstraction
//! - [`Runtime`]: Generic orchestration loop using Driver
//! - [`SystemEnv`]: Wall-clock [`huddle_core::Environment`] on tokio

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod driver;
mod runtime;
mod system_env;

pub use driver::{Driver, DriverEvent};
pub use runtime::{DEFAULT_TICK_INTERVAL, Runtime, Step};
pub use system_env::SystemEnv;
