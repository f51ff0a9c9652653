//! Huddle core
//!
//! Building blocks shared by the sync engine and its drivers:
//!
//! - [`env`]: time abstraction enabling deterministic simulation
//! - [`transport`]: Sans-IO state machine for the persistent event channel
//! - [`cache`]: query keys, the [`CacheStore`] contract and [`MemoryCache`]
//! - [`error`]: transport error types
//!
//! Nothing here performs I/O. Methods take the current time as input and
//! return actions for a driver to execute.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod cache;
pub mod env;
pub mod error;
pub mod transport;

pub use cache::{CacheStore, FIRST_PAGE, MemoryCache, QueryFilter, QueryKey};
pub use env::Environment;
pub use error::TransportError;
pub use transport::{
    Connectivity, ReconnectPolicy, TransportAction, TransportHandle, TransportState,
};
