//! Client
//!
//! Action-based synchronization engine that keeps a client-side cache of
//! conversations, messages and read state consistent with the server's event
//! stream.
//!
//! # Architecture
//!
//! The engine follows the Sans-IO pattern of [`huddle_core`]. It receives
//! events ([`SyncEvent`]), applies them to a caller-owned
//! [`huddle_core::CacheStore`], and returns actions ([`SyncAction`]) for the
//! caller to execute. Events are processed strictly one at a time, which is
//! what guarantees that an invalidation always lands before any later patch
//! for the same conversation.
//!
//! # Components
//!
//! - [`SyncEngine`]: composition root owning every component below
//! - [`RoomSubscriptions`]: room join lifecycle, retry and debounce timers
//! - [`CacheSynchronizer`]: merge policies for inbound events
//! - [`ReadStateCoordinator`]: user intents to outbound commands
//! - [`NotificationGate`]: decides which arrivals raise an alert
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides:
//! - [`transport::ConnectedClient`]: WebSocket channel handle
//! - [`transport::connect`]: Connect to a server

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod config;
mod engine;
mod event;
mod notify;
mod read_state;
mod subscriptions;
mod synchronizer;

#[cfg(feature = "transport")]
pub mod transport;

pub use config::SyncConfig;
pub use engine::SyncEngine;
pub use event::{SyncAction, SyncEvent};
pub use huddle_core::{CacheStore, Environment, MemoryCache, QueryFilter, QueryKey};
pub use notify::{Alert, AlertId, AlertResponse, MessagingRoute, NotificationGate, ViewContext};
pub use read_state::ReadStateCoordinator;
pub use subscriptions::RoomSubscriptions;
pub use synchronizer::{ArrivalOutcome, CacheSynchronizer};
