//! Error types for transport implementations.
//!
//! The transport state machine itself is infallible; these errors come from
//! concrete channels (WebSocket, simulation) and are reported to the state
//! machine as connect failures or closes.

use thiserror::Error;

/// Errors produced by a concrete event channel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Channel could not be established.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Established channel broke while reading or writing.
    #[error("stream error: {0}")]
    Stream(String),

    /// Operation requires an open channel.
    #[error("not connected")]
    NotConnected,

    /// Peer sent something that is not a text frame.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl TransportError {
    /// Returns true if reconnecting may succeed.
    ///
    /// Protocol violations indicate a broken peer and are never transient.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Stream(_) | Self::NotConnected)
    }
}
