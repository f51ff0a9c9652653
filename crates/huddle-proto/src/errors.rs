//! Protocol error types.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while encoding or decoding wire frames.
///
/// These only occur at the receive/send boundary. A frame that fails to
/// decode is dropped by the caller; it never reaches cache mutation logic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame exceeds [`crate::MAX_FRAME_SIZE`].
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge {
        /// Actual frame size
        size: usize,
        /// Maximum allowed size
        max: usize,
    },

    /// Frame is not a valid `{event, data}` envelope.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// Envelope names an event this client does not understand.
    #[error("unknown event: {0}")]
    UnknownEvent(String),

    /// Payload does not match the schema of its event.
    #[error("invalid payload for {event}: {reason}")]
    InvalidPayload {
        /// Event name
        event: &'static str,
        /// Decoder message
        reason: String,
    },

    /// A required identifier field was present but empty.
    #[error("empty identifier in {event}.{field}")]
    EmptyIdentifier {
        /// Event name
        event: &'static str,
        /// Field name on the wire
        field: &'static str,
    },

    /// Serialization failed.
    #[error("encode failed: {0}")]
    Encode(String),
}
