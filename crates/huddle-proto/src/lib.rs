//! Huddle wire protocol.
//!
//! The server pushes named JSON events over a single persistent channel and
//! the client answers with a small set of commands. Every frame is an
//! [`Envelope`]: `{"event": "<name>", "data": { ... }}`.
//!
//! Payloads are decoded into strongly typed structs at this boundary. Anything
//! that does not match the schema is rejected with a [`ProtocolError`] here,
//! so the sync engine only ever sees well-formed [`InboundEvent`]s.
//!
//! # Components
//!
//! - [`InboundEvent`]: server to client (message arrived, read, deleted)
//! - [`OutboundEvent`]: client to server (join, mark as read, delete)
//! - [`ids`]: opaque identifier newtypes
//! - [`model`]: conversation and message records shared with the REST API

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod errors;
pub mod events;
pub mod ids;
pub mod model;

pub use errors::{ProtocolError, Result};
pub use events::{
    DeleteMessage, Envelope, InboundEvent, JoinRoom, JoinedRoom, MAX_FRAME_SIZE, MarkAsRead,
    MessageDeleted, MessageRead, MessageReceived, OutboundEvent,
};
pub use ids::{ChatId, MessageId, SubjectId, UserId};
pub use model::{ConversationSummary, Message, Role};
