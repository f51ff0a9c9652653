//! Named events and their payloads.
//!
//! # Invariants
//!
//! - Each [`InboundEvent`] and [`OutboundEvent`] variant maps to exactly one
//!   wire name (enforced by match exhaustiveness in `name()`).
//! - Decoding validates every required field: missing, mistyped or empty
//!   identifiers are rejected before the event is constructed.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    errors::{ProtocolError, Result},
    ids::{ChatId, MessageId, SubjectId, UserId},
};

/// Largest text frame accepted from the wire (1 MiB).
pub const MAX_FRAME_SIZE: usize = 1 << 20;

/// Wire names of all events.
pub mod names {
    /// Server: a message was posted to a room.
    pub const MESSAGE_RECEIVED: &str = "messageReceived";
    /// Server: a conversation was read.
    pub const MESSAGE_READ: &str = "messageRead";
    /// Server: messages were deleted.
    pub const MESSAGE_DELETED: &str = "messageDeleted";
    /// Server: room join acknowledged.
    pub const JOINED_ROOM: &str = "joinedRoom";
    /// Client: subscribe to a room.
    pub const JOIN_ROOM: &str = "joinRoom";
    /// Client: mark a conversation as read.
    pub const MARK_AS_READ: &str = "markAsRead";
    /// Client: delete messages.
    pub const DELETE_MESSAGE: &str = "deleteMessage";
}

/// Frame envelope: `{"event": name, "data": payload}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Event name.
    pub event: String,
    /// Event payload. Missing data decodes as `null`.
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Envelope {
    /// Parse a text frame into an envelope.
    ///
    /// The size check runs before JSON parsing.
    pub fn parse(text: &str) -> Result<Self> {
        if text.len() > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge { size: text.len(), max: MAX_FRAME_SIZE });
        }
        serde_json::from_str(text).map_err(|e| ProtocolError::MalformedEnvelope(e.to_string()))
    }

    fn wrap<T: Serialize>(event: &str, payload: &T) -> Result<String> {
        let data = serde_json::to_value(payload).map_err(|e| ProtocolError::Encode(e.to_string()))?;
        serde_json::to_string(&Envelope { event: event.to_owned(), data })
            .map_err(|e| ProtocolError::Encode(e.to_string()))
    }
}

/// A new message was posted to a room the client has joined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageReceived {
    /// Owning conversation.
    pub chat_id: ChatId,
    /// Server-assigned message id.
    #[serde(rename = "_id")]
    pub id: MessageId,
    /// Author.
    pub sender_id: UserId,
    /// Author display name.
    pub sender_name: String,
    /// Body text.
    pub content: String,
    /// Creation timestamp.
    pub created_at: String,
}

/// A conversation was confirmed read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRead {
    /// Conversation that was read.
    pub chat_id: ChatId,
    /// Subject the conversation belongs to.
    pub subject_id: SubjectId,
}

/// Messages were deleted from a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDeleted {
    /// Owning conversation.
    pub chat_id: ChatId,
    /// Deleted message ids.
    pub message_ids: Vec<MessageId>,
}

/// Room join acknowledgement. Observational only.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinedRoom {
    /// Joined room, when the server reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<ChatId>,
}

/// Subscribe the connection to a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoom {
    /// Room to join.
    pub chat_id: ChatId,
}

/// Ask the server to mark a conversation as read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAsRead {
    /// Conversation to mark.
    pub chat_id: ChatId,
    /// Subject the conversation belongs to.
    pub subject_id: SubjectId,
}

/// Ask the server to delete messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteMessage {
    /// Owning conversation.
    pub chat_id: ChatId,
    /// Messages to delete.
    pub message_ids: Vec<MessageId>,
}

/// Server to client events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// `messageReceived`
    MessageReceived(MessageReceived),
    /// `messageRead`
    MessageRead(MessageRead),
    /// `messageDeleted`
    MessageDeleted(MessageDeleted),
    /// `joinedRoom`
    JoinedRoom(JoinedRoom),
}

impl InboundEvent {
    /// Wire name of this event.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::MessageReceived(_) => names::MESSAGE_RECEIVED,
            Self::MessageRead(_) => names::MESSAGE_READ,
            Self::MessageDeleted(_) => names::MESSAGE_DELETED,
            Self::JoinedRoom(_) => names::JOINED_ROOM,
        }
    }

    /// Conversation the event refers to, if any.
    pub fn chat_id(&self) -> Option<&ChatId> {
        match self {
            Self::MessageReceived(p) => Some(&p.chat_id),
            Self::MessageRead(p) => Some(&p.chat_id),
            Self::MessageDeleted(p) => Some(&p.chat_id),
            Self::JoinedRoom(p) => p.chat_id.as_ref(),
        }
    }

    /// Decode a text frame.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::FrameTooLarge` if the frame exceeds `MAX_FRAME_SIZE`
    /// - `ProtocolError::MalformedEnvelope` if the frame is not an envelope
    /// - `ProtocolError::UnknownEvent` for unrecognized event names
    /// - `ProtocolError::InvalidPayload` / `EmptyIdentifier` for schema
    ///   violations
    pub fn decode(text: &str) -> Result<Self> {
        Self::from_envelope(Envelope::parse(text)?)
    }

    /// Convert an already parsed envelope.
    pub fn from_envelope(envelope: Envelope) -> Result<Self> {
        let Envelope { event, data } = envelope;
        match event.as_str() {
            names::MESSAGE_RECEIVED => {
                let p: MessageReceived = payload(names::MESSAGE_RECEIVED, data)?;
                require(names::MESSAGE_RECEIVED, "chatId", p.chat_id.is_empty())?;
                require(names::MESSAGE_RECEIVED, "_id", p.id.is_empty())?;
                require(names::MESSAGE_RECEIVED, "senderId", p.sender_id.is_empty())?;
                Ok(Self::MessageReceived(p))
            },
            names::MESSAGE_READ => {
                let p: MessageRead = payload(names::MESSAGE_READ, data)?;
                require(names::MESSAGE_READ, "chatId", p.chat_id.is_empty())?;
                Ok(Self::MessageRead(p))
            },
            names::MESSAGE_DELETED => {
                let p: MessageDeleted = payload(names::MESSAGE_DELETED, data)?;
                require(names::MESSAGE_DELETED, "chatId", p.chat_id.is_empty())?;
                require(
                    names::MESSAGE_DELETED,
                    "messageIds",
                    p.message_ids.iter().any(MessageId::is_empty),
                )?;
                Ok(Self::MessageDeleted(p))
            },
            names::JOINED_ROOM => {
                // Acknowledgements carry whatever the server echoes; a payload
                // that does not fit the typed shape is accepted without a room
                let p = serde_json::from_value::<JoinedRoom>(data).unwrap_or_default();
                Ok(Self::JoinedRoom(p))
            },
            _ => Err(ProtocolError::UnknownEvent(event)),
        }
    }

    /// Encode as a text frame.
    pub fn encode(&self) -> Result<String> {
        match self {
            Self::MessageReceived(p) => Envelope::wrap(self.name(), p),
            Self::MessageRead(p) => Envelope::wrap(self.name(), p),
            Self::MessageDeleted(p) => Envelope::wrap(self.name(), p),
            Self::JoinedRoom(p) => Envelope::wrap(self.name(), p),
        }
    }
}

/// Client to server events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEvent {
    /// `joinRoom`
    JoinRoom(JoinRoom),
    /// `markAsRead`
    MarkAsRead(MarkAsRead),
    /// `deleteMessage`
    DeleteMessage(DeleteMessage),
}

impl OutboundEvent {
    /// Join request for a room.
    pub fn join_room(chat_id: ChatId) -> Self {
        Self::JoinRoom(JoinRoom { chat_id })
    }

    /// Wire name of this event.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::JoinRoom(_) => names::JOIN_ROOM,
            Self::MarkAsRead(_) => names::MARK_AS_READ,
            Self::DeleteMessage(_) => names::DELETE_MESSAGE,
        }
    }

    /// Encode as a text frame.
    pub fn encode(&self) -> Result<String> {
        match self {
            Self::JoinRoom(p) => Envelope::wrap(self.name(), p),
            Self::MarkAsRead(p) => Envelope::wrap(self.name(), p),
            Self::DeleteMessage(p) => Envelope::wrap(self.name(), p),
        }
    }

    /// Decode a text frame (server side and test harnesses).
    pub fn decode(text: &str) -> Result<Self> {
        let Envelope { event, data } = Envelope::parse(text)?;
        match event.as_str() {
            names::JOIN_ROOM => Ok(Self::JoinRoom(payload(names::JOIN_ROOM, data)?)),
            names::MARK_AS_READ => Ok(Self::MarkAsRead(payload(names::MARK_AS_READ, data)?)),
            names::DELETE_MESSAGE => {
                Ok(Self::DeleteMessage(payload(names::DELETE_MESSAGE, data)?))
            },
            _ => Err(ProtocolError::UnknownEvent(event)),
        }
    }
}

fn payload<T: DeserializeOwned>(event: &'static str, data: serde_json::Value) -> Result<T> {
    serde_json::from_value(data)
        .map_err(|e| ProtocolError::InvalidPayload { event, reason: e.to_string() })
}

fn require(event: &'static str, field: &'static str, empty: bool) -> Result<()> {
    if empty { Err(ProtocolError::EmptyIdentifier { event, field }) } else { Ok(()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_message_received() {
        let text = r#"{"event":"messageReceived","data":{"chatId":"c1","_id":"m1","senderId":"u1","senderName":"Ada","content":"hi","createdAt":"2024-01-01T00:00:00Z"}}"#;
        let event = InboundEvent::decode(text).unwrap();

        let InboundEvent::MessageReceived(p) = &event else {
            panic!("expected MessageReceived, got {event:?}");
        };
        assert_eq!(p.chat_id.as_str(), "c1");
        assert_eq!(p.id.as_str(), "m1");
        assert_eq!(p.sender_name, "Ada");
    }

    #[test]
    fn missing_field_is_rejected() {
        let text = r#"{"event":"messageReceived","data":{"chatId":"c1","_id":"m1"}}"#;
        let err = InboundEvent::decode(text).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidPayload { event: "messageReceived", .. }));
    }

    #[test]
    fn mistyped_field_is_rejected() {
        let text = r#"{"event":"messageDeleted","data":{"chatId":"c1","messageIds":"m1"}}"#;
        let err = InboundEvent::decode(text).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidPayload { event: "messageDeleted", .. }));
    }

    #[test]
    fn empty_chat_id_is_rejected() {
        let text = r#"{"event":"messageRead","data":{"chatId":"","subjectId":"s1"}}"#;
        let err = InboundEvent::decode(text).unwrap_err();
        assert_eq!(err, ProtocolError::EmptyIdentifier { event: "messageRead", field: "chatId" });
    }

    #[test]
    fn unknown_event_is_rejected() {
        let err = InboundEvent::decode(r#"{"event":"typing","data":{}}"#).unwrap_err();
        assert_eq!(err, ProtocolError::UnknownEvent("typing".into()));
    }

    #[test]
    fn not_json_is_malformed() {
        let err = InboundEvent::decode("joinRoom c1").unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedEnvelope(_)));
    }

    #[test]
    fn oversized_frame_is_rejected_before_parsing() {
        let text = "x".repeat(MAX_FRAME_SIZE + 1);
        let err = InboundEvent::decode(&text).unwrap_err();
        assert!(matches!(err, ProtocolError::FrameTooLarge { .. }));
    }

    #[test]
    fn joined_room_accepts_any_payload() {
        let event = InboundEvent::decode(r#"{"event":"joinedRoom","data":"ok"}"#).unwrap();
        assert_eq!(event, InboundEvent::JoinedRoom(JoinedRoom::default()));

        let event =
            InboundEvent::decode(r#"{"event":"joinedRoom","data":{"chatId":"c9","n":1}}"#).unwrap();
        assert_eq!(event.chat_id().map(ChatId::as_str), Some("c9"));
    }

    #[test]
    fn joined_room_with_mistyped_fields_is_still_accepted() {
        let event =
            InboundEvent::decode(r#"{"event":"joinedRoom","data":{"chatId":42}}"#).unwrap();
        assert_eq!(event, InboundEvent::JoinedRoom(JoinedRoom::default()));

        let event = InboundEvent::decode(r#"{"event":"joinedRoom","data":null}"#).unwrap();
        assert_eq!(event.chat_id(), None);
    }

    #[test]
    fn outbound_wire_shape() {
        let text = OutboundEvent::MarkAsRead(MarkAsRead {
            chat_id: "c1".into(),
            subject_id: "s1".into(),
        })
        .encode()
        .unwrap();

        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["event"], "markAsRead");
        assert_eq!(value["data"]["chatId"], "c1");
        assert_eq!(value["data"]["subjectId"], "s1");
    }
}
