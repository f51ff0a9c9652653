//! Records shared between the REST API, the cache and the event stream.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    events::MessageReceived,
    ids::{ChatId, MessageId, UserId},
};

/// Role the signed-in user acts in.
///
/// Each role has its own conversation list on the server, cached separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Enrolled in subjects.
    Student,
    /// Teaching subjects.
    Teacher,
}

impl Role {
    /// All roles, in a stable order.
    pub const ALL: [Role; 2] = [Role::Student, Role::Teacher];

    /// Lowercase wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Teacher => "teacher",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "student" => Ok(Self::Student),
            "teacher" => Ok(Self::Teacher),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// One row of a conversation list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    /// Conversation identifier.
    #[serde(rename = "_id")]
    pub id: ChatId,
    /// Preview text of the most recent message.
    #[serde(default)]
    pub last_message: Option<String>,
    /// Timestamp of the most recent message, as sent by the server.
    #[serde(default)]
    pub last_message_at: Option<String>,
    /// Messages not yet read by the current user.
    #[serde(default)]
    pub unread_count: u32,
}

impl ConversationSummary {
    /// Create a summary with no messages.
    pub fn new(id: impl Into<ChatId>) -> Self {
        Self { id: id.into(), last_message: None, last_message_at: None, unread_count: 0 }
    }

    /// Set the unread counter.
    #[must_use]
    pub fn with_unread(mut self, unread_count: u32) -> Self {
        self.unread_count = unread_count;
        self
    }
}

/// A chat message as held in a cached page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Server-assigned identifier.
    #[serde(rename = "_id")]
    pub id: MessageId,
    /// Owning conversation.
    pub chat_id: ChatId,
    /// Author.
    pub sender_id: UserId,
    /// Author display name.
    pub sender_name: String,
    /// Body text.
    pub content: String,
    /// Creation timestamp, as sent by the server.
    pub created_at: String,
}

impl From<&MessageReceived> for Message {
    fn from(event: &MessageReceived) -> Self {
        Self {
            id: event.id.clone(),
            chat_id: event.chat_id.clone(),
            sender_id: event.sender_id.clone(),
            sender_name: event.sender_name.clone(),
            content: event.content.clone(),
            created_at: event.created_at.clone(),
        }
    }
}
