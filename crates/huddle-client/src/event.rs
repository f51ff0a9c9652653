//! Sync engine events and actions.
//!
//! The engine is driven by [`SyncEvent`]s and responds with [`SyncAction`]s.
//! Drivers translate socket callbacks, cache change notifications, UI
//! intents and timer ticks into events, then execute the returned actions.

use huddle_core::QueryKey;
use huddle_proto::{ChatId, ConversationSummary, InboundEvent, MessageId, OutboundEvent, Role, SubjectId};

use crate::notify::{Alert, AlertId, AlertResponse, MessagingRoute, ViewContext};

/// Events the sync engine consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Activate synchronization (messaging enabled).
    ///
    /// Opens the channel and requests the initial conversation lists.
    Enable,

    /// Deactivate synchronization. Closes the channel, cancels timers.
    Disable,

    /// The channel is open.
    TransportOpened,

    /// The channel closed after having been open.
    TransportClosed {
        /// Close reason for logging.
        reason: String,
    },

    /// Opening the channel failed.
    TransportFailed {
        /// Error description for logging.
        reason: String,
    },

    /// A validated server event.
    Inbound(InboundEvent),

    /// The cache reported a write through its change feed.
    CacheWritten(QueryKey),

    /// The UI changed location or focus.
    ViewChanged(ViewContext),

    /// User opened a conversation's messages.
    MarkAsRead {
        /// Conversation being read.
        chat_id: ChatId,
        /// Subject the read applies to.
        subject_id: SubjectId,
    },

    /// User deleted their own messages.
    DeleteMessages {
        /// Conversation owning the messages.
        chat_id: ChatId,
        /// Messages to delete.
        message_ids: Vec<MessageId>,
    },

    /// A requested conversation list arrived from the API.
    ConversationsFetched {
        /// Role the list belongs to.
        role: Role,
        /// Conversations for that role.
        conversations: Vec<ConversationSummary>,
    },

    /// The renderer reports what the user did with an alert.
    AlertResolved {
        /// Alert being answered.
        alert_id: AlertId,
        /// User response.
        response: AlertResponse,
    },

    /// Periodic timer tick. Drives reconnects, retry and debounce.
    Tick,
}

/// Actions the sync engine requests of its driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// Open the event channel.
    Open,

    /// Close the event channel.
    Close,

    /// Write an event to the channel.
    Send(OutboundEvent),

    /// Fetch the conversation list for `role` and report it back with
    /// [`SyncEvent::ConversationsFetched`].
    FetchConversations {
        /// Role to fetch.
        role: Role,
    },

    /// Present an alert. Report the outcome with [`SyncEvent::AlertResolved`].
    ShowAlert(Alert),

    /// Navigate the UI to a messaging surface.
    Navigate(MessagingRoute),
}
