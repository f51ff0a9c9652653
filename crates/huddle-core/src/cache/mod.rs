//! Client-side query cache contract.
//!
//! The cache is owned by the surrounding application and shared with its UI.
//! The sync engine is its only writer for messages, previews and unread
//! counters, and always performs read-modify-write through this trait.
//!
//! Entries are addressed by [`QueryKey`]. Invalidation takes a
//! [`QueryFilter`] so a single call can mark every page of a conversation, or
//! every role's conversation list, as stale. A stale entry keeps its last
//! value and stays readable, so read-modify-write keeps working while a
//! reload is in flight; [`CacheStore::is_stale`] tells readers a reload is
//! due. Writing an entry makes it fresh again.

mod memory;

use std::collections::BTreeSet;

use huddle_proto::{ChatId, ConversationSummary, Message, Role};
pub use memory::MemoryCache;

/// The most recent page of a message list. The only page patched in place.
pub const FIRST_PAGE: u32 = 1;

/// Identity of a cached query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueryKey {
    /// Conversation list for one role.
    ConversationList(Role),
    /// One page of a conversation's message list.
    MessagePage {
        /// Owning conversation.
        chat_id: ChatId,
        /// Page number, starting at [`FIRST_PAGE`].
        page: u32,
    },
}

impl QueryKey {
    /// Whether this key holds a conversation list.
    pub fn is_conversation_list(&self) -> bool {
        matches!(self, Self::ConversationList(_))
    }
}

/// Selects entries for invalidation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryFilter {
    /// Every cached page of one conversation.
    MessagesOf(ChatId),
    /// Every role's conversation list.
    ConversationLists,
}

impl QueryFilter {
    /// Whether `key` is selected by this filter.
    pub fn matches(&self, key: &QueryKey) -> bool {
        match (self, key) {
            (Self::MessagesOf(chat), QueryKey::MessagePage { chat_id, .. }) => chat == chat_id,
            (Self::ConversationLists, QueryKey::ConversationList(_)) => true,
            _ => false,
        }
    }
}

/// Key-value cache addressed by query identity.
///
/// Reads return owned copies; callers modify them and write the result back.
pub trait CacheStore {
    /// Cached conversation list for `role`, stale or not. `None` if never
    /// written.
    fn conversations(&self, role: Role) -> Option<Vec<ConversationSummary>>;

    /// Replace the conversation list for `role`.
    fn write_conversations(&mut self, role: Role, conversations: Vec<ConversationSummary>);

    /// Cached message page, stale or not. `None` if never written.
    fn messages(&self, chat_id: &ChatId, page: u32) -> Option<Vec<Message>>;

    /// Replace a message page.
    fn write_messages(&mut self, chat_id: &ChatId, page: u32, messages: Vec<Message>);

    /// Mark every entry selected by `filter` stale.
    fn invalidate(&mut self, filter: &QueryFilter);

    /// Whether `key` holds a value that was invalidated and not rewritten.
    fn is_stale(&self, key: &QueryKey) -> bool;

    /// Keys written since the last call, in write order.
    ///
    /// This is the store's change feed. Drivers forward each key to the sync
    /// engine so it can react to conversation lists being (re)loaded.
    fn take_writes(&mut self) -> Vec<QueryKey>;

    /// Union of conversation ids across every cached role list.
    fn known_chat_ids(&self) -> BTreeSet<ChatId> {
        Role::ALL
            .into_iter()
            .filter_map(|role| self.conversations(role))
            .flatten()
            .map(|summary| summary.id)
            .collect()
    }
}
