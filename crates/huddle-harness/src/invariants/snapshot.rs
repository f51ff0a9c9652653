//! Observable state snapshots for invariant checking.
//!
//! Invariants operate on snapshots rather than live state so every check in
//! one pass sees the same moment.

use std::collections::{BTreeMap, BTreeSet};

use huddle_client::SyncEngine;
use huddle_core::{Environment, FIRST_PAGE, MemoryCache, QueryKey};
use huddle_proto::{ChatId, ConversationSummary, Message, Role};

/// Snapshot of engine and cache state.
///
/// Cache values are captured whether stale or not.
#[derive(Debug, Clone, Default)]
pub struct SyncSnapshot {
    /// Whether synchronization is enabled.
    pub enabled: bool,
    /// Whether the channel is open.
    pub connected: bool,
    /// Rooms joined on the current connection.
    pub joined: BTreeSet<ChatId>,
    /// Cached conversation lists.
    pub lists: BTreeMap<Role, Vec<ConversationSummary>>,
    /// Cached first pages.
    pub first_pages: BTreeMap<ChatId, Vec<Message>>,
}

impl SyncSnapshot {
    /// Capture the current state.
    pub fn capture<E: Environment>(engine: &SyncEngine<E>, cache: &MemoryCache) -> Self {
        let lists = Role::ALL
            .into_iter()
            .filter_map(|role| Some((role, cache.peek_conversations(role)?.to_vec())))
            .collect();

        let first_pages = cache
            .keys()
            .filter_map(|key| match key {
                QueryKey::MessagePage { chat_id, page } if *page == FIRST_PAGE => {
                    Some((chat_id.clone(), cache.peek_messages(chat_id, FIRST_PAGE)?.to_vec()))
                },
                _ => None,
            })
            .collect();

        Self {
            enabled: engine.is_enabled(),
            connected: engine.is_connected(),
            joined: engine.subscriptions().joined().iter().cloned().collect(),
            lists,
            first_pages,
        }
    }

    /// Unread counter for `chat_id` in `role`'s list.
    pub fn unread(&self, role: Role, chat_id: &ChatId) -> Option<u32> {
        self.lists.get(&role)?.iter().find(|s| &s.id == chat_id).map(|s| s.unread_count)
    }
}
