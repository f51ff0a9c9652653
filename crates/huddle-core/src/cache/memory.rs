//! In-memory cache store.
//!
//! Used by the daemon as its process-local cache and by tests as the
//! reference store. Stale entries keep their last value and stay readable
//! until rewritten.

use std::collections::BTreeMap;

use huddle_proto::{ChatId, ConversationSummary, Message, Role};

use super::{CacheStore, QueryFilter, QueryKey};

#[derive(Debug, Clone)]
enum Value {
    Conversations(Vec<ConversationSummary>),
    Messages(Vec<Message>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    stale: bool,
}

/// In-memory [`CacheStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    entries: BTreeMap<QueryKey, Entry>,
    writes: Vec<QueryKey>,
    invalidations: u64,
}

impl MemoryCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` holds a value, stale or not.
    pub fn contains(&self, key: &QueryKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries marked stale over the cache's lifetime.
    pub fn invalidation_count(&self) -> u64 {
        self.invalidations
    }

    /// All keys currently held.
    pub fn keys(&self) -> impl Iterator<Item = &QueryKey> {
        self.entries.keys()
    }

    /// Conversation list for `role` without copying.
    pub fn peek_conversations(&self, role: Role) -> Option<&[ConversationSummary]> {
        match &self.entries.get(&QueryKey::ConversationList(role))?.value {
            Value::Conversations(list) => Some(list),
            Value::Messages(_) => None,
        }
    }

    /// Message page without copying.
    pub fn peek_messages(&self, chat_id: &ChatId, page: u32) -> Option<&[Message]> {
        let key = QueryKey::MessagePage { chat_id: chat_id.clone(), page };
        match &self.entries.get(&key)?.value {
            Value::Messages(list) => Some(list),
            Value::Conversations(_) => None,
        }
    }

    fn put(&mut self, key: QueryKey, value: Value) {
        self.entries.insert(key.clone(), Entry { value, stale: false });
        self.writes.push(key);
    }
}

impl CacheStore for MemoryCache {
    fn conversations(&self, role: Role) -> Option<Vec<ConversationSummary>> {
        self.peek_conversations(role).map(<[_]>::to_vec)
    }

    fn write_conversations(&mut self, role: Role, conversations: Vec<ConversationSummary>) {
        self.put(QueryKey::ConversationList(role), Value::Conversations(conversations));
    }

    fn messages(&self, chat_id: &ChatId, page: u32) -> Option<Vec<Message>> {
        self.peek_messages(chat_id, page).map(<[_]>::to_vec)
    }

    fn write_messages(&mut self, chat_id: &ChatId, page: u32, messages: Vec<Message>) {
        let key = QueryKey::MessagePage { chat_id: chat_id.clone(), page };
        self.put(key, Value::Messages(messages));
    }

    fn invalidate(&mut self, filter: &QueryFilter) {
        for (key, entry) in &mut self.entries {
            if filter.matches(key) && !entry.stale {
                entry.stale = true;
                self.invalidations += 1;
                tracing::trace!(?key, "invalidated");
            }
        }
    }

    fn is_stale(&self, key: &QueryKey) -> bool {
        self.entries.get(key).is_some_and(|entry| entry.stale)
    }

    fn take_writes(&mut self) -> Vec<QueryKey> {
        std::mem::take(&mut self.writes)
    }
}
