//! Cache synchronizer.
//!
//! Applies validated server events to the cache. Arrivals are patched in
//! place (first page and summary previews); reads and deletions are handled
//! by invalidation plus, for reads, an optimistic unread reset.
//!
//! Invalidated entries stay readable. A stale first page is never patched,
//! since its reload will carry the arrival; stale conversation lists are
//! patched, and the caller reloads every list a read or deletion marked
//! stale.
//!
//! # Deduplication
//!
//! The server may deliver the same arrival more than once. A message is a
//! duplicate if its id is already on the cached first page, or if it is in
//! the window of recently applied ids. The window covers the case where the
//! first page is not cached, which would otherwise count the same arrival
//! twice against the unread counter. A duplicate changes nothing.

use std::collections::{HashSet, VecDeque};

use huddle_core::{CacheStore, FIRST_PAGE, QueryFilter, QueryKey};
use huddle_proto::{Message, MessageDeleted, MessageId, MessageRead, MessageReceived, Role};

/// Result of applying an arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrivalOutcome {
    /// Appended to the cached first page.
    Appended,
    /// First page not cached or already stale; the next reader reloads it.
    PageReloading,
    /// Already applied. Nothing changed.
    Duplicate,
}

impl ArrivalOutcome {
    /// Whether the arrival was new.
    pub fn is_new(self) -> bool {
        !matches!(self, Self::Duplicate)
    }
}

/// Bounded set of recently applied message ids, evicting oldest first.
#[derive(Debug, Clone)]
struct SeenWindow {
    order: VecDeque<MessageId>,
    ids: HashSet<MessageId>,
    capacity: usize,
}

impl SeenWindow {
    fn new(capacity: usize) -> Self {
        Self { order: VecDeque::new(), ids: HashSet::new(), capacity }
    }

    fn contains(&self, id: &MessageId) -> bool {
        self.ids.contains(id)
    }

    fn insert(&mut self, id: MessageId) {
        if self.capacity == 0 || !self.ids.insert(id.clone()) {
            return;
        }
        self.order.push_back(id);
        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.ids.remove(&evicted);
            }
        }
    }
}

/// Applies server events to a [`CacheStore`].
#[derive(Debug, Clone)]
pub struct CacheSynchronizer {
    seen: SeenWindow,
}

impl CacheSynchronizer {
    /// Create a synchronizer remembering up to `seen_window` message ids.
    pub fn new(seen_window: usize) -> Self {
        Self { seen: SeenWindow::new(seen_window) }
    }

    /// Apply a `messageReceived`.
    ///
    /// Appends to the first page if cached and fresh (invalidating it if
    /// absent, leaving it alone if stale), then
    /// sets the preview on every cached summary for the conversation and,
    /// when `count_unread` is set, increments its unread counter.
    pub fn apply_arrival<C: CacheStore>(
        &mut self,
        cache: &mut C,
        event: &MessageReceived,
        count_unread: bool,
    ) -> ArrivalOutcome {
        if self.seen.contains(&event.id) {
            tracing::debug!(message_id = %event.id, "duplicate arrival");
            return ArrivalOutcome::Duplicate;
        }

        let page_key = QueryKey::MessagePage { chat_id: event.chat_id.clone(), page: FIRST_PAGE };
        let outcome = match cache.messages(&event.chat_id, FIRST_PAGE) {
            Some(page) if page.iter().any(|m| m.id == event.id) => {
                tracing::debug!(message_id = %event.id, "arrival already on first page");
                self.seen.insert(event.id.clone());
                return ArrivalOutcome::Duplicate;
            },
            Some(_) if cache.is_stale(&page_key) => ArrivalOutcome::PageReloading,
            Some(mut page) => {
                page.push(Message::from(event));
                cache.write_messages(&event.chat_id, FIRST_PAGE, page);
                ArrivalOutcome::Appended
            },
            None => {
                cache.invalidate(&QueryFilter::MessagesOf(event.chat_id.clone()));
                ArrivalOutcome::PageReloading
            },
        };
        self.seen.insert(event.id.clone());

        for role in Role::ALL {
            let Some(mut list) = cache.conversations(role) else {
                continue;
            };
            let Some(summary) = list.iter_mut().find(|s| s.id == event.chat_id) else {
                continue;
            };

            summary.last_message = Some(event.content.clone());
            summary.last_message_at = Some(event.created_at.clone());
            if count_unread {
                summary.unread_count = summary.unread_count.saturating_add(1);
            }
            cache.write_conversations(role, list);
        }

        tracing::trace!(chat_id = %event.chat_id, ?outcome, count_unread, "arrival applied");
        outcome
    }

    /// Apply a `messageRead`.
    ///
    /// Invalidates the conversation's pages, zeroes its unread counter in
    /// every cached list, then invalidates every list. Returns the roles
    /// whose cached list is now stale and should be refetched.
    pub fn apply_read<C: CacheStore>(&mut self, cache: &mut C, event: &MessageRead) -> Vec<Role> {
        cache.invalidate(&QueryFilter::MessagesOf(event.chat_id.clone()));

        for role in Role::ALL {
            let Some(mut list) = cache.conversations(role) else {
                continue;
            };
            let Some(summary) = list.iter_mut().find(|s| s.id == event.chat_id) else {
                continue;
            };
            if summary.unread_count == 0 {
                continue;
            }

            summary.unread_count = 0;
            cache.write_conversations(role, list);
        }

        let stale = invalidate_lists(cache);
        tracing::debug!(chat_id = %event.chat_id, subject_id = %event.subject_id, "read applied");
        stale
    }

    /// Apply a `messageDeleted`.
    ///
    /// Removal is never patched in place: the conversation's pages and every
    /// list are invalidated. Returns the roles whose cached list is now stale.
    pub fn apply_deleted<C: CacheStore>(&mut self, cache: &mut C, event: &MessageDeleted) -> Vec<Role> {
        cache.invalidate(&QueryFilter::MessagesOf(event.chat_id.clone()));
        let stale = invalidate_lists(cache);
        tracing::debug!(chat_id = %event.chat_id, count = event.message_ids.len(), "deletion applied");
        stale
    }
}

fn invalidate_lists<C: CacheStore>(cache: &mut C) -> Vec<Role> {
    let cached: Vec<Role> =
        Role::ALL.into_iter().filter(|&role| cache.conversations(role).is_some()).collect();
    cache.invalidate(&QueryFilter::ConversationLists);
    cached
}

#[cfg(test)]
mod tests {
    use huddle_core::MemoryCache;
    use huddle_proto::ConversationSummary;

    use super::*;

    fn arrival(id: &str, chat: &str) -> MessageReceived {
        MessageReceived {
            chat_id: chat.into(),
            id: id.into(),
            sender_id: "u2".into(),
            sender_name: "Grace".into(),
            content: format!("content of {id}"),
            created_at: "2024-03-01T09:00:00Z".into(),
        }
    }

    fn seeded() -> MemoryCache {
        let mut cache = MemoryCache::new();
        cache.write_conversations(Role::Student, vec![
            ConversationSummary::new("c1").with_unread(2),
            ConversationSummary::new("c2"),
        ]);
        cache.write_messages(&"c1".into(), FIRST_PAGE, vec![]);
        cache.take_writes();
        cache
    }

    fn unread(cache: &MemoryCache, role: Role, chat: &str) -> Option<u32> {
        cache
            .peek_conversations(role)?
            .iter()
            .find(|s| s.id.as_str() == chat)
            .map(|s| s.unread_count)
    }

    #[test]
    fn arrival_appends_and_updates_summary() {
        let mut cache = seeded();
        let mut sync = CacheSynchronizer::new(16);

        let outcome = sync.apply_arrival(&mut cache, &arrival("m1", "c1"), true);
        assert_eq!(outcome, ArrivalOutcome::Appended);

        let page = cache.messages(&"c1".into(), FIRST_PAGE).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id.as_str(), "m1");

        let list = cache.conversations(Role::Student).unwrap();
        assert_eq!(list[0].last_message.as_deref(), Some("content of m1"));
        assert_eq!(list[0].last_message_at.as_deref(), Some("2024-03-01T09:00:00Z"));
        assert_eq!(list[0].unread_count, 3);
        // Other conversations untouched
        assert_eq!(list[1], ConversationSummary::new("c2"));
    }

    #[test]
    fn arrival_without_first_page_invalidates() {
        let mut cache = seeded();
        let mut sync = CacheSynchronizer::new(16);

        let outcome = sync.apply_arrival(&mut cache, &arrival("m1", "c2"), true);
        assert_eq!(outcome, ArrivalOutcome::PageReloading);
        assert!(cache.messages(&"c2".into(), FIRST_PAGE).is_none());
        assert_eq!(unread(&cache, Role::Student, "c2"), Some(1));
    }

    #[test]
    fn duplicate_on_first_page_changes_nothing() {
        let mut cache = seeded();
        let mut sync = CacheSynchronizer::new(16);
        sync.apply_arrival(&mut cache, &arrival("m1", "c1"), true);
        cache.take_writes();

        // Fresh synchronizer so only the page detects it
        let mut other = CacheSynchronizer::new(16);
        let outcome = other.apply_arrival(&mut cache, &arrival("m1", "c1"), true);

        assert_eq!(outcome, ArrivalOutcome::Duplicate);
        assert_eq!(unread(&cache, Role::Student, "c1"), Some(3));
        assert!(cache.take_writes().is_empty());
    }

    #[test]
    fn duplicate_without_first_page_is_caught_by_window() {
        let mut cache = seeded();
        let mut sync = CacheSynchronizer::new(16);

        sync.apply_arrival(&mut cache, &arrival("m1", "c2"), true);
        let outcome = sync.apply_arrival(&mut cache, &arrival("m1", "c2"), true);

        assert_eq!(outcome, ArrivalOutcome::Duplicate);
        assert_eq!(unread(&cache, Role::Student, "c2"), Some(1));
    }

    #[test]
    fn uncounted_arrival_still_updates_preview() {
        let mut cache = seeded();
        let mut sync = CacheSynchronizer::new(16);

        sync.apply_arrival(&mut cache, &arrival("m1", "c1"), false);

        let list = cache.conversations(Role::Student).unwrap();
        assert_eq!(list[0].unread_count, 2);
        assert_eq!(list[0].last_message.as_deref(), Some("content of m1"));
    }

    #[test]
    fn arrival_for_unknown_conversation_touches_no_list() {
        let mut cache = seeded();
        let mut sync = CacheSynchronizer::new(16);

        sync.apply_arrival(&mut cache, &arrival("m1", "c9"), true);

        let writes = cache.take_writes();
        assert!(!writes.iter().any(QueryKey::is_conversation_list));
    }

    #[test]
    fn read_zeroes_unread_and_invalidates() {
        let mut cache = seeded();
        cache.write_conversations(Role::Teacher, vec![ConversationSummary::new("c1").with_unread(4)]);
        let mut sync = CacheSynchronizer::new(16);

        let stale =
            sync.apply_read(&mut cache, &MessageRead { chat_id: "c1".into(), subject_id: "s1".into() });

        assert_eq!(stale, vec![Role::Student, Role::Teacher]);
        assert_eq!(unread(&cache, Role::Student, "c1"), Some(0));
        assert_eq!(unread(&cache, Role::Teacher, "c1"), Some(0));
        assert!(cache.is_stale(&QueryKey::ConversationList(Role::Student)));
        assert!(cache.is_stale(&QueryKey::ConversationList(Role::Teacher)));
        assert!(cache.is_stale(&QueryKey::MessagePage { chat_id: "c1".into(), page: FIRST_PAGE }));
    }

    #[test]
    fn read_is_idempotent() {
        let mut cache = seeded();
        let mut sync = CacheSynchronizer::new(16);
        let read = MessageRead { chat_id: "c1".into(), subject_id: "s1".into() };

        sync.apply_read(&mut cache, &read);
        sync.apply_read(&mut cache, &read);

        assert_eq!(unread(&cache, Role::Student, "c1"), Some(0));
    }

    #[test]
    fn deletion_invalidates_without_patching() {
        let mut cache = seeded();
        let mut sync = CacheSynchronizer::new(16);
        sync.apply_arrival(&mut cache, &arrival("m1", "c1"), true);

        let stale = sync.apply_deleted(&mut cache, &MessageDeleted {
            chat_id: "c1".into(),
            message_ids: vec!["m1".into()],
        });

        // Only the student list was cached
        assert_eq!(stale, vec![Role::Student]);
        assert!(cache.is_stale(&QueryKey::MessagePage { chat_id: "c1".into(), page: FIRST_PAGE }));
        assert_eq!(cache.messages(&"c1".into(), FIRST_PAGE).map(|page| page.len()), Some(1));
        assert!(cache.is_stale(&QueryKey::ConversationList(Role::Student)));
        assert_eq!(unread(&cache, Role::Student, "c1"), Some(3));
    }

    #[test]
    fn arrival_after_deletion_counts_but_leaves_stale_page() {
        let mut cache = seeded();
        let mut sync = CacheSynchronizer::new(16);
        sync.apply_deleted(&mut cache, &MessageDeleted { chat_id: "c1".into(), message_ids: vec![] });
        cache.take_writes();

        let outcome = sync.apply_arrival(&mut cache, &arrival("m2", "c1"), true);

        assert_eq!(outcome, ArrivalOutcome::PageReloading);
        assert_eq!(cache.messages(&"c1".into(), FIRST_PAGE).map(|page| page.len()), Some(0));
        assert!(cache.is_stale(&QueryKey::MessagePage { chat_id: "c1".into(), page: FIRST_PAGE }));
        assert_eq!(unread(&cache, Role::Student, "c1"), Some(3));
        assert_eq!(cache.take_writes(), vec![QueryKey::ConversationList(Role::Student)]);
    }

    #[test]
    fn arrival_after_read_counts_from_zero() {
        let mut cache = seeded();
        let mut sync = CacheSynchronizer::new(16);
        sync.apply_read(&mut cache, &MessageRead { chat_id: "c1".into(), subject_id: "s1".into() });

        sync.apply_arrival(&mut cache, &arrival("m1", "c1"), true);

        assert_eq!(unread(&cache, Role::Student, "c1"), Some(1));
        let list = cache.conversations(Role::Student).unwrap();
        assert_eq!(list[0].last_message.as_deref(), Some("content of m1"));
    }

    #[test]
    fn seen_window_evicts_oldest() {
        let mut window = SeenWindow::new(2);
        window.insert("m1".into());
        window.insert("m2".into());
        window.insert("m3".into());

        assert!(!window.contains(&"m1".into()));
        assert!(window.contains(&"m2".into()));
        assert!(window.contains(&"m3".into()));
    }
}
