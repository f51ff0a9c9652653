//! Sync engine.
//!
//! Composition root that owns the transport handle, room subscriptions,
//! cache synchronizer, read-state coordinator and notification gate, and
//! routes every [`SyncEvent`] to them.
//!
//! # Ordering
//!
//! Inbound events are applied synchronously in arrival order. A `messageRead`
//! or `messageDeleted` invalidation is therefore always in the cache before
//! any later arrival for the same conversation is patched.

use huddle_core::{
    CacheStore, Connectivity, Environment, TransportAction, TransportHandle, TransportState,
};
use huddle_proto::{ChatId, InboundEvent, MessageReceived, OutboundEvent, Role};

use crate::{
    config::SyncConfig,
    event::{SyncAction, SyncEvent},
    notify::{NotificationGate, ViewContext},
    read_state::ReadStateCoordinator,
    subscriptions::RoomSubscriptions,
    synchronizer::{ArrivalOutcome, CacheSynchronizer},
};

/// Chat synchronization engine.
///
/// Generic over `Environment` so tests can drive it on virtual time.
pub struct SyncEngine<E: Environment> {
    env: E,
    config: SyncConfig,
    transport: TransportHandle<E::Instant>,
    subscriptions: RoomSubscriptions<E::Instant>,
    synchronizer: CacheSynchronizer,
    read_state: ReadStateCoordinator,
    gate: NotificationGate,
}

impl<E: Environment> SyncEngine<E> {
    /// Create a disabled engine.
    pub fn new(env: E, config: SyncConfig) -> Self {
        let transport = TransportHandle::new(config.reconnect.clone());
        let subscriptions = RoomSubscriptions::new(config.join_retry_interval, config.join_debounce);
        let synchronizer = CacheSynchronizer::new(config.seen_window);
        let gate = NotificationGate::new(config.role);

        Self {
            env,
            config,
            transport,
            subscriptions,
            synchronizer,
            read_state: ReadStateCoordinator::new(),
            gate,
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Environment in use.
    pub fn env(&self) -> &E {
        &self.env
    }

    /// Transport state.
    pub fn transport_state(&self) -> TransportState {
        self.transport.state()
    }

    /// Whether the channel is open.
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Whether synchronization is active.
    pub fn is_enabled(&self) -> bool {
        self.transport.is_enabled()
    }

    /// Room subscription state.
    pub fn subscriptions(&self) -> &RoomSubscriptions<E::Instant> {
        &self.subscriptions
    }

    /// Read-state coordinator.
    pub fn read_state(&self) -> &ReadStateCoordinator {
        &self.read_state
    }

    /// Notification gate.
    pub fn gate(&self) -> &NotificationGate {
        &self.gate
    }

    /// Current view.
    pub fn view(&self) -> &ViewContext {
        self.gate.view()
    }

    /// Process one event against `cache`.
    pub fn handle<C: CacheStore>(&mut self, event: SyncEvent, cache: &mut C) -> Vec<SyncAction> {
        let mut out = Vec::new();

        match event {
            SyncEvent::Enable => {
                if self.transport.is_enabled() {
                    return out;
                }
                let actions = self.transport.enable();
                self.apply_transport(actions, cache, &mut out);
                out.extend(
                    self.config
                        .seed_roles
                        .iter()
                        .map(|&role| SyncAction::FetchConversations { role }),
                );
            },
            SyncEvent::Disable => {
                let actions = self.transport.disable();
                self.apply_transport(actions, cache, &mut out);
                self.subscriptions.cancel_timers();
            },
            SyncEvent::TransportOpened => {
                let actions = self.transport.handle_opened();
                self.apply_transport(actions, cache, &mut out);
            },
            SyncEvent::TransportClosed { reason } => {
                let actions = self.transport.handle_closed(self.env.now(), &reason);
                self.apply_transport(actions, cache, &mut out);
            },
            SyncEvent::TransportFailed { reason } => {
                let actions = self.transport.handle_failed(self.env.now(), &reason);
                self.apply_transport(actions, cache, &mut out);
            },
            SyncEvent::Inbound(inbound) => self.handle_inbound(inbound, cache, &mut out),
            SyncEvent::CacheWritten(key) => {
                if key.is_conversation_list() {
                    self.subscriptions.on_list_written(self.env.now());
                }
            },
            SyncEvent::ViewChanged(view) => {
                tracing::trace!(?view, "view changed");
                self.gate.set_view(view);
            },
            SyncEvent::MarkAsRead { chat_id, subject_id } => {
                let actions = self.read_state.mark_as_read(&mut self.transport, chat_id, subject_id);
                self.apply_transport(actions, cache, &mut out);
            },
            SyncEvent::DeleteMessages { chat_id, message_ids } => {
                let actions =
                    self.read_state.delete_messages(&mut self.transport, chat_id, message_ids);
                self.apply_transport(actions, cache, &mut out);
            },
            SyncEvent::ConversationsFetched { role, conversations } => {
                if !self.transport.is_enabled() {
                    tracing::debug!(%role, "conversation list arrived after disable, ignoring");
                    return out;
                }
                tracing::debug!(%role, count = conversations.len(), "conversation list loaded");
                cache.write_conversations(role, conversations);
            },
            SyncEvent::AlertResolved { alert_id, response } => {
                if let Some(route) = self.gate.resolve(alert_id, response) {
                    out.push(SyncAction::Navigate(route));
                }
            },
            SyncEvent::Tick => {
                let now = self.env.now();
                let actions = self.transport.handle_tick(now);
                self.apply_transport(actions, cache, &mut out);

                let known = cache.known_chat_ids();
                let passes = self.subscriptions.join_passes();
                let joins = self.subscriptions.poll(now, self.transport.is_connected(), &known);
                self.send_joins(joins, &mut out);

                // A retry pass with nothing known: ask again for lists that never loaded
                if known.is_empty() && self.subscriptions.join_passes() > passes {
                    out.extend(
                        self.config
                            .seed_roles
                            .iter()
                            .filter(|&&role| cache.conversations(role).is_none())
                            .map(|&role| SyncAction::FetchConversations { role }),
                    );
                }
            },
        }

        out
    }

    fn handle_inbound<C: CacheStore>(
        &mut self,
        inbound: InboundEvent,
        cache: &mut C,
        out: &mut Vec<SyncAction>,
    ) {
        match inbound {
            InboundEvent::MessageReceived(arrival) => self.handle_arrival(&arrival, cache, out),
            InboundEvent::MessageRead(read) => {
                let stale = self.synchronizer.apply_read(cache, &read);
                Self::reload_lists(stale, out);
            },
            InboundEvent::MessageDeleted(deleted) => {
                let stale = self.synchronizer.apply_deleted(cache, &deleted);
                Self::reload_lists(stale, out);
            },
            InboundEvent::JoinedRoom(ack) => {
                tracing::debug!(chat_id = ?ack.chat_id, "room join acknowledged");
            },
        }
    }

    fn handle_arrival<C: CacheStore>(
        &mut self,
        arrival: &MessageReceived,
        cache: &mut C,
        out: &mut Vec<SyncAction>,
    ) {
        let count_unread = !self.gate.view().is_focused(&arrival.chat_id);

        let outcome = self.synchronizer.apply_arrival(cache, arrival, count_unread);
        if outcome == ArrivalOutcome::Duplicate {
            return;
        }

        if let Some(alert) = self.gate.evaluate(arrival) {
            tracing::debug!(alert = %alert.id, chat_id = %arrival.chat_id, "raising alert");
            out.push(SyncAction::ShowAlert(alert));
        }
    }

    /// Invalidated lists are refetched so counts come back from the server.
    fn reload_lists(roles: Vec<Role>, out: &mut Vec<SyncAction>) {
        for role in roles {
            tracing::debug!(%role, "conversation list invalidated, reloading");
            out.push(SyncAction::FetchConversations { role });
        }
    }

    fn apply_transport<C: CacheStore>(
        &mut self,
        actions: Vec<TransportAction>,
        cache: &mut C,
        out: &mut Vec<SyncAction>,
    ) {
        for action in actions {
            match action {
                TransportAction::Open => out.push(SyncAction::Open),
                TransportAction::Close => out.push(SyncAction::Close),
                TransportAction::Send(event) => out.push(SyncAction::Send(event)),
                TransportAction::Signal(Connectivity::Connected) => {
                    let known = cache.known_chat_ids();
                    let joins = self.subscriptions.on_connected(self.env.now(), &known);
                    self.send_joins(joins, out);
                },
                TransportAction::Signal(Connectivity::Disconnected) => {
                    self.subscriptions.on_disconnected();
                },
            }
        }
    }

    fn send_joins(&mut self, joins: Vec<ChatId>, out: &mut Vec<SyncAction>) {
        for chat_id in joins {
            for action in self.transport.send(OutboundEvent::join_room(chat_id)) {
                if let TransportAction::Send(event) = action {
                    out.push(SyncAction::Send(event));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        future::Future,
        sync::{Arc, Mutex},
        time::{Duration, Instant},
    };

    use huddle_core::{MemoryCache, QueryKey};
    use huddle_proto::{ConversationSummary, MessageRead};

    use super::*;
    use crate::notify::{AlertResponse, MessagingRoute};

    #[derive(Clone)]
    struct TestEnv {
        now: Arc<Mutex<Instant>>,
    }

    impl TestEnv {
        fn new() -> Self {
            Self { now: Arc::new(Mutex::new(Instant::now())) }
        }

        fn advance(&self, by: Duration) {
            *self.now.lock().unwrap() += by;
        }
    }

    impl Environment for TestEnv {
        type Instant = Instant;

        fn now(&self) -> Instant {
            *self.now.lock().unwrap()
        }

        fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
            self.advance(duration);
            std::future::ready(())
        }
    }

    fn engine() -> (TestEnv, SyncEngine<TestEnv>) {
        let env = TestEnv::new();
        (env.clone(), SyncEngine::new(env, SyncConfig::default()))
    }

    fn arrival(id: &str, chat: &str) -> SyncEvent {
        SyncEvent::Inbound(InboundEvent::MessageReceived(MessageReceived {
            chat_id: chat.into(),
            id: id.into(),
            sender_id: "u2".into(),
            sender_name: "Grace".into(),
            content: "hi".into(),
            created_at: "2024-03-01T09:00:00Z".into(),
        }))
    }

    fn joins(actions: &[SyncAction]) -> Vec<ChatId> {
        actions
            .iter()
            .filter_map(|action| match action {
                SyncAction::Send(OutboundEvent::JoinRoom(join)) => Some(join.chat_id.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn enable_opens_and_requests_seed_lists() {
        let (_, mut engine) = engine();
        let mut cache = MemoryCache::new();

        let actions = engine.handle(SyncEvent::Enable, &mut cache);
        assert_eq!(actions, vec![
            SyncAction::Open,
            SyncAction::FetchConversations { role: Role::Student },
            SyncAction::FetchConversations { role: Role::Teacher },
        ]);

        assert!(engine.handle(SyncEvent::Enable, &mut cache).is_empty());
    }

    #[test]
    fn disabled_engine_never_opens() {
        let (env, mut engine) = engine();
        let mut cache = MemoryCache::new();

        env.advance(Duration::from_secs(120));
        assert!(engine.handle(SyncEvent::Tick, &mut cache).is_empty());
        assert_eq!(engine.transport_state(), TransportState::Disabled);
    }

    #[test]
    fn connect_joins_known_rooms() {
        let (_, mut engine) = engine();
        let mut cache = MemoryCache::new();
        cache.write_conversations(Role::Student, vec![ConversationSummary::new("c1")]);
        cache.write_conversations(Role::Teacher, vec![ConversationSummary::new("c2")]);

        engine.handle(SyncEvent::Enable, &mut cache);
        let actions = engine.handle(SyncEvent::TransportOpened, &mut cache);

        assert_eq!(joins(&actions), vec![ChatId::new("c1"), ChatId::new("c2")]);
        assert_eq!(engine.subscriptions().joined().len(), 2);
    }

    #[test]
    fn fetched_list_is_written_only_while_enabled() {
        let (_, mut engine) = engine();
        let mut cache = MemoryCache::new();
        let list = vec![ConversationSummary::new("c1")];

        engine.handle(SyncEvent::ConversationsFetched { role: Role::Student, conversations: list.clone() }, &mut cache);
        assert!(cache.conversations(Role::Student).is_none());

        engine.handle(SyncEvent::Enable, &mut cache);
        engine.handle(SyncEvent::ConversationsFetched { role: Role::Student, conversations: list.clone() }, &mut cache);
        assert_eq!(cache.conversations(Role::Student), Some(list));
    }

    #[test]
    fn list_write_triggers_debounced_join() {
        let (env, mut engine) = engine();
        let mut cache = MemoryCache::new();
        engine.handle(SyncEvent::Enable, &mut cache);
        engine.handle(SyncEvent::TransportOpened, &mut cache);

        cache.write_conversations(Role::Student, vec![ConversationSummary::new("c1")]);
        engine.handle(SyncEvent::CacheWritten(QueryKey::ConversationList(Role::Student)), &mut cache);
        assert!(joins(&engine.handle(SyncEvent::Tick, &mut cache)).is_empty());

        env.advance(Duration::from_millis(500));
        assert_eq!(joins(&engine.handle(SyncEvent::Tick, &mut cache)), vec![ChatId::new("c1")]);
    }

    #[test]
    fn disable_closes_and_forgets_rooms() {
        let (env, mut engine) = engine();
        let mut cache = MemoryCache::new();
        cache.write_conversations(Role::Student, vec![ConversationSummary::new("c1")]);
        engine.handle(SyncEvent::Enable, &mut cache);
        engine.handle(SyncEvent::TransportOpened, &mut cache);

        let actions = engine.handle(SyncEvent::Disable, &mut cache);
        assert_eq!(actions, vec![SyncAction::Close]);
        assert!(engine.subscriptions().joined().is_empty());

        env.advance(Duration::from_secs(60));
        assert!(engine.handle(SyncEvent::Tick, &mut cache).is_empty());
    }

    #[test]
    fn focused_arrival_updates_preview_without_unread_or_alert() {
        let (_, mut engine) = engine();
        let mut cache = MemoryCache::new();
        cache.write_conversations(Role::Student, vec![ConversationSummary::new("c1")]);
        engine.handle(SyncEvent::ViewChanged(ViewContext::focused("c1")), &mut cache);

        let actions = engine.handle(arrival("m1", "c1"), &mut cache);
        assert!(actions.is_empty());

        let list = cache.conversations(Role::Student).unwrap();
        assert_eq!(list[0].unread_count, 0);
        assert_eq!(list[0].last_message.as_deref(), Some("hi"));
    }

    #[test]
    fn read_receipt_reloads_every_cached_list() {
        let (_, mut engine) = engine();
        let mut cache = MemoryCache::new();
        cache.write_conversations(Role::Student, vec![ConversationSummary::new("c1")]);
        cache.write_conversations(Role::Teacher, vec![ConversationSummary::new("c2")]);
        engine.handle(SyncEvent::Enable, &mut cache);

        let read = MessageRead { chat_id: "c1".into(), subject_id: "s1".into() };
        let actions = engine.handle(SyncEvent::Inbound(InboundEvent::MessageRead(read)), &mut cache);

        assert_eq!(actions, vec![
            SyncAction::FetchConversations { role: Role::Student },
            SyncAction::FetchConversations { role: Role::Teacher },
        ]);
        // Still readable while the reload is in flight
        assert_eq!(cache.known_chat_ids().len(), 2);
    }

    #[test]
    fn empty_retry_pass_refetches_missing_lists() {
        let (env, mut engine) = engine();
        let mut cache = MemoryCache::new();
        engine.handle(SyncEvent::Enable, &mut cache);
        engine.handle(SyncEvent::TransportOpened, &mut cache);
        assert!(engine.subscriptions().retry_armed());

        env.advance(Duration::from_secs(2));
        let actions = engine.handle(SyncEvent::Tick, &mut cache);

        assert_eq!(actions, vec![
            SyncAction::FetchConversations { role: Role::Student },
            SyncAction::FetchConversations { role: Role::Teacher },
        ]);
    }

    #[test]
    fn accepted_alert_navigates() {
        let (_, mut engine) = engine();
        let mut cache = MemoryCache::new();

        let actions = engine.handle(arrival("m1", "c1"), &mut cache);
        let [SyncAction::ShowAlert(alert)] = actions.as_slice() else {
            panic!("expected one alert, got {actions:?}");
        };

        let actions = engine.handle(
            SyncEvent::AlertResolved { alert_id: alert.id, response: AlertResponse::Accepted },
            &mut cache,
        );
        assert_eq!(actions, vec![SyncAction::Navigate(MessagingRoute::StudentMessages)]);
    }

    #[test]
    fn intents_are_dropped_while_disconnected() {
        let (_, mut engine) = engine();
        let mut cache = MemoryCache::new();
        engine.handle(SyncEvent::Enable, &mut cache);

        let actions = engine.handle(
            SyncEvent::MarkAsRead { chat_id: "c1".into(), subject_id: "s1".into() },
            &mut cache,
        );
        assert!(actions.is_empty());
        assert_eq!(engine.read_state().dropped(), 1);
    }
}
