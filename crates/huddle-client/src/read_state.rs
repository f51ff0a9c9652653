//! Read-state coordinator.
//!
//! Turns user intents into outbound commands. Commands are fire-and-forget:
//! the server's broadcast (`messageRead`, `messageDeleted`) is what updates
//! the cache, and a command issued while disconnected is dropped rather than
//! queued.

use huddle_core::{TransportAction, TransportHandle};
use huddle_proto::{ChatId, DeleteMessage, MarkAsRead, MessageId, OutboundEvent, SubjectId};

/// Read-state coordinator.
#[derive(Debug, Clone, Default)]
pub struct ReadStateCoordinator {
    dropped: u64,
}

impl ReadStateCoordinator {
    /// Create a coordinator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands dropped because the channel was not connected.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// User opened a conversation: emit `markAsRead`.
    pub fn mark_as_read<I>(
        &mut self,
        transport: &mut TransportHandle<I>,
        chat_id: ChatId,
        subject_id: SubjectId,
    ) -> Vec<TransportAction>
    where
        I: Copy + Ord + std::fmt::Debug + std::ops::Sub<Output = std::time::Duration>,
    {
        self.issue(transport, OutboundEvent::MarkAsRead(MarkAsRead { chat_id, subject_id }))
    }

    /// User deleted messages: emit `deleteMessage`.
    ///
    /// An empty id list is not sent.
    pub fn delete_messages<I>(
        &mut self,
        transport: &mut TransportHandle<I>,
        chat_id: ChatId,
        message_ids: Vec<MessageId>,
    ) -> Vec<TransportAction>
    where
        I: Copy + Ord + std::fmt::Debug + std::ops::Sub<Output = std::time::Duration>,
    {
        if message_ids.is_empty() {
            return vec![];
        }
        self.issue(transport, OutboundEvent::DeleteMessage(DeleteMessage { chat_id, message_ids }))
    }

    fn issue<I>(&mut self, transport: &mut TransportHandle<I>, event: OutboundEvent) -> Vec<TransportAction>
    where
        I: Copy + Ord + std::fmt::Debug + std::ops::Sub<Output = std::time::Duration>,
    {
        let actions = transport.send(event);
        if actions.is_empty() {
            self.dropped += 1;
        }
        actions
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use huddle_core::ReconnectPolicy;

    use super::*;

    fn connected() -> TransportHandle<Instant> {
        let mut transport = TransportHandle::new(ReconnectPolicy::default());
        transport.enable();
        transport.handle_opened();
        transport
    }

    #[test]
    fn mark_as_read_emits_command() {
        let mut transport = connected();
        let mut coordinator = ReadStateCoordinator::new();

        let actions = coordinator.mark_as_read(&mut transport, "c1".into(), "s1".into());
        assert_eq!(actions, vec![TransportAction::Send(OutboundEvent::MarkAsRead(MarkAsRead {
            chat_id: "c1".into(),
            subject_id: "s1".into(),
        }))]);
    }

    #[test]
    fn delete_emits_command_with_all_ids() {
        let mut transport = connected();
        let mut coordinator = ReadStateCoordinator::new();

        let actions = coordinator.delete_messages(&mut transport, "c1".into(), vec!["m1".into(), "m2".into()]);
        let [TransportAction::Send(OutboundEvent::DeleteMessage(cmd))] = actions.as_slice() else {
            panic!("expected one deleteMessage, got {actions:?}");
        };
        assert_eq!(cmd.message_ids.len(), 2);
    }

    #[test]
    fn disconnected_commands_are_dropped() {
        let mut transport = TransportHandle::<Instant>::new(ReconnectPolicy::default());
        let mut coordinator = ReadStateCoordinator::new();

        assert!(coordinator.mark_as_read(&mut transport, "c1".into(), "s1".into()).is_empty());
        assert_eq!(coordinator.dropped(), 1);
    }

    #[test]
    fn empty_delete_is_not_sent() {
        let mut transport = connected();
        let mut coordinator = ReadStateCoordinator::new();

        assert!(coordinator.delete_messages(&mut transport, "c1".into(), vec![]).is_empty());
        assert_eq!(coordinator.dropped(), 0);
    }
}
