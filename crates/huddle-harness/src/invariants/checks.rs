//! Standard invariant checks.

use std::collections::HashSet;

use super::{Invariant, InvariantResult, SyncSnapshot, Violation};

/// A message id appears at most once on any cached first page.
///
/// Duplicate deliveries must never be appended twice.
pub struct FirstPageUnique;

impl Invariant for FirstPageUnique {
    fn name(&self) -> &'static str {
        "first_page_unique"
    }

    fn check(&self, state: &SyncSnapshot) -> InvariantResult {
        for (chat_id, page) in &state.first_pages {
            let mut seen = HashSet::new();
            if let Some(dup) = page.iter().find(|m| !seen.insert(&m.id)) {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("chat {chat_id}: message {} appears twice", dup.id),
                });
            }
        }
        Ok(())
    }
}

/// No room is considered joined while disconnected.
///
/// Server-side membership dies with the connection.
pub struct NoRoomsWhileDisconnected;

impl Invariant for NoRoomsWhileDisconnected {
    fn name(&self) -> &'static str {
        "no_rooms_while_disconnected"
    }

    fn check(&self, state: &SyncSnapshot) -> InvariantResult {
        if !state.connected && !state.joined.is_empty() {
            return Err(Violation {
                invariant: self.name(),
                message: format!("disconnected but {} rooms marked joined", state.joined.len()),
            });
        }
        Ok(())
    }
}

/// The channel is never open while synchronization is disabled.
pub struct ConnectedImpliesEnabled;

impl Invariant for ConnectedImpliesEnabled {
    fn name(&self) -> &'static str {
        "connected_implies_enabled"
    }

    fn check(&self, state: &SyncSnapshot) -> InvariantResult {
        if state.connected && !state.enabled {
            return Err(Violation {
                invariant: self.name(),
                message: "connected while disabled".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use huddle_proto::{ChatId, Message};

    use super::*;

    fn message(id: &str) -> Message {
        Message {
            id: id.into(),
            chat_id: "c1".into(),
            sender_id: "u1".into(),
            sender_name: "Ada".into(),
            content: String::new(),
            created_at: String::new(),
        }
    }

    #[test]
    fn duplicate_on_first_page_is_reported() {
        let mut state = SyncSnapshot::default();
        state.first_pages.insert(ChatId::new("c1"), vec![message("m1"), message("m1")]);

        let violation = FirstPageUnique.check(&state).unwrap_err();
        assert_eq!(violation.invariant, "first_page_unique");
    }

    #[test]
    fn joined_rooms_while_disconnected_are_reported() {
        let mut state = SyncSnapshot::default();
        state.joined.insert(ChatId::new("c1"));

        assert!(NoRoomsWhileDisconnected.check(&state).is_err());

        state.connected = true;
        state.enabled = true;
        assert!(NoRoomsWhileDisconnected.check(&state).is_ok());
        assert!(ConnectedImpliesEnabled.check(&state).is_ok());
    }
}
