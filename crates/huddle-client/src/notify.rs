//! Notification gate.
//!
//! Decides whether an arriving message deserves a user-visible alert. The
//! user is never alerted while already looking at a messaging surface.
//!
//! Rendering is abstract: the gate produces an [`Alert`] describing what to
//! show and where accepting it leads. The renderer reports back with an
//! [`AlertResponse`], and an accepted alert resolves to a
//! [`MessagingRoute`] for the role that was current when the alert was raised.

use std::{collections::BTreeMap, fmt};

use huddle_proto::{ChatId, MessageReceived, Role};

/// Alerts awaiting a response beyond this count are forgotten, oldest first.
pub const MAX_PENDING_ALERTS: usize = 64;

/// UI location relevant to gating.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewContext {
    /// Whether a messaging surface is visible.
    pub in_messaging_surface: bool,
    /// Conversation open in the messaging surface, if any.
    pub focused_chat: Option<ChatId>,
}

impl ViewContext {
    /// Anywhere outside messaging.
    pub fn elsewhere() -> Self {
        Self::default()
    }

    /// Messaging surface with no conversation open.
    pub fn messaging() -> Self {
        Self { in_messaging_surface: true, focused_chat: None }
    }

    /// Messaging surface with `chat_id` open.
    pub fn focused(chat_id: impl Into<ChatId>) -> Self {
        Self { in_messaging_surface: true, focused_chat: Some(chat_id.into()) }
    }

    /// Whether `chat_id` is the conversation on screen.
    pub fn is_focused(&self, chat_id: &ChatId) -> bool {
        self.in_messaging_surface && self.focused_chat.as_ref() == Some(chat_id)
    }
}

/// Messaging surface per role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessagingRoute {
    /// Student messaging page.
    StudentMessages,
    /// Teacher messaging page.
    TeacherMessages,
}

impl MessagingRoute {
    /// Messaging surface for `role`.
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Student => Self::StudentMessages,
            Role::Teacher => Self::TeacherMessages,
        }
    }

    /// URL path of the surface.
    pub fn path(self) -> &'static str {
        match self {
            Self::StudentMessages => "/student/messages",
            Self::TeacherMessages => "/teacher/messages",
        }
    }
}

impl fmt::Display for MessagingRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Alert identifier, unique per engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AlertId(pub u64);

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "alert-{}", self.0)
    }
}

/// A toast-style alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    /// Identifier to answer with.
    pub id: AlertId,
    /// Sender display name (title).
    pub sender_name: String,
    /// Message content (body).
    pub message: String,
    /// Where accepting leads.
    pub accept_route: MessagingRoute,
}

/// What the user did with an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertResponse {
    /// Clicked through.
    Accepted,
    /// Dismissed or timed out.
    Dismissed,
}

/// Decides whether arrivals raise alerts.
#[derive(Debug, Clone)]
pub struct NotificationGate {
    role: Role,
    view: ViewContext,
    next_id: u64,
    pending: BTreeMap<AlertId, MessagingRoute>,
}

impl NotificationGate {
    /// Create a gate for a user acting in `role`.
    pub fn new(role: Role) -> Self {
        Self { role, view: ViewContext::default(), next_id: 0, pending: BTreeMap::new() }
    }

    /// Current view.
    pub fn view(&self) -> &ViewContext {
        &self.view
    }

    /// Record a view change.
    pub fn set_view(&mut self, view: ViewContext) {
        self.view = view;
    }

    /// Role used to pick the accept route.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Alerts awaiting a response.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Alert for an arrival, if the user should see one.
    pub fn evaluate(&mut self, event: &MessageReceived) -> Option<Alert> {
        if self.view.in_messaging_surface {
            tracing::trace!(chat_id = %event.chat_id, "in messaging surface, no alert");
            return None;
        }

        let id = AlertId(self.next_id);
        self.next_id += 1;

        let accept_route = MessagingRoute::for_role(self.role);
        self.pending.insert(id, accept_route);
        while self.pending.len() > MAX_PENDING_ALERTS {
            self.pending.pop_first();
        }

        Some(Alert {
            id,
            sender_name: event.sender_name.clone(),
            message: event.content.clone(),
            accept_route,
        })
    }

    /// Resolve an alert. Returns the route to navigate to if accepted.
    pub fn resolve(&mut self, id: AlertId, response: AlertResponse) -> Option<MessagingRoute> {
        let Some(route) = self.pending.remove(&id) else {
            tracing::debug!(%id, "response for unknown alert");
            return None;
        };

        match response {
            AlertResponse::Accepted => Some(route),
            AlertResponse::Dismissed => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arrival(sender: &str) -> MessageReceived {
        MessageReceived {
            chat_id: "c1".into(),
            id: "m1".into(),
            sender_id: sender.into(),
            sender_name: "Grace".into(),
            content: "Quiz moved to Friday".into(),
            created_at: "2024-03-01T09:00:00Z".into(),
        }
    }

    #[test]
    fn alerts_outside_messaging() {
        let mut gate = NotificationGate::new(Role::Student);

        let alert = gate.evaluate(&arrival("u2")).unwrap();
        assert_eq!(alert.sender_name, "Grace");
        assert_eq!(alert.message, "Quiz moved to Friday");
        assert_eq!(alert.accept_route.path(), "/student/messages");
    }

    #[test]
    fn suppressed_anywhere_in_messaging() {
        let mut gate = NotificationGate::new(Role::Teacher);

        gate.set_view(ViewContext::messaging());
        assert!(gate.evaluate(&arrival("u2")).is_none());

        // Coarse: a different conversation being open still suppresses
        gate.set_view(ViewContext::focused("c9"));
        assert!(gate.evaluate(&arrival("u2")).is_none());
    }

    #[test]
    fn every_sender_alerts_outside_messaging() {
        let mut gate = NotificationGate::new(Role::Student);

        let first = gate.evaluate(&arrival("u2")).unwrap();
        let second = gate.evaluate(&arrival("u3")).unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(gate.pending(), 2);
    }

    #[test]
    fn accepted_alert_navigates_to_role_route() {
        let mut gate = NotificationGate::new(Role::Teacher);
        let alert = gate.evaluate(&arrival("u2")).unwrap();

        assert_eq!(gate.resolve(alert.id, AlertResponse::Accepted), Some(MessagingRoute::TeacherMessages));
        // Answered once
        assert_eq!(gate.resolve(alert.id, AlertResponse::Accepted), None);
    }

    #[test]
    fn dismissed_alert_goes_nowhere() {
        let mut gate = NotificationGate::new(Role::Student);
        let alert = gate.evaluate(&arrival("u2")).unwrap();

        assert_eq!(gate.resolve(alert.id, AlertResponse::Dismissed), None);
        assert_eq!(gate.pending(), 0);
    }

    #[test]
    fn pending_alerts_are_bounded() {
        let mut gate = NotificationGate::new(Role::Student);
        let first = gate.evaluate(&arrival("u2")).unwrap();
        for _ in 0..MAX_PENDING_ALERTS {
            gate.evaluate(&arrival("u2"));
        }

        assert_eq!(gate.pending(), MAX_PENDING_ALERTS);
        assert_eq!(gate.resolve(first.id, AlertResponse::Accepted), None);
    }

    #[test]
    fn focus_requires_messaging_surface() {
        let view = ViewContext { in_messaging_surface: false, focused_chat: Some("c1".into()) };
        assert!(!view.is_focused(&"c1".into()));
        assert!(ViewContext::focused("c1").is_focused(&"c1".into()));
    }
}
