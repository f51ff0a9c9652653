//! Simulation driver implementing the Driver trait.
//!
//! `SimDriver` provides the same interface as the daemon's WebSocket driver
//! but for deterministic testing. It implements [`Driver`] so the same
//! [`huddle_app::Runtime`] orchestration code runs in both production and
//! simulation.
//!
//! Clones share state, so a test can keep a handle for injection and
//! inspection after moving the driver into a runtime.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
};

use huddle_app::{Driver, DriverEvent};
use huddle_client::{Alert, MessagingRoute, SyncEvent};
use huddle_proto::{ConversationSummary, InboundEvent, OutboundEvent, Role};

/// Error type for simulation driver.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("sim driver: {0}")]
pub struct SimDriverError(pub String);

/// Shared state for injection and capture.
#[derive(Default)]
struct SharedState {
    pending_events: VecDeque<DriverEvent>,
    incoming_frames: VecDeque<String>,
    outgoing_frames: Vec<String>,
    connected: bool,
    opens: u32,
    failing_opens: u32,
    conversations: HashMap<Role, Vec<ConversationSummary>>,
    failing_fetches: bool,
    fetches: u32,
    alerts: Vec<Alert>,
    navigations: Vec<MessagingRoute>,
}

/// Simulation driver for deterministic testing.
#[derive(Clone, Default)]
pub struct SimDriver {
    state: Arc<Mutex<SharedState>>,
}

impl SimDriver {
    /// Create a new simulation driver.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, SharedState> {
        // A poisoned lock only means another test thread panicked mid-update
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Inject a sync event as host input.
    pub fn inject_event(&self, event: SyncEvent) {
        self.state().pending_events.push_back(DriverEvent::Sync(event));
    }

    /// Ask the runtime to stop.
    pub fn inject_shutdown(&self) {
        self.state().pending_events.push_back(DriverEvent::Shutdown);
    }

    /// Inject a raw text frame from the server.
    pub fn inject_frame(&self, text: impl Into<String>) {
        self.state().incoming_frames.push_back(text.into());
    }

    /// Inject a well-formed server event.
    pub fn inject_inbound(&self, event: &InboundEvent) {
        match event.encode() {
            Ok(text) => self.inject_frame(text),
            Err(e) => tracing::warn!(error = %e, "could not encode injected event"),
        }
    }

    /// Conversation list served for `role`.
    pub fn set_conversations(&self, role: Role, conversations: Vec<ConversationSummary>) {
        self.state().conversations.insert(role, conversations);
    }

    /// Make every conversation fetch fail.
    pub fn fail_fetches(&self, failing: bool) {
        self.state().failing_fetches = failing;
    }

    /// Make the next `count` open attempts fail.
    pub fn fail_next_opens(&self, count: u32) {
        self.state().failing_opens = count;
    }

    /// Drop the channel as if the server went away.
    pub fn drop_connection(&self) {
        let mut state = self.state();
        state.connected = false;
        state.incoming_frames.clear();
    }

    /// Take all captured outgoing frames.
    pub fn take_outgoing(&self) -> Vec<String> {
        std::mem::take(&mut self.state().outgoing_frames)
    }

    /// Take all captured outgoing frames, decoded.
    pub fn take_outgoing_events(&self) -> Vec<OutboundEvent> {
        self.take_outgoing()
            .iter()
            .filter_map(|text| OutboundEvent::decode(text).ok())
            .collect()
    }

    /// Alerts shown so far.
    pub fn alerts(&self) -> Vec<Alert> {
        self.state().alerts.clone()
    }

    /// Navigations performed so far.
    pub fn navigations(&self) -> Vec<MessagingRoute> {
        self.state().navigations.clone()
    }

    /// Conversation fetches so far, failed ones included.
    pub fn fetch_count(&self) -> u32 {
        self.state().fetches
    }

    /// Open attempts so far, failed ones included.
    pub fn open_count(&self) -> u32 {
        self.state().opens
    }

    /// Whether there is unprocessed input.
    pub fn has_pending(&self) -> bool {
        let state = self.state();
        !state.pending_events.is_empty() || !state.incoming_frames.is_empty()
    }
}

impl Driver for SimDriver {
    type Error = SimDriverError;

    async fn poll_event(&mut self) -> Result<Option<DriverEvent>, Self::Error> {
        Ok(self.state().pending_events.pop_front())
    }

    async fn open(&mut self) -> Result<(), Self::Error> {
        let mut state = self.state();
        state.opens += 1;
        if state.failing_opens > 0 {
            state.failing_opens -= 1;
            return Err(SimDriverError("connection refused".into()));
        }
        state.connected = true;
        Ok(())
    }

    fn close(&mut self) {
        self.state().connected = false;
    }

    fn is_connected(&self) -> bool {
        self.state().connected
    }

    async fn send_frame(&mut self, text: String) -> Result<(), Self::Error> {
        let mut state = self.state();
        if !state.connected {
            return Err(SimDriverError("not connected".into()));
        }
        state.outgoing_frames.push(text);
        Ok(())
    }

    async fn recv_frame(&mut self) -> Option<String> {
        let mut state = self.state();
        if !state.connected {
            return None;
        }
        state.incoming_frames.pop_front()
    }

    async fn fetch_conversations(
        &mut self,
        role: Role,
    ) -> Result<Vec<ConversationSummary>, Self::Error> {
        let mut state = self.state();
        state.fetches += 1;
        if state.failing_fetches {
            return Err(SimDriverError(format!("fetch {role} failed")));
        }
        Ok(state.conversations.get(&role).cloned().unwrap_or_default())
    }

    fn show_alert(&mut self, alert: Alert) -> Result<(), Self::Error> {
        self.state().alerts.push(alert);
        Ok(())
    }

    fn navigate(&mut self, route: MessagingRoute) -> Result<(), Self::Error> {
        self.state().navigations.push(route);
        Ok(())
    }
}
