//! Transport handle state machine.
//!
//! Owns the lifecycle of the single persistent event channel to the server.
//! Uses the action pattern: methods take time as input and return actions for
//! the driver to execute, so the handle itself never performs I/O.
//!
//! # State Machine
//!
//! ```text
//!             enable              opened
//! ┌──────────┐      ┌────────────┐      ┌───────────┐
//! │ Disabled │─────>│ Connecting │─────>│ Connected │
//! └──────────┘      └────────────┘      └───────────┘
//!      ^                 │    ^               │
//!      │ disable         │    │ backoff       │ closed / error
//!      │ (any state)     ↓    │ elapsed       ↓
//!      │              ┌─────────┐             │
//!      └──────────────│ Backoff │<────────────┘
//!                     └─────────┘
//! ```
//!
//! # Invariants
//!
//! - No `Open` action is ever produced while disabled. The channel is only
//!   established after an explicit `enable`.
//! - A `Connectivity` signal is produced exactly once per transition into or
//!   out of `Connected`, so observers always see an accurate state.
//! - `send` never fails. While not connected the event is dropped.

use std::time::Duration;

use huddle_proto::OutboundEvent;

/// Delay before the first reconnect attempt.
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Upper bound on the reconnect delay.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Exponential reconnect policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay after the first failure.
    pub initial: Duration,
    /// Maximum delay.
    pub max: Duration,
    /// Growth factor per consecutive failure.
    pub multiplier: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { initial: DEFAULT_INITIAL_BACKOFF, max: DEFAULT_MAX_BACKOFF, multiplier: 2 }
    }
}

impl ReconnectPolicy {
    /// Delay before reconnect attempt number `failures` (1-based).
    ///
    /// 1s, 2s, 4s, ... capped at `max`.
    pub fn delay(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1);
        self.multiplier
            .checked_pow(exponent)
            .and_then(|factor| self.initial.checked_mul(factor))
            .map_or(self.max, |delay| delay.min(self.max))
    }
}

/// Connectivity signal observed by the rest of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    /// Channel is open and usable.
    Connected,
    /// Channel is gone. Server-side room membership is lost.
    Disconnected,
}

/// Observable transport state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    /// Not activated. No channel, no reconnects.
    Disabled,
    /// `Open` issued, waiting for the driver to report the result.
    Connecting,
    /// Channel is open.
    Connected,
    /// Waiting out the reconnect delay.
    Backoff,
}

/// Actions returned by the transport state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportAction {
    /// Establish the channel.
    Open,
    /// Tear the channel down.
    Close,
    /// Write this event to the channel.
    Send(OutboundEvent),
    /// Connectivity changed.
    Signal(Connectivity),
}

#[derive(Debug, Clone, Copy)]
enum Phase<I> {
    Disabled,
    Connecting { failures: u32 },
    Connected,
    Backoff { failures: u32, since: I },
}

/// Transport handle state machine.
///
/// Generic over `Instant` to support both real time and virtual time for
/// deterministic testing.
#[derive(Debug, Clone)]
pub struct TransportHandle<I> {
    phase: Phase<I>,
    policy: ReconnectPolicy,
}

impl<I> TransportHandle<I>
where
    I: Copy + Ord + std::fmt::Debug + std::ops::Sub<Output = Duration>,
{
    /// Create a disabled handle.
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self { phase: Phase::Disabled, policy }
    }

    /// Current state.
    pub fn state(&self) -> TransportState {
        match self.phase {
            Phase::Disabled => TransportState::Disabled,
            Phase::Connecting { .. } => TransportState::Connecting,
            Phase::Connected => TransportState::Connected,
            Phase::Backoff { .. } => TransportState::Backoff,
        }
    }

    /// Whether the channel is open.
    pub fn is_connected(&self) -> bool {
        matches!(self.phase, Phase::Connected)
    }

    /// Whether the handle has been activated.
    pub fn is_enabled(&self) -> bool {
        !matches!(self.phase, Phase::Disabled)
    }

    /// Consecutive failed attempts since the last successful open.
    pub fn failures(&self) -> u32 {
        match self.phase {
            Phase::Connecting { failures } | Phase::Backoff { failures, .. } => failures,
            Phase::Disabled | Phase::Connected => 0,
        }
    }

    /// Activate the channel. Idempotent.
    pub fn enable(&mut self) -> Vec<TransportAction> {
        if self.is_enabled() {
            return vec![];
        }

        tracing::info!("transport enabled, opening channel");
        self.phase = Phase::Connecting { failures: 0 };
        vec![TransportAction::Open]
    }

    /// Deactivate the channel and stop reconnecting. Idempotent.
    pub fn disable(&mut self) -> Vec<TransportAction> {
        let was_connected = match self.phase {
            Phase::Disabled => return vec![],
            Phase::Connected => true,
            Phase::Connecting { .. } | Phase::Backoff { .. } => false,
        };

        tracing::info!("transport disabled");
        self.phase = Phase::Disabled;

        let mut actions = vec![TransportAction::Close];
        if was_connected {
            actions.push(TransportAction::Signal(Connectivity::Disconnected));
        }
        actions
    }

    /// Driver reports the channel is open.
    pub fn handle_opened(&mut self) -> Vec<TransportAction> {
        match self.phase {
            Phase::Disabled => {
                // Open raced with disable
                tracing::debug!("channel opened while disabled, closing");
                vec![TransportAction::Close]
            },
            Phase::Connected => vec![],
            Phase::Connecting { .. } | Phase::Backoff { .. } => {
                tracing::info!("transport connected");
                self.phase = Phase::Connected;
                vec![TransportAction::Signal(Connectivity::Connected)]
            },
        }
    }

    /// Driver reports the channel closed.
    pub fn handle_closed(&mut self, now: I, reason: &str) -> Vec<TransportAction> {
        tracing::info!(%reason, "transport closed");
        self.enter_backoff(now)
    }

    /// Driver reports a connection error (`connect_error`).
    ///
    /// Not fatal: the handle schedules a reconnect.
    pub fn handle_failed(&mut self, now: I, reason: &str) -> Vec<TransportAction> {
        tracing::warn!(%reason, failures = self.failures().saturating_add(1), "transport connect error");
        self.enter_backoff(now)
    }

    /// Periodic tick. Re-opens the channel once the backoff has elapsed.
    pub fn handle_tick(&mut self, now: I) -> Vec<TransportAction> {
        let Phase::Backoff { failures, since } = self.phase else {
            return vec![];
        };

        let delay = self.policy.delay(failures);
        if now - since < delay {
            return vec![];
        }

        tracing::info!(failures, ?delay, "reconnecting");
        self.phase = Phase::Connecting { failures };
        vec![TransportAction::Open]
    }

    /// Write an event if connected. Dropped otherwise.
    pub fn send(&mut self, event: OutboundEvent) -> Vec<TransportAction> {
        if self.is_connected() {
            vec![TransportAction::Send(event)]
        } else {
            tracing::debug!(event = event.name(), "not connected, dropping outbound event");
            vec![]
        }
    }

    fn enter_backoff(&mut self, now: I) -> Vec<TransportAction> {
        match self.phase {
            Phase::Disabled | Phase::Backoff { .. } => vec![],
            Phase::Connected => {
                self.phase = Phase::Backoff { failures: 1, since: now };
                vec![TransportAction::Signal(Connectivity::Disconnected)]
            },
            Phase::Connecting { failures } => {
                self.phase = Phase::Backoff { failures: failures.saturating_add(1), since: now };
                vec![]
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use huddle_proto::ChatId;

    use super::*;

    fn handle() -> TransportHandle<Instant> {
        TransportHandle::new(ReconnectPolicy::default())
    }

    fn join(id: &str) -> OutboundEvent {
        OutboundEvent::join_room(ChatId::new(id))
    }

    #[test]
    fn nothing_opens_before_enable() {
        let mut t = handle();
        let now = Instant::now();

        assert!(t.handle_tick(now + Duration::from_secs(600)).is_empty());
        assert!(t.send(join("c1")).is_empty());
        assert_eq!(t.state(), TransportState::Disabled);
    }

    #[test]
    fn enable_is_idempotent() {
        let mut t = handle();
        assert_eq!(t.enable(), vec![TransportAction::Open]);
        assert!(t.enable().is_empty());
        assert_eq!(t.state(), TransportState::Connecting);
    }

    #[test]
    fn disable_is_idempotent() {
        let mut t = handle();
        assert!(t.disable().is_empty());

        t.enable();
        t.handle_opened();
        assert_eq!(t.disable(), vec![
            TransportAction::Close,
            TransportAction::Signal(Connectivity::Disconnected)
        ]);
        assert!(t.disable().is_empty());
    }

    #[test]
    fn opened_signals_connected_once() {
        let mut t = handle();
        t.enable();
        assert_eq!(t.handle_opened(), vec![TransportAction::Signal(Connectivity::Connected)]);
        assert!(t.handle_opened().is_empty());
        assert!(t.is_connected());
    }

    #[test]
    fn send_only_while_connected() {
        let mut t = handle();
        t.enable();
        assert!(t.send(join("c1")).is_empty());

        t.handle_opened();
        assert_eq!(t.send(join("c1")), vec![TransportAction::Send(join("c1"))]);
    }

    #[test]
    fn close_signals_disconnected_and_backs_off() {
        let mut t = handle();
        let now = Instant::now();
        t.enable();
        t.handle_opened();

        let actions = t.handle_closed(now, "server going away");
        assert_eq!(actions, vec![TransportAction::Signal(Connectivity::Disconnected)]);
        assert_eq!(t.state(), TransportState::Backoff);

        // Not yet
        assert!(t.handle_tick(now + Duration::from_millis(999)).is_empty());
        assert_eq!(t.handle_tick(now + Duration::from_secs(1)), vec![TransportAction::Open]);
        assert_eq!(t.state(), TransportState::Connecting);
    }

    #[test]
    fn consecutive_failures_grow_the_delay() {
        let mut t = handle();
        let start = Instant::now();
        t.enable();

        // First failure: 1s
        t.handle_failed(start, "refused");
        assert_eq!(t.failures(), 1);
        let at = start + Duration::from_secs(1);
        assert_eq!(t.handle_tick(at), vec![TransportAction::Open]);

        // Second failure: 2s
        t.handle_failed(at, "refused");
        assert_eq!(t.failures(), 2);
        assert!(t.handle_tick(at + Duration::from_secs(1)).is_empty());
        assert_eq!(t.handle_tick(at + Duration::from_secs(2)), vec![TransportAction::Open]);

        // Success resets
        t.handle_opened();
        assert_eq!(t.failures(), 0);
    }

    #[test]
    fn failure_while_connecting_does_not_signal() {
        let mut t = handle();
        t.enable();
        assert!(t.handle_failed(Instant::now(), "dns").is_empty());
    }

    #[test]
    fn disable_cancels_pending_reconnect() {
        let mut t = handle();
        let now = Instant::now();
        t.enable();
        t.handle_failed(now, "refused");

        assert_eq!(t.disable(), vec![TransportAction::Close]);
        assert!(t.handle_tick(now + Duration::from_secs(60)).is_empty());
    }

    #[test]
    fn late_open_after_disable_is_closed() {
        let mut t = handle();
        t.enable();
        t.disable();
        assert_eq!(t.handle_opened(), vec![TransportAction::Close]);
        assert!(!t.is_connected());
    }

    #[test]
    fn failure_count_saturates() {
        let mut t = handle();
        let now = Instant::now();
        t.enable();
        t.phase = Phase::Connecting { failures: u32::MAX };

        assert!(t.handle_failed(now, "refused").is_empty());
        assert_eq!(t.failures(), u32::MAX);
        assert_eq!(t.handle_tick(now + Duration::from_secs(30)), vec![TransportAction::Open]);
    }

    #[test]
    fn policy_caps_delay() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay(1), Duration::from_secs(1));
        assert_eq!(policy.delay(3), Duration::from_secs(4));
        assert_eq!(policy.delay(6), Duration::from_secs(30));
        assert_eq!(policy.delay(u32::MAX), Duration::from_secs(30));
    }
}
