//! Room subscription manager.
//!
//! Keeps the set of server-side rooms joined on the current connection in
//! line with the set of conversations the cache knows about. Room membership
//! is connection-scoped: every disconnect empties the joined set, and the
//! next connect replays joins for everything known.
//!
//! # Join passes
//!
//! A join pass reads the known conversation ids and emits one join per id not
//! yet joined on this connection. Passes happen:
//!
//! - immediately on connect
//! - after a conversation list write, once no further list write has arrived
//!   for the debounce window (bursts collapse into one pass)
//! - on the retry timer, which is armed whenever a pass finds no known
//!   conversations and disarmed by the first pass that finds some
//!
//! Timers are stored as the instant they were armed and polled from ticks,
//! so the manager never schedules anything itself.

use std::{collections::{BTreeSet, HashSet}, time::Duration};

use huddle_proto::ChatId;

#[derive(Debug, Clone, Copy)]
struct Debounce<I> {
    last_write: I,
    collapsed: u32,
}

/// Room subscription manager.
#[derive(Debug, Clone)]
pub struct RoomSubscriptions<I> {
    joined: HashSet<ChatId>,
    retry_since: Option<I>,
    debounce: Option<Debounce<I>>,
    retry_interval: Duration,
    debounce_window: Duration,
    passes: u64,
}

impl<I> RoomSubscriptions<I>
where
    I: Copy + Ord + std::fmt::Debug + std::ops::Sub<Output = Duration>,
{
    /// Create a manager with nothing joined and no timers armed.
    pub fn new(retry_interval: Duration, debounce_window: Duration) -> Self {
        Self {
            joined: HashSet::new(),
            retry_since: None,
            debounce: None,
            retry_interval,
            debounce_window,
            passes: 0,
        }
    }

    /// Rooms joined on the current connection.
    pub fn joined(&self) -> &HashSet<ChatId> {
        &self.joined
    }

    /// Whether `chat_id` has been joined on the current connection.
    pub fn is_joined(&self, chat_id: &ChatId) -> bool {
        self.joined.contains(chat_id)
    }

    /// Join passes performed so far.
    pub fn join_passes(&self) -> u64 {
        self.passes
    }

    /// Whether the empty-set retry timer is armed.
    pub fn retry_armed(&self) -> bool {
        self.retry_since.is_some()
    }

    /// Whether a debounced pass is waiting for its quiet period.
    pub fn debounce_pending(&self) -> bool {
        self.debounce.is_some()
    }

    /// Connection established. Runs a pass right away.
    pub fn on_connected(&mut self, now: I, known: &BTreeSet<ChatId>) -> Vec<ChatId> {
        self.joined.clear();
        self.pass(now, known)
    }

    /// Connection lost. Membership is gone and timers are pointless until
    /// the next connect, which runs its own pass.
    pub fn on_disconnected(&mut self) {
        if !self.joined.is_empty() {
            tracing::debug!(rooms = self.joined.len(), "connection lost, forgetting joined rooms");
        }
        self.joined.clear();
        self.cancel_timers();
    }

    /// A conversation list was written. Restarts the debounce window.
    pub fn on_list_written(&mut self, now: I) {
        match &mut self.debounce {
            Some(debounce) => {
                debounce.last_write = now;
                debounce.collapsed += 1;
            },
            None => self.debounce = Some(Debounce { last_write: now, collapsed: 1 }),
        }
    }

    /// Disarm retry and debounce.
    pub fn cancel_timers(&mut self) {
        self.retry_since = None;
        self.debounce = None;
    }

    /// Fire whichever timers are due. Returns rooms to join.
    ///
    /// Timers that come due while disconnected are dropped without a pass.
    pub fn poll(&mut self, now: I, connected: bool, known: &BTreeSet<ChatId>) -> Vec<ChatId> {
        let mut due = false;

        if let Some(debounce) = self.debounce
            && now - debounce.last_write >= self.debounce_window
        {
            tracing::debug!(writes = debounce.collapsed, "list writes settled");
            self.debounce = None;
            due = true;
        }

        if let Some(since) = self.retry_since
            && now - since >= self.retry_interval
        {
            due = true;
        }

        if !due {
            return vec![];
        }
        if !connected {
            self.cancel_timers();
            return vec![];
        }

        self.pass(now, known)
    }

    fn pass(&mut self, now: I, known: &BTreeSet<ChatId>) -> Vec<ChatId> {
        self.passes += 1;

        if known.is_empty() {
            if self.retry_since.is_none() {
                tracing::debug!(interval = ?self.retry_interval, "no conversations known yet, retrying");
            }
            self.retry_since = Some(now);
            return vec![];
        }

        self.retry_since = None;

        let fresh: Vec<ChatId> =
            known.iter().filter(|id| !self.joined.contains(*id)).cloned().collect();
        self.joined.extend(fresh.iter().cloned());

        if !fresh.is_empty() {
            tracing::debug!(count = fresh.len(), total = self.joined.len(), "joining rooms");
        }
        fresh
    }
}
