//! Engine configuration.

use std::time::Duration;

use huddle_core::ReconnectPolicy;
use huddle_proto::Role;

/// Interval between join attempts while no conversation list is loaded.
pub const DEFAULT_JOIN_RETRY_INTERVAL: Duration = Duration::from_secs(2);

/// Quiet period after the last conversation-list write before rejoining.
pub const DEFAULT_JOIN_DEBOUNCE: Duration = Duration::from_millis(500);

/// Number of recently applied message ids remembered for deduplication.
pub const DEFAULT_SEEN_WINDOW: usize = 512;

/// Sync engine configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Role the user is currently acting in. Selects the alert target.
    pub role: Role,
    /// Roles whose conversation lists are fetched once after enabling.
    pub seed_roles: Vec<Role>,
    /// Retry cadence while the known conversation set is empty.
    pub join_retry_interval: Duration,
    /// Debounce window for conversation-list writes.
    pub join_debounce: Duration,
    /// Reconnect backoff.
    pub reconnect: ReconnectPolicy,
    /// Size of the recently-seen message window.
    pub seen_window: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            role: Role::Student,
            seed_roles: Role::ALL.to_vec(),
            join_retry_interval: DEFAULT_JOIN_RETRY_INTERVAL,
            join_debounce: DEFAULT_JOIN_DEBOUNCE,
            reconnect: ReconnectPolicy::default(),
            seen_window: DEFAULT_SEEN_WINDOW,
        }
    }
}
