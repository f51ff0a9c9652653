//! Driver trait for abstracting I/O operations.
//!
//! The [`Driver`] trait decouples the runtime from specific I/O
//! implementations. Each host implements the trait to provide its event
//! channel, API access and alert rendering, while the generic
//! [`crate::Runtime`] handles all orchestration.

use std::future::Future;

use huddle_client::{Alert, MessagingRoute, SyncEvent};
use huddle_proto::{ConversationSummary, Role};

/// Input polled from the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverEvent {
    /// Forward to the sync engine.
    Sync(SyncEvent),
    /// Stop the runtime.
    Shutdown,
}

/// Abstracts I/O operations for the runtime.
///
/// Implementations provide platform-specific I/O while the generic
/// [`Runtime`](crate::Runtime) handles orchestration logic. This ensures
/// the same orchestration code runs in the daemon and in simulation.
///
/// # Implementations
///
/// - **Daemon**: tokio-tungstenite for the event channel, reqwest for the API
/// - **Simulation**: scripted frames and in-memory capture
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Poll for the next host input.
    ///
    /// Returns `None` if nothing is ready. Must not block for long; the
    /// runtime paces itself with the environment's sleep.
    fn poll_event(&mut self) -> impl Future<Output = Result<Option<DriverEvent>, Self::Error>> + Send;

    /// Open the event channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel cannot be established. The runtime
    /// reports it to the engine as a connect error.
    fn open(&mut self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Close the event channel.
    fn close(&mut self);

    /// Whether the event channel is open.
    fn is_connected(&self) -> bool;

    /// Write a text frame to the channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel is closed or the write fails.
    fn send_frame(&mut self, text: String) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Receive the next text frame, or `None` if none is ready.
    fn recv_frame(&mut self) -> impl Future<Output = Option<String>> + Send;

    /// Fetch the conversation list for `role` from the API.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    fn fetch_conversations(
        &mut self,
        role: Role,
    ) -> impl Future<Output = Result<Vec<ConversationSummary>, Self::Error>> + Send;

    /// Present an alert. The user's response comes back later through
    /// [`poll_event`](Driver::poll_event) as `SyncEvent::AlertResolved`.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn show_alert(&mut self, alert: Alert) -> Result<(), Self::Error>;

    /// Navigate the UI to a messaging surface.
    ///
    /// # Errors
    ///
    /// Returns an error if navigation fails.
    fn navigate(&mut self, route: MessagingRoute) -> Result<(), Self::Error>;
}
