//! Production driver for the daemon.
//!
//! Implements the [`Driver`] trait with tokio-tungstenite for the event
//! channel, reqwest for the API and `tracing` as the alert surface. Host
//! input arrives on an mpsc channel fed by the stdin and signal tasks.

use huddle_app::{Driver, DriverEvent};
use huddle_client::{
    Alert, MessagingRoute,
    transport::{self, ConnectedClient},
};
use huddle_core::TransportError;
use huddle_proto::{ConversationSummary, Role};
use tokio::sync::mpsc;
use tracing::info;

use crate::{ApiClient, DaemonError};

/// Daemon driver implementing the [`Driver`] trait.
pub struct DaemonDriver {
    server_url: String,
    api: ApiClient,
    inputs: mpsc::Receiver<DriverEvent>,
    connection: Option<ConnectedClient>,
}

impl DaemonDriver {
    /// Create a driver for the event server at `server_url`.
    ///
    /// Nothing is opened until the runtime asks.
    pub fn new(server_url: String, api: ApiClient, inputs: mpsc::Receiver<DriverEvent>) -> Self {
        Self { server_url, api, inputs, connection: None }
    }
}

impl Driver for DaemonDriver {
    type Error = DaemonError;

    async fn poll_event(&mut self) -> Result<Option<DriverEvent>, Self::Error> {
        Ok(self.inputs.try_recv().ok())
    }

    async fn open(&mut self) -> Result<(), Self::Error> {
        let client = transport::connect(&self.server_url).await?;
        info!(server = %self.server_url, "event channel open");
        self.connection = Some(client);
        Ok(())
    }

    fn close(&mut self) {
        if let Some(conn) = self.connection.take() {
            conn.stop();
        }
    }

    fn is_connected(&self) -> bool {
        // Frames already queued still count as part of the connection
        self.connection
            .as_ref()
            .is_some_and(|conn| !conn.from_server.is_closed() || !conn.from_server.is_empty())
    }

    async fn send_frame(&mut self, text: String) -> Result<(), Self::Error> {
        let conn = self.connection.as_ref().ok_or(TransportError::NotConnected)?;
        conn.to_server.send(text).await.map_err(|_| TransportError::NotConnected)?;
        Ok(())
    }

    async fn recv_frame(&mut self) -> Option<String> {
        self.connection.as_mut().and_then(|conn| conn.from_server.try_recv().ok())
    }

    async fn fetch_conversations(
        &mut self,
        role: Role,
    ) -> Result<Vec<ConversationSummary>, Self::Error> {
        self.api.conversations(role).await
    }

    fn show_alert(&mut self, alert: Alert) -> Result<(), Self::Error> {
        info!(
            alert = %alert.id,
            from = %alert.sender_name,
            open = %alert.accept_route,
            "new message: {}",
            alert.message
        );
        Ok(())
    }

    fn navigate(&mut self, route: MessagingRoute) -> Result<(), Self::Error> {
        info!(%route, "navigate");
        Ok(())
    }
}

impl Drop for DaemonDriver {
    fn drop(&mut self) {
        self.close();
    }
}
