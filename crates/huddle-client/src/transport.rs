//! WebSocket transport for the client.
//!
//! Provides [`ConnectedClient`] which handles socket I/O for text frames.
//! This is a thin layer that only moves frames; decoding and every protocol
//! decision remain in the Sans-IO [`crate::SyncEngine`].
//!
//! The channel is considered closed when `from_server` yields `None`.

use futures_util::{SinkExt, StreamExt};
use huddle_core::TransportError;
use huddle_proto::MAX_FRAME_SIZE;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Frames buffered in each direction.
const CHANNEL_CAPACITY: usize = 64;

/// Handle to a connected WebSocket.
///
/// Frames are sent and received via the channels; an internal task handles
/// the socket.
pub struct ConnectedClient {
    /// Send text frames to the server.
    pub to_server: mpsc::Sender<String>,
    /// Receive text frames from the server.
    pub from_server: mpsc::Receiver<String>,
    /// Abort handle to stop the connection task.
    abort_handle: tokio::task::AbortHandle,
}

impl ConnectedClient {
    /// Stop the connection.
    pub fn stop(&self) {
        self.abort_handle.abort();
    }
}

impl Drop for ConnectedClient {
    fn drop(&mut self) {
        self.abort_handle.abort();
    }
}

/// Connect to a Huddle event server.
///
/// `server_url` must be a `ws://` or `wss://` URL.
pub async fn connect(server_url: &str) -> Result<ConnectedClient, TransportError> {
    let url = url::Url::parse(server_url)
        .map_err(|e| TransportError::Connection(format!("invalid url: {e}")))?;
    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(TransportError::Connection(format!("unsupported scheme: {}", url.scheme())));
    }

    let (socket, _response) = connect_async(url.as_str())
        .await
        .map_err(|e| TransportError::Connection(format!("handshake failed: {e}")))?;

    let (to_server_tx, to_server_rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);
    let (from_server_tx, from_server_rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);

    let handle = tokio::spawn(run_connection(socket, to_server_rx, from_server_tx));

    Ok(ConnectedClient {
        to_server: to_server_tx,
        from_server: from_server_rx,
        abort_handle: handle.abort_handle(),
    })
}

type Socket = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Bridge between the channels and the socket until either side closes.
async fn run_connection(
    socket: Socket,
    mut to_server: mpsc::Receiver<String>,
    from_server: mpsc::Sender<String>,
) {
    let (mut write, mut read) = socket.split();

    loop {
        tokio::select! {
            outgoing = to_server.recv() => {
                let Some(text) = outgoing else {
                    let _ = write.send(Message::Close(None)).await;
                    break;
                };
                if let Err(e) = write.send(Message::Text(text.into())).await {
                    tracing::warn!(error = %e, "websocket write failed");
                    break;
                }
            },
            incoming = read.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if text.len() > MAX_FRAME_SIZE {
                            tracing::warn!(size = text.len(), "oversized frame dropped");
                            continue;
                        }
                        if from_server.send(text.to_string()).await.is_err() {
                            break;
                        }
                    },
                    Some(Ok(Message::Ping(data))) => {
                        if write.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    },
                    Some(Ok(Message::Close(frame))) => {
                        tracing::debug!(?frame, "server closed websocket");
                        break;
                    },
                    Some(Ok(Message::Binary(_) | Message::Pong(_) | Message::Frame(_))) => {},
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "websocket read failed");
                        break;
                    },
                    None => break,
                }
            },
        }
    }
}
