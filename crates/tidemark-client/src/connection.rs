//! Websocket lifecycle management.
//!
//! [`ConnectionManager`] owns one socket connection at a time. Connecting
//! spawns a reader and a writer task; inbound frames decode to
//! [`ServerEvent`]s and arrive on the caller's signal channel, outbound
//! [`ClientEvent`]s go through [`ConnectionManager::send`]. Sends while
//! disconnected are dropped silently, matching the fire-and-forget contract
//! of the socket events (the REST path is the reliable one).

use futures_util::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_tungstenite::tungstenite::{self, Message as WsMessage};

use tidemark_proto::{ClientEvent, ServerEvent, UserId};

/// Outbound buffer size; overflow drops the event rather than blocking.
const OUTBOUND_BUFFER: usize = 64;

/// Transport-level failure.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Websocket handshake or protocol failure.
    #[error("websocket error: {0}")]
    Websocket(#[from] tungstenite::Error),
}

/// Signal from the socket tasks to the runtime.
#[derive(Debug)]
pub enum SocketSignal {
    /// Handshake completed and the user room was joined.
    Connected,
    /// A decoded server push.
    Event(ServerEvent),
    /// The connection dropped; the reason is for logging only.
    Disconnected(String),
}

/// Live connection state.
struct Link {
    outbound: mpsc::Sender<ClientEvent>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

/// Manages a single websocket connection to the chat backend.
pub struct ConnectionManager {
    url: String,
    link: Option<Link>,
}

impl ConnectionManager {
    /// Create a manager for the given websocket URL. Does not connect.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), link: None }
    }

    /// Whether a connection is currently established.
    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    /// Establish the connection and join the user's private room.
    ///
    /// Idempotent: a no-op when already connected. Signals flow to `signals`
    /// until the connection drops; the caller reconnects by calling this
    /// again after a [`SocketSignal::Disconnected`].
    pub async fn connect(
        &mut self,
        user_id: &UserId,
        signals: mpsc::Sender<SocketSignal>,
    ) -> Result<(), TransportError> {
        if self.link.is_some() {
            return Ok(());
        }

        let (stream, _) = tokio_tungstenite::connect_async(&self.url).await?;
        let (mut sink, mut source) = stream.split();

        // Join the per-user room first so no push is missed
        let join = ClientEvent::JoinUserRoom { user_id: user_id.clone() };
        sink.send(WsMessage::Text(join.encode())).await?;

        if signals.send(SocketSignal::Connected).await.is_err() {
            return Ok(());
        }

        let (outbound, mut outbound_rx) = mpsc::channel::<ClientEvent>(OUTBOUND_BUFFER);
        let writer = tokio::spawn(async move {
            while let Some(event) = outbound_rx.recv().await {
                if let Err(err) = sink.send(WsMessage::Text(event.encode())).await {
                    tracing::debug!(%err, "socket write failed");
                    break;
                }
            }
        });

        let reader = tokio::spawn(async move {
            let reason = loop {
                match source.next().await {
                    Some(Ok(WsMessage::Text(text))) => match ServerEvent::decode(&text) {
                        Ok(event) => {
                            if signals.send(SocketSignal::Event(event)).await.is_err() {
                                return;
                            }
                        },
                        // Forward-compatibility: unknown or malformed pushes
                        // are logged and skipped
                        Err(err) => tracing::debug!(%err, "undecodable frame dropped"),
                    },
                    Some(Ok(WsMessage::Close(_))) | None => break "closed by server".to_owned(),
                    Some(Ok(_)) => {}, // ping/pong, handled by the library
                    Some(Err(err)) => break err.to_string(),
                }
            };
            let _ = signals.send(SocketSignal::Disconnected(reason)).await;
        });

        self.link = Some(Link { outbound, reader, writer });
        Ok(())
    }

    /// Emit an event on the socket.
    ///
    /// Dropped silently (with a debug log) while disconnected or when the
    /// outbound buffer is full; socket events carry no delivery guarantee.
    pub fn send(&self, event: ClientEvent) {
        match &self.link {
            Some(link) => {
                if link.outbound.try_send(event).is_err() {
                    tracing::debug!("outbound socket buffer full, event dropped");
                }
            },
            None => tracing::debug!(event = event.name(), "socket event dropped while offline"),
        }
    }

    /// Tear down the connection, aborting both tasks.
    pub fn disconnect(&mut self) {
        if let Some(link) = self.link.take() {
            link.reader.abort();
            link.writer.abort();
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.disconnect();
    }
}
