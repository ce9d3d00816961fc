//! Outbound notifications raised by connection tasks.

use tokio::sync::mpsc;

use crate::server::registry::ConnectionId;

/// Signals consumed by the request-processing layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// A complete request was framed and is waiting for a response.
    RequestReady { id: ConnectionId, request: String },
    /// The connection is gone. Raised exactly once per accepted connection.
    ConnectionClosed { id: ConnectionId },
}

impl ServerEvent {
    pub fn id(&self) -> ConnectionId {
        match self {
            ServerEvent::RequestReady { id, .. } | ServerEvent::ConnectionClosed { id } => *id,
        }
    }
}

/// Sending half, cloned into every connection task.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<ServerEvent>,
}

impl EventSender {
    pub fn request_ready(&self, id: ConnectionId, request: String) {
        self.emit(ServerEvent::RequestReady { id, request });
    }

    pub fn connection_closed(&self, id: ConnectionId) {
        self.emit(ServerEvent::ConnectionClosed { id });
    }

    fn emit(&self, event: ServerEvent) {
        // Nobody listening is not a connection error
        if self.tx.send(event).is_err() {
            tracing::trace!("Event dropped, receiver is gone");
        }
    }
}

/// Receiving half handed to the caller of [`Server::listen`](crate::server::Server::listen).
#[derive(Debug)]
pub struct Events {
    rx: mpsc::UnboundedReceiver<ServerEvent>,
}

impl Events {
    /// Waits for the next event. Returns `None` once the server and every
    /// connection task have gone away.
    pub async fn recv(&mut self) -> Option<ServerEvent> {
        self.rx.recv().await
    }
}

/// Creates a connected sender/receiver pair.
pub fn channel() -> (EventSender, Events) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx }, Events { rx })
}
