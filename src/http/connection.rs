use std::net::SocketAddr;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::sync::oneshot;

use crate::http::framer::{Framing, RequestBuffer};
use crate::http::writer::{KEEP_ALIVE_REJECTION, ResponseWriter, rejection_for};
use crate::server::events::EventSender;
use crate::server::registry::{ConnectionId, ConnectionRegistry};

const READ_CHUNK: usize = 4096;

/// One accepted TCP connection, serving exactly one request.
pub struct Connection {
    id: ConnectionId,
    peer: SocketAddr,
    stream: TcpStream,
    read_buf: BytesMut,
    request: RequestBuffer,
    state: ConnectionState,
    registry: Arc<ConnectionRegistry>,
    events: EventSender,
}

pub enum ConnectionState {
    /// Accumulating request bytes.
    Reading,
    /// Request emitted; waiting for the dispatcher or for the peer to leave.
    AwaitingResponse(oneshot::Receiver<Bytes>),
    /// Writing a dispatched response.
    Writing(ResponseWriter),
    /// Writing a fixed rejection for a request that was never emitted.
    Rejecting(ResponseWriter),
    Closed,
}

impl Connection {
    pub fn new(
        stream: TcpStream,
        peer: SocketAddr,
        max_request_bytes: usize,
        registry: Arc<ConnectionRegistry>,
        events: EventSender,
    ) -> Self {
        Self {
            id: ConnectionId::new(),
            peer,
            stream,
            read_buf: BytesMut::with_capacity(READ_CHUNK),
            request: RequestBuffer::new(max_request_bytes),
            state: ConnectionState::Reading,
            registry,
            events,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Drives the connection to completion.
    ///
    /// Never fails: I/O errors end the connection and are logged. Whatever
    /// the path, the registry entry is removed and a single
    /// `ConnectionClosed` event is raised before returning.
    pub async fn run(mut self) {
        loop {
            let state = std::mem::replace(&mut self.state, ConnectionState::Closed);

            self.state = match state {
                ConnectionState::Reading => self.read_request().await,

                ConnectionState::AwaitingResponse(rx) => self.await_response(rx).await,

                ConnectionState::Writing(mut writer) => {
                    if let Err(e) = writer.write_to_stream(&mut self.stream).await {
                        tracing::warn!(
                            id = %self.id,
                            peer = %self.peer,
                            written = writer.written(),
                            error = %e,
                            request = %self.request.ascii_lossy(),
                            "Failed to write response"
                        );
                    }
                    ConnectionState::Closed
                }

                ConnectionState::Rejecting(mut writer) => {
                    if let Err(e) = writer.write_to_stream(&mut self.stream).await {
                        tracing::warn!(
                            id = %self.id,
                            peer = %self.peer,
                            error = %e,
                            request = %self.request.ascii_lossy(),
                            "Failed to write rejection"
                        );
                    }
                    ConnectionState::Closed
                }

                ConnectionState::Closed => break,
            };
        }

        self.close();
    }

    /// Reads until the framer reaches a verdict or the peer goes away.
    async fn read_request(&mut self) -> ConnectionState {
        loop {
            match self.read_chunk().await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::debug!(
                        id = %self.id,
                        buffered = self.request.buffered_len(),
                        "Peer closed before a full request arrived"
                    );
                    return ConnectionState::Closed;
                }
                Err(e) => {
                    tracing::info!(id = %self.id, peer = %self.peer, error = %e, "Socket error while reading");
                    return ConnectionState::Closed;
                }
            }

            let chunk = self.read_buf.split();

            match self.request.push(&chunk) {
                Framing::Incomplete | Framing::Ignored => continue,

                Framing::Complete(request) => {
                    let (tx, rx) = oneshot::channel();
                    self.registry.insert(self.id, tx);

                    tracing::debug!(id = %self.id, bytes = request.len(), "Request framed");
                    self.events.request_ready(self.id, request);

                    return ConnectionState::AwaitingResponse(rx);
                }

                Framing::KeepAliveRejected => {
                    tracing::warn!(
                        id = %self.id,
                        peer = %self.peer,
                        request = %self.request.ascii_lossy(),
                        "Rejecting keep-alive request, clients should come through the proxy"
                    );
                    let payload = Bytes::from_static(KEEP_ALIVE_REJECTION);
                    return ConnectionState::Rejecting(ResponseWriter::new(payload));
                }

                Framing::Rejected(reason) => {
                    tracing::warn!(id = %self.id, peer = %self.peer, reason = %reason, "Rejecting request");
                    return ConnectionState::Rejecting(ResponseWriter::new(rejection_for(&reason)));
                }
            }
        }
    }

    /// Waits for the dispatched response while draining straggler bytes.
    async fn await_response(&mut self, mut rx: oneshot::Receiver<Bytes>) -> ConnectionState {
        loop {
            tokio::select! {
                payload = &mut rx => {
                    return match payload {
                        Ok(bytes) => ConnectionState::Writing(ResponseWriter::new(bytes)),
                        // Slot dropped without a response
                        Err(_) => ConnectionState::Closed,
                    };
                }

                read = self.read_chunk() => {
                    match read {
                        Ok(true) => {
                            // Already emitted; anything else the peer sends is dropped
                            self.read_buf.clear();
                        }
                        Ok(false) => {
                            tracing::debug!(id = %self.id, "Peer closed before the response was ready");
                            return ConnectionState::Closed;
                        }
                        Err(e) => {
                            tracing::info!(id = %self.id, peer = %self.peer, error = %e, "Socket error while awaiting response");
                            return ConnectionState::Closed;
                        }
                    }
                }
            }
        }
    }

    /// Reads once into `read_buf`. `Ok(false)` means orderly EOF.
    async fn read_chunk(&mut self) -> anyhow::Result<bool> {
        self.read_buf.reserve(READ_CHUNK);
        let n = self.stream.read_buf(&mut self.read_buf).await?;
        Ok(n > 0)
    }

    fn close(self) {
        self.registry.remove(&self.id);
        tracing::debug!(id = %self.id, peer = %self.peer, "Connection closed");
        self.events.connection_closed(self.id);
        // stream dropped here
    }
}
