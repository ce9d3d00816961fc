use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::info;

use crate::config::Config;
use crate::error::ServerError;
use crate::http::connection::Connection;
use crate::http::response::Deliverable;
use crate::server::backoff::BackoffConfig;
use crate::server::dispatcher::Dispatcher;
use crate::server::events::{self, EventSender, Events};
use crate::server::registry::ConnectionRegistry;

/// A running listener plus the state shared with its connections.
pub struct Server {
    local_addr: SocketAddr,
    registry: Arc<ConnectionRegistry>,
    dispatcher: Dispatcher,
    shutdown: broadcast::Sender<()>,
    accept_task: JoinHandle<()>,
}

impl Server {
    /// Binds the configured address and starts accepting connections.
    ///
    /// A bind failure is the only error surfaced; everything after that is
    /// handled per connection.
    pub async fn listen(cfg: &Config) -> Result<(Self, Events), ServerError> {
        let addr = cfg.listen_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(ServerError::LocalAddr)?;
        info!("Listening on {}", local_addr);

        let registry = Arc::new(ConnectionRegistry::new());
        let (event_tx, events) = events::channel();
        let (shutdown, shutdown_rx) = broadcast::channel(1);

        let ctx = ConnectionContext {
            max_request_bytes: cfg.max_request_bytes,
            registry: Arc::clone(&registry),
            events: event_tx,
        };
        let accept_task = tokio::spawn(accept_loop(
            listener,
            ctx,
            BackoffConfig::default(),
            shutdown_rx,
        ));

        let server = Self {
            local_addr,
            dispatcher: Dispatcher::new(Arc::clone(&registry)),
            registry,
            shutdown,
            accept_task,
        };

        Ok((server, events))
    }

    /// Address actually bound, useful when the configured port was 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// A cloneable handle for delivering responses from other tasks.
    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher.clone()
    }

    /// Delivers `response` to its connection. See [`Dispatcher::send`].
    pub fn send<R: Deliverable + ?Sized>(&self, response: &R) {
        self.dispatcher.send(response);
    }

    /// Number of connections holding a framed request without a response yet.
    pub fn pending(&self) -> usize {
        self.registry.len()
    }

    /// Stops accepting and releases the listening port.
    ///
    /// Connections already accepted keep running until they finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.accept_task.await {
            tracing::error!("Accept loop ended abnormally: {}", e);
        }
        info!("Stopped listening on {}", self.local_addr);
    }
}

/// Source of incoming connections for [`accept_loop`].
///
/// Dropping a pending `accept()` future must not lose a connection.
#[async_trait]
pub(crate) trait AcceptListener: Send + Sync {
    async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)>;
}

#[async_trait]
impl AcceptListener for TcpListener {
    async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        TcpListener::accept(self).await
    }
}

/// State every accepted connection is wired to.
pub(crate) struct ConnectionContext {
    pub max_request_bytes: usize,
    pub registry: Arc<ConnectionRegistry>,
    pub events: EventSender,
}

/// Accepts connections until `shutdown` fires, spawning a task for each.
///
/// Accept failures (for example running out of file descriptors) are
/// retried after an exponential back-off; a successful accept resets it.
pub(crate) async fn accept_loop<L: AcceptListener>(
    listener: L,
    ctx: ConnectionContext,
    backoff: BackoffConfig,
    mut shutdown: broadcast::Receiver<()>,
) {
    let backoff = backoff.normalized();
    let mut delay = backoff.initial_delay;

    loop {
        let accepted = tokio::select! {
            res = listener.accept() => res,
            _ = shutdown.recv() => break,
        };

        let (socket, peer) = match accepted {
            Ok(pair) => {
                delay = backoff.initial_delay;
                pair
            }
            Err(e) => {
                tracing::warn!(retry_in = ?delay, "Failed to accept connection: {}", e);
                tokio::select! {
                    _ = sleep(delay) => {}
                    _ = shutdown.recv() => break,
                }
                delay = backoff.next_delay(delay);
                continue;
            }
        };

        let conn = Connection::new(
            socket,
            peer,
            ctx.max_request_bytes,
            Arc::clone(&ctx.registry),
            ctx.events.clone(),
        );
        tracing::debug!(id = %conn.id(), peer = %peer, "Accepted connection");

        tokio::spawn(conn.run());
    }
    // listener dropped here, releasing the port
}
