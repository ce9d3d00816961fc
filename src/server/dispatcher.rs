//! Delivery of responses to waiting connections.

use std::sync::Arc;

use bytes::Bytes;

use crate::http::response::Deliverable;
use crate::server::registry::ConnectionRegistry;

/// Routes a rendered response back to the connection it answers.
///
/// Cheap to clone; every clone shares the server's registry.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ConnectionRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Hands `response` to its connection, which writes it and closes.
    ///
    /// If the peer already went away the response is silently discarded.
    pub fn send<R: Deliverable + ?Sized>(&self, response: &R) {
        let id = response.id();

        let Some(slot) = self.registry.take(&id) else {
            tracing::debug!(id = %id, "Response for a closed connection, dropping");
            return;
        };

        let payload: Bytes = response.render();
        let len = payload.len();

        // The connection task may have exited between take and send
        if slot.send(payload).is_err() {
            tracing::debug!(id = %id, "Connection closed before response was handed over");
            return;
        }

        tracing::trace!(id = %id, bytes = len, "Response dispatched");
    }
}
