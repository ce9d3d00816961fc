//! Registry of connections waiting for a response.
//!
//! An entry is inserted by the connection task once its request is framed
//! and removed exactly once, either by the dispatcher (which takes the
//! response channel) or by the connection's own close path.

use bytes::Bytes;
use dashmap::DashMap;
use tokio::sync::oneshot;
use uuid::Uuid;

/// Correlation identifier assigned to a connection when it is accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generates a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Channel through which a connection task receives its rendered response.
pub type ResponseSlot = oneshot::Sender<Bytes>;

/// Concurrent map from [`ConnectionId`] to the connection's response slot.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    inner: DashMap<ConnectionId, ResponseSlot>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection whose request has been framed.
    ///
    /// Identifiers are never reused, so an existing entry indicates a bug in
    /// the caller; the new slot replaces it and a warning is logged.
    pub fn insert(&self, id: ConnectionId, slot: ResponseSlot) {
        if self.inner.insert(id, slot).is_some() {
            tracing::warn!(id = %id, "Connection registered twice");
        }
    }

    /// Removes and returns the slot for `id`, if the connection is still open.
    pub fn take(&self, id: &ConnectionId) -> Option<ResponseSlot> {
        self.inner.remove(id).map(|(_, slot)| slot)
    }

    /// Drops the entry for `id`. No-op if there is none.
    pub fn remove(&self, id: &ConnectionId) {
        self.inner.remove(id);
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.inner.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
