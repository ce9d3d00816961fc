//! Listening socket, connection registry and response dispatch.
//!
//! ```text
//!  accept ──► Connection task ──► RequestReady(id, text) ──► caller
//!                  ▲                                          │
//!                  └──── Dispatcher::send(id, payload) ◄──────┘
//! ```

pub mod backoff;
pub mod dispatcher;
pub mod events;
pub mod listener;
pub mod registry;

pub use backoff::BackoffConfig;
pub use dispatcher::Dispatcher;
pub use events::{Events, ServerEvent};
pub use listener::Server;
pub use registry::{ConnectionId, ConnectionRegistry};
