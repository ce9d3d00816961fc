//! rawframe - raw-socket HTTP/1.x request framer
//!
//! Accepts TCP connections, buffers each one until a complete request has
//! arrived, hands the request text to the caller under a correlation id and
//! later writes the caller's response back to that connection before
//! closing it. Keep-alive is refused.

pub mod config;
pub mod error;
pub mod http;
pub mod server;

pub use config::Config;
pub use error::{ConfigError, ServerError};
pub use http::response::{Deliverable, RawResponse, Reply, Response};
pub use server::{ConnectionId, Dispatcher, Events, Server, ServerEvent};
