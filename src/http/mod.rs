//! HTTP wire handling.
//!
//! - **`framer`**: decides when a buffered request is complete
//! - **`connection`**: per-connection state machine
//! - **`response`**: response model and dispatchable response types
//! - **`writer`**: response serialization and fixed rejection payloads
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Buffer bytes until the framer decides
//!        └──────┬──────┘
//!               │
//!       ┌───────┴─────────────────┐
//!       │ framed                  │ keep-alive / invalid / too large
//!       ▼                         ▼
//!  ┌──────────────────┐     ┌─────────────┐
//!  │ AwaitingResponse │     │  Rejecting  │ ← Fixed reply
//!  └──────┬───────────┘     └──────┬──────┘
//!         │ dispatched             │
//!         ▼                        │
//!  ┌─────────────┐                 │
//!  │   Writing   │                 │
//!  └──────┬──────┘                 │
//!         └──────────┬─────────────┘
//!                    ▼
//!              ┌───────────┐
//!              │  Closed   │ ← registry entry removed, ConnectionClosed raised
//!              └───────────┘
//! ```
//!
//! The peer closing or erroring in any state goes straight to `Closed`.

pub mod connection;
pub mod framer;
pub mod response;
pub mod writer;
