//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request
//!     → connection.rs (reserve a slot, assign ConnectionId)
//!     → handshake gate
//!     → WebSocket upgrade
//!     → dispatcher runs the handler
//!     → guard dropped, slot released
//! ```
//!
//! # Design Decisions
//! - A slot is held from the start of the handshake until the socket closes,
//!   so the limit counts in-flight handshakes plus upgraded sockets
//! - A request that cannot get a slot is refused with 503 before the gate runs
//! - Requests that never upgrade (rejected or plain HTTP) release their slot
//!   as soon as the response is produced

pub mod connection;

pub use connection::{ConnectionGuard, ConnectionId, ConnectionTracker};
