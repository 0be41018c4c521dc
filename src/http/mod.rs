//! WebSocket handshake and dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum, connection limit)
//!     → handshake.rs (route lookup, pre-upgrade hook)
//!         → reject: response.rs (404 / hook response), no upgrade
//!     → WebSocket upgrade
//!     → dispatch.rs (same RoutedPath → route handler)
//! ```

pub mod dispatch;
pub mod handshake;
pub mod response;
pub mod server;

pub use dispatch::{DispatchError, Dispatcher, Target, CLOSE_NO_ROUTE};
pub use handshake::{GateError, Handshake, HandshakeGate};
pub use response::{Rejection, Status, StatusError};
pub use server::{ServerHandle, WsServer};
