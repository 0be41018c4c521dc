//! Dispatcher: hands an upgraded socket to its route's handler.
//!
//! # Responsibilities
//! - Reuse the `RoutedPath` resolved at handshake time, or resolve now when
//!   the server runs without a handshake gate
//! - Close sockets that reached dispatch without a route (code 4040)
//! - Run the handler to completion and report its failure
//!
//! # Design Decisions
//! - The dispatcher does not touch traffic once the handler owns the socket
//! - Handler errors are returned to the caller, never swallowed

use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket};
use axum::BoxError;
use thiserror::Error;

use crate::observability::metrics;
use crate::routing::{RoutedPath, Router};

/// Close code sent when an upgraded connection has no route.
pub const CLOSE_NO_ROUTE: u16 = 4040;

/// Policy-violation code older deployments used for the same condition.
#[deprecated(note = "no-route closures use CLOSE_NO_ROUTE (4040)")]
pub const LEGACY_CLOSE_NO_ROUTE: u16 = 1008;

const NO_ROUTE_REASON: &str = "no route";

/// What the dispatcher receives for a connection.
#[derive(Debug, Clone)]
pub enum Target {
    /// Path already resolved by the handshake gate; used as is.
    Resolved(RoutedPath),
    /// Raw request-target; the dispatcher performs the lookup.
    Raw(String),
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("handler for route '{route}' failed: {source}")]
    Handler {
        route: String,
        #[source]
        source: BoxError,
    },

    #[error("failed to close unrouted connection: {0}")]
    Close(#[source] axum::Error),
}

/// Runs route handlers for upgraded connections.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    router: Router,
}

impl Dispatcher {
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    /// Resolve a target into a path, reusing a handshake result when there is one.
    pub fn resolve(&self, target: Target) -> RoutedPath {
        match target {
            Target::Resolved(path) => path,
            Target::Raw(raw) => self.router.lookup(&raw),
        }
    }

    /// Dispatch one upgraded connection. Resolves when the handler returns.
    pub async fn dispatch(&self, mut socket: WebSocket, target: Target) -> Result<(), DispatchError> {
        let path = self.resolve(target);

        let Some(route) = path.route().cloned() else {
            tracing::debug!(path = %path, "No route for upgraded connection, closing");
            metrics::record_dispatch("no_route");
            let frame = CloseFrame {
                code: CLOSE_NO_ROUTE,
                reason: Utf8Bytes::from_static(NO_ROUTE_REASON),
            };
            return socket
                .send(Message::Close(Some(frame)))
                .await
                .map_err(DispatchError::Close);
        };

        tracing::debug!(path = %path, route = %route.label(), "Dispatching connection");
        match route.handler().handle(socket, path).await {
            Ok(()) => {
                metrics::record_dispatch("handled");
                Ok(())
            }
            Err(source) => {
                metrics::record_dispatch("failed");
                Err(DispatchError::Handler {
                    route: route.label().to_string(),
                    source,
                })
            }
        }
    }
}
