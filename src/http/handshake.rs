//! Handshake gate: decides, before the upgrade, whether a connection may proceed.
//!
//! # Data Flow
//! ```text
//! (raw path, headers)
//!     → router.lookup(raw path) → RoutedPath
//!     → no route           → Reject(404 "not found\n")
//!     → route without hook → Proceed(path)
//!     → hook               → Proceed(path) | Reject(hook response)
//! ```
//!
//! # Design Decisions
//! - The `RoutedPath` returned with `Proceed` is the one the hook saw; the
//!   dispatcher must reuse it rather than match again
//! - Hook failures are returned, not swallowed; the transport decides what
//!   to answer

use axum::http::HeaderMap;
use axum::response::Response;
use axum::BoxError;
use thiserror::Error;

use crate::http::response::{not_found, StatusError};
use crate::observability::metrics;
use crate::routing::{RoutedPath, Router};

/// Outcome of the handshake gate.
#[derive(Debug)]
pub enum Handshake {
    /// Upgrade the connection and dispatch this path.
    Proceed(RoutedPath),
    /// Answer with this response; the connection never upgrades.
    Reject(Response),
}

/// The gate could not produce a well-formed outcome.
#[derive(Debug, Error)]
pub enum GateError {
    #[error(transparent)]
    Status(#[from] StatusError),

    #[error("pre-upgrade hook failed: {0}")]
    Hook(#[source] BoxError),
}

/// Runs route resolution and pre-upgrade hooks for incoming handshakes.
#[derive(Debug, Clone)]
pub struct HandshakeGate {
    router: Router,
}

impl HandshakeGate {
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    /// Check one handshake. Called exactly once per connection, before upgrade.
    pub async fn check(&self, raw_path: &str, headers: &HeaderMap) -> Result<Handshake, GateError> {
        let path = self.router.lookup(raw_path);

        let Some(route) = path.route().cloned() else {
            tracing::debug!(path = %raw_path, "No route matched, rejecting handshake");
            metrics::record_handshake("not_found");
            return Ok(Handshake::Reject(not_found()));
        };

        let Some(hook) = route.hook() else {
            metrics::record_handshake("accepted");
            return Ok(Handshake::Proceed(path));
        };

        match hook.process_request(&path, headers).await.map_err(GateError::Hook)? {
            None => {
                metrics::record_handshake("accepted");
                Ok(Handshake::Proceed(path))
            }
            Some(rejection) => {
                let response = rejection.try_into_response()?;
                metrics::record_handshake("rejected");
                tracing::debug!(
                    path = %raw_path,
                    route = %route.label(),
                    status = %response.status(),
                    "Handshake rejected by hook"
                );
                Ok(Handshake::Reject(response))
            }
        }
    }
}
