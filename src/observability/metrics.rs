//! Metrics collection and exposition.
//!
//! # Metrics
//! - `ws_handshakes_total` (counter): handshakes by outcome
//!   (`accepted`, `not_found`, `rejected`, `error`, `overloaded`)
//! - `ws_dispatch_total` (counter): dispatched connections by outcome
//!   (`handled`, `no_route`, `failed`)
//! - `ws_active_connections` (gauge): connection slots in use, i.e.
//!   handshakes still in flight plus upgraded sockets
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and serve it on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_handshake(outcome: &'static str) {
    metrics::counter!("ws_handshakes_total", "outcome" => outcome).increment(1);
}

pub fn record_dispatch(outcome: &'static str) {
    metrics::counter!("ws_dispatch_total", "outcome" => outcome).increment(1);
}

pub fn connection_opened() {
    metrics::gauge!("ws_active_connections").increment(1.0);
}

pub fn connection_closed() {
    metrics::gauge!("ws_active_connections").decrement(1.0);
}
