//! WebSocket server setup.
//!
//! # Responsibilities
//! - Create the Axum router that sends every path to one upgrade handler
//! - Run the handshake gate before completing the upgrade
//! - Enforce the upgraded-connection limit
//! - Hand upgraded sockets to the dispatcher inside a per-connection span
//! - Bind, serve, and shut down gracefully

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, WebSocketUpgrade},
        ConnectInfo, State,
    },
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use crate::config::ServerConfig;
use crate::http::dispatch::{Dispatcher, Target};
use crate::http::handshake::{Handshake, HandshakeGate};
use crate::lifecycle::Shutdown;
use crate::net::ConnectionTracker;
use crate::observability::metrics;
use crate::routing::Router as RouteTable;

/// Application state injected into the upgrade handler.
#[derive(Clone)]
struct AppState {
    gate: Option<HandshakeGate>,
    dispatcher: Dispatcher,
    connections: ConnectionTracker,
}

/// WebSocket server routing connections through a route table.
pub struct WsServer {
    routes: RouteTable,
    config: ServerConfig,
    state: AppState,
}

impl WsServer {
    /// Create a server for the given routes and configuration.
    pub fn new(routes: RouteTable, config: ServerConfig) -> Self {
        let gate = config
            .routing
            .handshake_gate
            .then(|| HandshakeGate::new(routes.clone()));

        let state = AppState {
            gate,
            dispatcher: Dispatcher::new(routes.clone()),
            connections: ConnectionTracker::new(config.listener.max_connections),
        };

        Self {
            routes,
            config,
            state,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(&self) -> Router {
        Router::new()
            .route("/", any(upgrade_handler))
            .route("/{*path}", any(upgrade_handler))
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
    }

    /// Serve on `listener` until `shutdown` resolves.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.routes.len(),
            handshake_gate = self.state.gate.is_some(),
            max_connections = self.config.listener.max_connections,
            "WebSocket server starting"
        );

        let app = self
            .build_router()
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("WebSocket server stopped");
        Ok(())
    }

    /// Bind the configured address and serve in a background task.
    pub async fn start(self) -> Result<ServerHandle, std::io::Error> {
        let listener = TcpListener::bind(&self.config.listener.bind_address).await?;
        let local_addr = listener.local_addr()?;

        let shutdown = Shutdown::new();
        let connections = self.state.connections.clone();
        let task = tokio::spawn(self.run(listener, shutdown.signalled()));

        Ok(ServerHandle {
            local_addr,
            shutdown,
            connections,
            task,
        })
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

impl RouteTable {
    /// Serve this route table with `config`.
    pub async fn serve(&self, config: ServerConfig) -> Result<ServerHandle, std::io::Error> {
        WsServer::new(self.clone(), config).start().await
    }
}

/// A running server.
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: Shutdown,
    connections: ConnectionTracker,
    task: JoinHandle<Result<(), std::io::Error>>,
}

impl ServerHandle {
    /// The address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Base URL for clients, e.g. `ws://127.0.0.1:8765`.
    pub fn url(&self) -> String {
        format!("ws://{}", self.local_addr)
    }

    /// Connection slots in use: in-flight handshakes plus upgraded sockets.
    pub fn active_connections(&self) -> usize {
        self.connections.active_count()
    }

    /// A trigger that stops this server when fired.
    pub fn shutdown_trigger(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Wait for the server to stop.
    pub async fn wait(self) -> Result<(), std::io::Error> {
        self.task.await.map_err(std::io::Error::other)?
    }

    /// Stop accepting connections and wait for the server to finish.
    pub async fn shutdown(self) -> Result<(), std::io::Error> {
        self.shutdown.trigger();
        self.wait().await
    }
}

/// The request-target as received. Origin-form targets print as path and
/// query; absolute-form targets keep their scheme and authority.
fn request_target(uri: &Uri) -> String {
    uri.to_string()
}

/// Entry point for every request.
/// Gates the handshake, then upgrades and dispatches.
async fn upgrade_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    uri: Uri,
    headers: HeaderMap,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let raw_path = request_target(&uri);

    let Some(guard) = state.connections.try_track() else {
        tracing::warn!(
            peer = %peer,
            path = %raw_path,
            max_connections = state.connections.max_connections(),
            "Connection limit reached"
        );
        metrics::record_handshake("overloaded");
        return (StatusCode::SERVICE_UNAVAILABLE, "too many connections\n").into_response();
    };

    let target = match &state.gate {
        Some(gate) => match gate.check(&raw_path, &headers).await {
            Ok(Handshake::Proceed(path)) => Target::Resolved(path),
            Ok(Handshake::Reject(response)) => {
                tracing::info!(
                    peer = %peer,
                    path = %raw_path,
                    status = %response.status(),
                    "Handshake rejected"
                );
                return response;
            }
            Err(e) => {
                tracing::error!(peer = %peer, path = %raw_path, error = %e, "Handshake gate failed");
                metrics::record_handshake("error");
                return (StatusCode::INTERNAL_SERVER_ERROR, "internal server error\n")
                    .into_response();
            }
        },
        None => {
            metrics::record_handshake("accepted");
            Target::Raw(raw_path.clone())
        }
    };

    let upgrade = match upgrade {
        Ok(upgrade) => upgrade,
        Err(rejection) => {
            tracing::debug!(peer = %peer, path = %raw_path, "Not a WebSocket upgrade request");
            return rejection.into_response();
        }
    };

    let span = tracing::info_span!(
        "ws_connection",
        connection_id = %guard.id(),
        peer = %peer,
        path = %raw_path,
    );
    let dispatcher = state.dispatcher.clone();

    upgrade
        .on_failed_upgrade(|e| tracing::warn!(error = %e, "WebSocket upgrade failed"))
        .on_upgrade(move |socket| {
            async move {
                let _guard = guard;
                if let Err(e) = dispatcher.dispatch(socket, target).await {
                    tracing::error!(error = %e, "Connection handler failed");
                }
            }
            .instrument(span)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_target_origin_form() {
        let uri: Uri = "/test/7?x=1".parse().unwrap();
        assert_eq!(request_target(&uri), "/test/7?x=1");

        let uri: Uri = "/".parse().unwrap();
        assert_eq!(request_target(&uri), "/");
    }

    #[test]
    fn test_request_target_absolute_form_is_unmodified() {
        let uri: Uri = "http://example.com:8765/test/7?x=1".parse().unwrap();
        assert_eq!(request_target(&uri), "http://example.com:8765/test/7?x=1");
    }
}
