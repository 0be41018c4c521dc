//! `ws-routes` demo server.
//!
//! Serves two routes:
//! - `/echo` echoes every text and binary message back
//! - `/hello/{name}` greets `name`, then echoes; the handshake is refused
//!   with 403 when `name` is `nobody`

use std::path::PathBuf;

use axum::extract::ws::{Message, WebSocket};
use axum::BoxError;
use clap::Parser;

use ws_routes::config::{load_config, ServerConfig};
use ws_routes::lifecycle::signals;
use ws_routes::observability::{logging, metrics};
use ws_routes::{Endpoint, Rejection, RoutedPath, Router, WsServer};

#[derive(Parser)]
#[command(name = "ws-routes")]
#[command(about = "WebSocket server with path routing", long_about = None)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address.
    #[arg(short, long)]
    bind: Option<String>,

    /// Upgrade every path and resolve routes after the upgrade.
    #[arg(long)]
    no_gate: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    if cli.no_gate {
        config.routing.handshake_gate = false;
    }

    logging::init(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "ws-routes starting");

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let router = Router::from_config(&config.routing);
    router
        .route_named("/echo", "echo", Endpoint::new(echo))?
        .route_named(
            "/hello/{name}",
            "hello",
            Endpoint::new(hello).process_request(|path, _headers| async move {
                if path.param("name") == Some("nobody") {
                    return Ok(Some(Rejection::new(403u16, "nobody may connect\n")));
                }
                Ok(None)
            }),
        )?;

    let server = WsServer::new(router, config).start().await?;
    tracing::info!(url = %server.url(), "Ready");

    signals::trigger_on_signal(server.shutdown_trigger());
    server.wait().await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn echo(mut ws: WebSocket, _path: RoutedPath) -> Result<(), BoxError> {
    while let Some(message) = ws.recv().await {
        match message? {
            msg @ (Message::Text(_) | Message::Binary(_)) => ws.send(msg).await?,
            Message::Close(_) => break,
            _ => {}
        }
    }
    Ok(())
}

async fn hello(mut ws: WebSocket, path: RoutedPath) -> Result<(), BoxError> {
    let name = path.param("name").unwrap_or("stranger");
    ws.send(Message::Text(format!("hello, {name}").into())).await?;
    echo(ws, path).await
}
