//! Shared utilities for integration tests.

use std::time::Duration;

use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use ws_routes::{Router, ServerConfig, ServerHandle};

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Config bound to a free local port.
pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config
}

/// Serve `router` on a free port.
pub async fn start_server(router: &Router, config: ServerConfig) -> ServerHandle {
    router.serve(config).await.unwrap()
}

/// Open a WebSocket to `path` on `server`.
pub async fn connect(server: &ServerHandle, path: &str) -> Result<Client, tungstenite::Error> {
    let (ws, _) = connect_async(format!("{}{}", server.url(), path)).await?;
    Ok(ws)
}

/// Receive the next message, failing the test after a timeout.
pub async fn recv(ws: &mut Client) -> Message {
    tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("timed out waiting for a message")
        .expect("stream ended")
        .expect("websocket error")
}

/// Receive the next text message.
#[allow(dead_code)]
pub async fn recv_text(ws: &mut Client) -> String {
    match recv(ws).await {
        Message::Text(text) => text.to_string(),
        other => panic!("expected text, got {other:?}"),
    }
}

/// HTTP status of a refused handshake.
#[allow(dead_code)]
pub fn rejected_status(result: Result<Client, tungstenite::Error>) -> u16 {
    match result {
        Err(tungstenite::Error::Http(response)) => response.status().as_u16(),
        Err(other) => panic!("expected an HTTP rejection, got {other}"),
        Ok(_) => panic!("expected the handshake to be refused"),
    }
}
