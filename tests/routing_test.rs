//! End-to-end routing tests over real sockets.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message as WsMessage, Utf8Bytes, WebSocket};
use axum::BoxError;
use futures_util::SinkExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Notify;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;
use ws_routes::{Endpoint, Rejection, RoutedPath, Router, CLOSE_NO_ROUTE};

use common::{connect, recv, recv_text, rejected_status, start_server, test_config};

async fn echo(mut ws: WebSocket, _path: RoutedPath) -> Result<(), BoxError> {
    while let Some(message) = ws.recv().await {
        match message? {
            msg @ (WsMessage::Text(_) | WsMessage::Binary(_)) => ws.send(msg).await?,
            WsMessage::Close(_) => break,
            _ => {}
        }
    }
    Ok(())
}

fn say(text: &'static str) -> Endpoint {
    Endpoint::new(move |mut ws: WebSocket, _path| async move {
        ws.send(WsMessage::Text(Utf8Bytes::from_static(text))).await?;
        Ok::<_, BoxError>(())
    })
}

#[derive(Debug, Clone)]
struct User(String);

fn test_router() -> Router {
    let router = Router::new();
    router
        .route("/a", say("a"))
        .unwrap()
        .route("/b", say("b"))
        .unwrap()
        .route("/echo", Endpoint::new(echo))
        .unwrap()
        .route(
            "/test/{id}",
            Endpoint::new(|mut ws: WebSocket, path: RoutedPath| async move {
                let id = path.param("id").unwrap_or_default().to_string();
                ws.send(WsMessage::Text(id.into())).await?;
                Ok::<_, BoxError>(())
            })
            .process_request(|path, _headers| async move {
                if path.param("id") == Some("error-out") {
                    return Ok(Some(Rejection::new(406u16, "rejected by view\n")));
                }
                Ok(None)
            }),
        )
        .unwrap()
        .route(
            "/whoami",
            Endpoint::new(|mut ws: WebSocket, path: RoutedPath| async move {
                let user = path.context::<User>().map_or("anonymous".to_string(), |u| u.0);
                ws.send(WsMessage::Text(user.into())).await?;
                Ok::<_, BoxError>(())
            })
            .process_request(|path, headers| async move {
                if let Some(user) = headers.get("x-user").and_then(|v| v.to_str().ok()) {
                    path.insert_context(User(user.to_string()));
                }
                Ok(None)
            }),
        )
        .unwrap()
        .route(
            "/broken",
            say("unreachable").process_request(|_path, _headers| async {
                Err("hook backend down".into())
            }),
        )
        .unwrap()
        .route(
            "/bad-status",
            say("unreachable").process_request(|_path, _headers| async {
                Ok(Some(Rejection::new(1000u16, "")))
            }),
        )
        .unwrap()
        .route(
            "/fail",
            Endpoint::new(|_ws, _path| async { Err::<(), BoxError>("handler exploded".into()) }),
        )
        .unwrap();
    router
}

#[tokio::test]
async fn test_routes_dispatch_to_their_handlers() {
    let server = start_server(&test_router(), test_config()).await;

    let mut a = connect(&server, "/a").await.unwrap();
    assert_eq!(recv_text(&mut a).await, "a");

    let mut b = connect(&server, "/b").await.unwrap();
    assert_eq!(recv_text(&mut b).await, "b");

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_echo() {
    let server = start_server(&test_router(), test_config()).await;

    let mut ws = connect(&server, "/echo").await.unwrap();
    ws.send(Message::text("hello")).await.unwrap();
    assert_eq!(recv_text(&mut ws).await, "hello");
    ws.send(Message::binary(vec![1u8, 2, 3])).await.unwrap();
    assert_eq!(recv(&mut ws).await, Message::binary(vec![1u8, 2, 3]));
    ws.close(None).await.unwrap();

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_path_parameter_reaches_handler() {
    let server = start_server(&test_router(), test_config()).await;

    let mut ws = connect(&server, "/test/this-works").await.unwrap();
    assert_eq!(recv_text(&mut ws).await, "this-works");

    let mut ws = connect(&server, "/test/with%20space?x=1").await.unwrap();
    assert_eq!(recv_text(&mut ws).await, "with space");

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_hook_rejection_fails_handshake() {
    let server = start_server(&test_router(), test_config()).await;

    assert_eq!(rejected_status(connect(&server, "/test/error-out").await), 406);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_gate_error_is_500() {
    let server = start_server(&test_router(), test_config()).await;

    assert_eq!(rejected_status(connect(&server, "/broken").await), 500);
    assert_eq!(rejected_status(connect(&server, "/bad-status").await), 500);
    assert_eq!(server.active_connections(), 0);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unmatched_path_is_404() {
    let server = start_server(&test_router(), test_config()).await;

    assert_eq!(rejected_status(connect(&server, "/nowhere").await), 404);
    assert_eq!(rejected_status(connect(&server, "/").await), 404);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_without_gate_unmatched_path_closes_with_4040() {
    let mut config = test_config();
    config.routing.handshake_gate = false;
    let server = start_server(&test_router(), config).await;

    let mut ws = connect(&server, "/nowhere").await.unwrap();
    match recv(&mut ws).await {
        Message::Close(Some(frame)) => assert_eq!(u16::from(frame.code), CLOSE_NO_ROUTE),
        other => panic!("expected a close frame, got {other:?}"),
    }

    let mut ws = connect(&server, "/a").await.unwrap();
    assert_eq!(recv_text(&mut ws).await, "a");

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_hook_context_reaches_handler() {
    let server = start_server(&test_router(), test_config()).await;

    let mut request = format!("{}/whoami", server.url()).into_client_request().unwrap();
    request.headers_mut().insert("x-user", "alice".parse().unwrap());
    let (mut ws, _) = connect_async(request).await.unwrap();
    assert_eq!(recv_text(&mut ws).await, "alice");

    let mut ws = connect(&server, "/whoami").await.unwrap();
    assert_eq!(recv_text(&mut ws).await, "anonymous");

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_handler_failure_does_not_stop_server() {
    let server = start_server(&test_router(), test_config()).await;

    let failed = connect(&server, "/fail").await.unwrap();
    drop(failed);

    let mut ws = connect(&server, "/a").await.unwrap();
    assert_eq!(recv_text(&mut ws).await, "a");

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_connection_limit_returns_503() {
    let mut config = test_config();
    config.listener.max_connections = 1;
    let server = start_server(&test_router(), config).await;

    let mut held = connect(&server, "/echo").await.unwrap();
    held.send(Message::text("ping")).await.unwrap();
    assert_eq!(recv_text(&mut held).await, "ping");
    assert_eq!(server.active_connections(), 1);

    assert_eq!(rejected_status(connect(&server, "/echo").await), 503);

    drop(held);

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_pending_handshake_holds_a_slot() {
    let mut config = test_config();
    config.listener.max_connections = 1;

    let release = Arc::new(Notify::new());
    let router = Router::new();
    let hook_release = release.clone();
    router
        .route(
            "/slow",
            say("through").process_request(move |_path, _headers| {
                let hook_release = hook_release.clone();
                async move {
                    hook_release.notified().await;
                    Ok(None)
                }
            }),
        )
        .unwrap();
    let server = start_server(&router, config).await;

    let url = format!("{}/slow", server.url());
    let pending = tokio::spawn(async move { connect_async(url).await });
    tokio::time::timeout(Duration::from_secs(5), async {
        while server.active_connections() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("handshake never reached the hook");

    assert_eq!(rejected_status(connect(&server, "/slow").await), 503);

    release.notify_one();
    let (mut ws, _) = pending.await.unwrap().unwrap();
    assert_eq!(recv_text(&mut ws).await, "through");

    drop(ws);
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_plain_http_request_releases_its_slot() {
    let mut config = test_config();
    config.listener.max_connections = 1;
    let server = start_server(&test_router(), config).await;

    let mut stream = TcpStream::connect(server.local_addr()).await.unwrap();
    stream
        .write_all(b"GET /a HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    let response = String::from_utf8_lossy(&response);
    assert!(response.starts_with("HTTP/1.1 4"), "unexpected response: {response}");

    assert_eq!(server.active_connections(), 0);
    let mut ws = connect(&server, "/a").await.unwrap();
    assert_eq!(recv_text(&mut ws).await, "a");

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_route_registered_after_start_is_served() {
    let router = test_router();
    let server = start_server(&router, test_config()).await;

    assert_eq!(rejected_status(connect(&server, "/late").await), 404);

    router.route("/late", say("late")).unwrap();
    let mut ws = connect(&server, "/late").await.unwrap();
    assert_eq!(recv_text(&mut ws).await, "late");

    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_stops_accepting() {
    let server = start_server(&test_router(), test_config()).await;
    let url = format!("{}/a", server.url());

    server.shutdown().await.unwrap();

    assert!(connect_async(url).await.is_err());
}
