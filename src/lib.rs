//! WebSocket routing layer.
//!
//! Maps a connection's request path to a registered handler, refuses
//! unmatched or hook-rejected connections during the HTTP handshake, and
//! hands upgraded sockets to their handler with the parsed path parameters
//! and a per-connection context.
//!
//! ```no_run
//! use axum::extract::ws::Message;
//! use ws_routes::{Endpoint, Rejection, Router, ServerConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let router = Router::new();
//! router.route(
//!     "/test/{id}",
//!     Endpoint::new(|mut ws, path| async move {
//!         let id = path.param("id").unwrap_or_default().to_string();
//!         ws.send(Message::Text(id.into())).await?;
//!         Ok::<_, axum::BoxError>(())
//!     })
//!     .process_request(|path, _headers| async move {
//!         if path.param("id") == Some("error-out") {
//!             return Ok(Some(Rejection::new(406u16, "rejected by view\n")));
//!         }
//!         Ok(None)
//!     }),
//! )?;
//!
//! let server = router.serve(ServerConfig::default()).await?;
//! println!("listening on {}", server.url());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;

pub use config::ServerConfig;
pub use http::{Rejection, ServerHandle, WsServer, CLOSE_NO_ROUTE};
pub use lifecycle::Shutdown;
pub use routing::{Endpoint, Handler, Params, ProcessRequest, RouteError, RoutedPath, Router};
