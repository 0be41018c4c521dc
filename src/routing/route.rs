//! Route bindings: what a template resolves to.
//!
//! # Responsibilities
//! - Define the handler capability (owns the socket after upgrade)
//! - Define the optional pre-upgrade hook capability
//! - Turn closures and view types into one `Endpoint` shape
//!
//! # Design Decisions
//! - The gate and dispatcher only see `RouteBinding`; they never care
//!   whether it came from a closure or a view type
//! - A binding is immutable once registered
//! - Routing metadata (template, name) lives on the binding, never in `Params`

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::WebSocket;
use axum::http::HeaderMap;
use axum::BoxError;

use crate::http::response::Rejection;
use crate::routing::path::RoutedPath;

/// Owns an upgraded socket for the lifetime of the connection.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn handle(&self, socket: WebSocket, path: RoutedPath) -> Result<(), BoxError>;
}

/// Inspects a handshake before the upgrade.
///
/// Returning `Ok(None)` lets the upgrade proceed. `Ok(Some(_))` refuses the
/// connection with the given response. Values stored in the path's context
/// are seen by the handler.
#[async_trait]
pub trait ProcessRequest: Send + Sync + 'static {
    async fn process_request(
        &self,
        path: &RoutedPath,
        headers: &HeaderMap,
    ) -> Result<Option<Rejection>, BoxError>;
}

struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(WebSocket, RoutedPath) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    async fn handle(&self, socket: WebSocket, path: RoutedPath) -> Result<(), BoxError> {
        (self.0)(socket, path).await
    }
}

struct FnProcessRequest<F>(F);

#[async_trait]
impl<F, Fut> ProcessRequest for FnProcessRequest<F>
where
    F: Fn(RoutedPath, HeaderMap) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<Rejection>, BoxError>> + Send + 'static,
{
    async fn process_request(
        &self,
        path: &RoutedPath,
        headers: &HeaderMap,
    ) -> Result<Option<Rejection>, BoxError> {
        (self.0)(path.clone(), headers.clone()).await
    }
}

/// A handler and its optional pre-upgrade hook, ready to be registered.
#[derive(Clone)]
pub struct Endpoint {
    handler: Arc<dyn Handler>,
    hook: Option<Arc<dyn ProcessRequest>>,
}

impl Endpoint {
    /// Endpoint from a bare async closure.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(WebSocket, RoutedPath) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        Self::from_handler(FnHandler(f))
    }

    /// Endpoint from a handler type with no hook.
    pub fn from_handler<H: Handler>(handler: H) -> Self {
        Self {
            handler: Arc::new(handler),
            hook: None,
        }
    }

    /// Endpoint from a type that is both handler and hook.
    pub fn view<V>(view: V) -> Self
    where
        V: Handler + ProcessRequest,
    {
        let view = Arc::new(view);
        Self {
            handler: view.clone(),
            hook: Some(view),
        }
    }

    /// Attach a closure as the pre-upgrade hook, replacing any existing hook.
    pub fn process_request<F, Fut>(self, f: F) -> Self
    where
        F: Fn(RoutedPath, HeaderMap) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<Rejection>, BoxError>> + Send + 'static,
    {
        self.with_hook(FnProcessRequest(f))
    }

    /// Attach a hook type, replacing any existing hook.
    pub fn with_hook<P: ProcessRequest>(mut self, hook: P) -> Self {
        self.hook = Some(Arc::new(hook));
        self
    }
}

/// A registered endpoint: template, optional name, handler and hook.
pub struct RouteBinding {
    template: String,
    name: Option<String>,
    endpoint: Endpoint,
}

impl RouteBinding {
    pub(crate) fn new(template: &str, name: Option<&str>, endpoint: Endpoint) -> Self {
        Self {
            template: template.to_string(),
            name: name.map(str::to_string),
            endpoint,
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.endpoint.handler
    }

    /// The pre-upgrade hook, if the endpoint has one.
    pub fn hook(&self) -> Option<&Arc<dyn ProcessRequest>> {
        self.endpoint.hook.as_ref()
    }

    /// Label used in logs and metrics.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.template)
    }
}

impl fmt::Debug for RouteBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteBinding")
            .field("template", &self.template)
            .field("name", &self.name)
            .field("has_hook", &self.endpoint.hook.is_some())
            .finish()
    }
}
