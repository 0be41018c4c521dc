//! The resolved path handed from the handshake to the handler.
//!
//! A `RoutedPath` is created once per connection attempt. Clones share the
//! same allocation, so context written by a pre-upgrade hook is visible to
//! the handler that later receives the same path.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use axum::http::Extensions;

use crate::routing::matcher::path_part;
use crate::routing::route::RouteBinding;

/// Named parameters extracted from a matched template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    inner: HashMap<String, String>,
}

impl Params {
    pub(crate) fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.insert(key.into(), value.into());
    }

    /// Value of the parameter `key`, if the template declared it.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Raw request path plus the outcome of matching it.
#[derive(Clone)]
pub struct RoutedPath {
    inner: Arc<Inner>,
}

struct Inner {
    raw: String,
    route: Option<Arc<RouteBinding>>,
    params: Params,
    context: Mutex<Extensions>,
}

impl RoutedPath {
    pub(crate) fn new(raw: impl Into<String>, route: Option<Arc<RouteBinding>>, params: Params) -> Self {
        Self {
            inner: Arc::new(Inner {
                raw: raw.into(),
                route,
                params,
                context: Mutex::new(Extensions::new()),
            }),
        }
    }

    /// A path that matched nothing.
    pub(crate) fn unmatched(raw: impl Into<String>) -> Self {
        Self::new(raw, None, Params::default())
    }

    /// The request-target exactly as received, query included.
    pub fn as_str(&self) -> &str {
        &self.inner.raw
    }

    /// The path of the request-target: no scheme, authority, query or fragment.
    pub fn path(&self) -> &str {
        path_part(&self.inner.raw)
    }

    /// The query string, without the leading `?`.
    pub fn query(&self) -> Option<&str> {
        let raw = self.inner.raw.as_str();
        let start = raw.find('?')? + 1;
        let end = raw[start..].find('#').map_or(raw.len(), |i| start + i);
        Some(&raw[start..end])
    }

    /// The matched route, or `None` if nothing matched.
    pub fn route(&self) -> Option<&Arc<RouteBinding>> {
        self.inner.route.as_ref()
    }

    pub fn is_match(&self) -> bool {
        self.inner.route.is_some()
    }

    pub fn params(&self) -> &Params {
        &self.inner.params
    }

    /// Shorthand for `params().get(key)`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.inner.params.get(key)
    }

    /// Store a value in the connection context, replacing any value of the same type.
    pub fn insert_context<T>(&self, value: T) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.with_context(|ctx| ctx.insert(value))
    }

    /// Clone a value out of the connection context.
    pub fn context<T>(&self) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.with_context(|ctx| ctx.get::<T>().cloned())
    }

    pub fn remove_context<T>(&self) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.with_context(|ctx| ctx.remove::<T>())
    }

    /// Run `f` with exclusive access to the connection context.
    ///
    /// The lock is held for the duration of `f`; do not await inside it.
    pub fn with_context<R>(&self, f: impl FnOnce(&mut Extensions) -> R) -> R {
        let mut ctx = self
            .inner
            .context
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut ctx)
    }

    /// Returns true if both values are the same connection's path.
    pub fn ptr_eq(&self, other: &RoutedPath) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for RoutedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutedPath")
            .field("raw", &self.inner.raw)
            .field("route", &self.inner.route.as_ref().map(|r| r.template()))
            .field("params", &self.inner.params)
            .finish()
    }
}

impl fmt::Display for RoutedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.raw)
    }
}

impl AsRef<str> for RoutedPath {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
