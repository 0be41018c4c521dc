//! Route registry.
//!
//! # Responsibilities
//! - Register templates with their endpoints (setup time)
//! - Resolve raw request paths into `RoutedPath` values
//! - Reverse-route named templates into URLs
//!
//! # Design Decisions
//! - Copy-on-write table behind `ArcSwap`: lookups are lock-free reads of an
//!   immutable snapshot, registration builds a new snapshot and swaps it in
//! - Writers are serialized; a registration is visible to every lookup that
//!   starts after it returns
//! - A failed registration leaves the table untouched
//! - Lookup never fails; no match is a `RoutedPath` without a route

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;

use crate::config::RoutingConfig;
use crate::routing::error::RouteError;
use crate::routing::matcher::PathMatcher;
use crate::routing::path::RoutedPath;
use crate::routing::route::{Endpoint, RouteBinding};

/// How the registry treats two routes registered under the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamePolicy {
    /// The last registration owns the name for `url_for`.
    #[default]
    Permissive,
    /// A second registration under a taken name fails.
    Unique,
}

#[derive(Clone, Default)]
struct RouteTable {
    matcher: PathMatcher<Arc<RouteBinding>>,
    routes: Vec<Arc<RouteBinding>>,
    names: HashMap<String, Arc<RouteBinding>>,
}

struct Registry {
    table: ArcSwap<RouteTable>,
    write_lock: Mutex<()>,
    policy: NamePolicy,
}

/// The route table shared by the handshake gate and the dispatcher.
///
/// Cloning is cheap; clones share the same table.
#[derive(Clone)]
pub struct Router {
    inner: Arc<Registry>,
}

impl Router {
    /// Create an empty router with permissive naming.
    pub fn new() -> Self {
        Self::with_policy(NamePolicy::default())
    }

    pub fn with_policy(policy: NamePolicy) -> Self {
        Self {
            inner: Arc::new(Registry {
                table: ArcSwap::from_pointee(RouteTable::default()),
                write_lock: Mutex::new(()),
                policy,
            }),
        }
    }

    /// Create an empty router with the naming policy from config.
    pub fn from_config(config: &RoutingConfig) -> Self {
        if config.unique_names {
            Self::with_policy(NamePolicy::Unique)
        } else {
            Self::with_policy(NamePolicy::Permissive)
        }
    }

    /// Register an unnamed route.
    pub fn route(&self, template: &str, endpoint: Endpoint) -> Result<&Self, RouteError> {
        self.register(template, None, endpoint)
    }

    /// Register a named route.
    pub fn route_named(
        &self,
        template: &str,
        name: &str,
        endpoint: Endpoint,
    ) -> Result<&Self, RouteError> {
        self.register(template, Some(name), endpoint)
    }

    /// Add a template and its endpoint to the table.
    ///
    /// Malformed or ambiguous templates fail with `Pattern` / `TemplateConflict`.
    /// A taken name fails with `NameConflict` under `NamePolicy::Unique`.
    pub fn register(
        &self,
        template: &str,
        name: Option<&str>,
        endpoint: Endpoint,
    ) -> Result<&Self, RouteError> {
        let _guard = self
            .inner
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let current = self.inner.table.load_full();
        if let Some(name) = name {
            if self.inner.policy == NamePolicy::Unique && current.names.contains_key(name) {
                return Err(RouteError::NameConflict(name.to_string()));
            }
        }

        let binding = Arc::new(RouteBinding::new(template, name, endpoint));
        let mut next = RouteTable::clone(&current);
        next.matcher.insert(template, binding.clone())?;
        if let Some(name) = name {
            if let Some(previous) = next.names.insert(name.to_string(), binding.clone()) {
                tracing::warn!(
                    name = %name,
                    previous = %previous.template(),
                    template = %template,
                    "Route name reassigned"
                );
            }
        }
        next.routes.push(binding);
        self.inner.table.store(Arc::new(next));

        tracing::debug!(template = %template, name = ?name, "Route registered");
        Ok(self)
    }

    /// Resolve a raw request path.
    pub fn lookup(&self, raw_path: &str) -> RoutedPath {
        let table = self.inner.table.load();
        match table.matcher.find(raw_path) {
            Some((binding, params)) => RoutedPath::new(raw_path, Some(binding.clone()), params),
            None => RoutedPath::unmatched(raw_path),
        }
    }

    /// Build the path for a named route.
    ///
    /// Parameter values are percent-encoded; a catch-all value keeps its `/`.
    pub fn url_for(&self, name: &str, params: &[(&str, &str)]) -> Result<String, RouteError> {
        let table = self.inner.table.load();
        let binding = table
            .names
            .get(name)
            .ok_or_else(|| RouteError::UnknownName(name.to_string()))?;
        expand(binding.template(), name, params)
    }

    /// All routes, in registration order.
    pub fn routes(&self) -> Vec<Arc<RouteBinding>> {
        self.inner.table.load().routes.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.table.load().routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn policy(&self) -> NamePolicy {
        self.inner.policy
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let table = self.inner.table.load();
        f.debug_struct("Router")
            .field("routes", &table.routes)
            .field("policy", &self.inner.policy)
            .finish()
    }
}

fn expand(template: &str, name: &str, params: &[(&str, &str)]) -> Result<String, RouteError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open].replace("}}", "}"));
        let after = &rest[open + 1..];

        // `{{` is a literal brace
        if let Some(tail) = after.strip_prefix('{') {
            out.push('{');
            rest = tail;
            continue;
        }

        let close = after
            .find('}')
            .ok_or_else(|| RouteError::pattern(template, "unclosed parameter"))?;
        let key = &after[..close];
        let (key, catch_all) = match key.strip_prefix('*') {
            Some(key) => (key, true),
            None => (key, false),
        };

        let value = params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
            .ok_or_else(|| RouteError::MissingParam {
                name: name.to_string(),
                param: key.to_string(),
            })?;

        if catch_all {
            let segments: Vec<_> = value.split('/').map(urlencoding::encode).collect();
            out.push_str(&segments.join("/"));
        } else {
            out.push_str(&urlencoding::encode(value));
        }
        rest = &after[close + 1..];
    }

    out.push_str(&rest.replace("}}", "}"));
    Ok(out)
}
