//! Route table errors.
//!
//! All of these are setup-time failures. A path that matches nothing is not
//! an error; it is a `RoutedPath` without a route.

use thiserror::Error;

/// Errors raised while building the route table or generating URLs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    /// The template is not a valid path pattern.
    #[error("invalid route template '{template}': {reason}")]
    Pattern { template: String, reason: String },

    /// The template overlaps an already registered template with the same specificity.
    #[error("route template '{template}' conflicts with existing route '{existing}'")]
    TemplateConflict { template: String, existing: String },

    /// The route name is taken and the registry enforces unique names.
    #[error("route name '{0}' is already registered")]
    NameConflict(String),

    /// No route is registered under this name.
    #[error("no route named '{0}'")]
    UnknownName(String),

    /// A template parameter was not supplied for URL generation.
    #[error("missing parameter '{param}' for route '{name}'")]
    MissingParam { name: String, param: String },
}

impl RouteError {
    pub(crate) fn pattern(template: &str, reason: impl Into<String>) -> Self {
        RouteError::Pattern {
            template: template.to_string(),
            reason: reason.into(),
        }
    }
}
