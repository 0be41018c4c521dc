//! Path template matching.
//!
//! # Responsibilities
//! - Compile path templates (`/test/{id}`, `/files/{*rest}`) into a radix tree
//! - Match a request-target against the tree, ignoring query and fragment;
//!   an absolute-form target (`http://host/path`) matches on its path
//! - Extract named parameters, percent-decoded
//!
//! # Design Decisions
//! - Matching is delegated to `matchit`; templates are validated on insert,
//!   never at match time
//! - Tie-break: static segments beat `{param}` and `{*catch_all}`
//!   segments; overlaps the tree cannot order are refused on insert, so a
//!   path always has at most one winner
//! - Case-sensitive, no trailing-slash normalization
//! - A parameter that does not percent-decode to UTF-8 is a no-match

use crate::routing::error::RouteError;
use crate::routing::path::Params;

/// A compiled set of path templates, each carrying a value.
#[derive(Clone)]
pub struct PathMatcher<T> {
    tree: matchit::Router<T>,
    len: usize,
}

impl<T: Clone> PathMatcher<T> {
    /// Create an empty matcher.
    pub fn new() -> Self {
        Self {
            tree: matchit::Router::new(),
            len: 0,
        }
    }

    /// Insert a template.
    ///
    /// Fails if the template is malformed or is ambiguous with an existing one.
    pub fn insert(&mut self, template: &str, value: T) -> Result<(), RouteError> {
        if !template.starts_with('/') {
            return Err(RouteError::pattern(template, "template must start with '/'"));
        }

        self.tree.insert(template, value).map_err(|e| match e {
            matchit::InsertError::Conflict { with } => RouteError::TemplateConflict {
                template: template.to_string(),
                existing: with,
            },
            other => RouteError::pattern(template, other.to_string()),
        })?;

        self.len += 1;
        Ok(())
    }

    /// Match a raw request-target.
    ///
    /// Scheme and authority are ignored, as is anything from the first `?`
    /// or `#` on.
    pub fn find(&self, raw_path: &str) -> Option<(&T, Params)> {
        let path = path_part(raw_path);
        let matched = self.tree.at(path).ok()?;

        let mut params = Params::default();
        for (key, value) in matched.params.iter() {
            let decoded = urlencoding::decode(value).ok()?;
            params.insert(key, decoded.into_owned());
        }

        Some((matched.value, params))
    }

    /// Number of templates in the matcher.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if no template has been inserted.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<T: Clone> Default for PathMatcher<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// The path part of a request-target.
pub(crate) fn path_part(raw_path: &str) -> &str {
    let origin = origin_form(raw_path);
    origin
        .find(['?', '#'])
        .map_or(origin, |end| &origin[..end])
}

/// Drop `scheme://authority` from an absolute-form target.
fn origin_form(raw_path: &str) -> &str {
    if raw_path.starts_with('/') {
        return raw_path;
    }
    let Some(scheme_end) = raw_path.find("://") else {
        return raw_path;
    };
    let rest = &raw_path[scheme_end + 3..];
    match rest.find(['/', '?', '#']) {
        Some(start) if rest[start..].starts_with('/') => &rest[start..],
        _ => "/",
    }
}
