//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (setup time):
//!     (template, name?, Endpoint)
//!     → router.rs (registry, name policy)
//!     → matcher.rs (compile template into the radix tree)
//!     → RouteBinding frozen behind Arc
//!
//! Lookup (per connection):
//!     raw request-target
//!     → matcher.rs (strip query, match, decode params)
//!     → path.rs (RoutedPath: raw path, binding, params, context)
//! ```
//!
//! # Design Decisions
//! - Templates validated at registration, never at match time
//! - Deterministic: same table and path always yield the same binding
//! - No match is a value, not an error

pub mod error;
pub mod matcher;
pub mod path;
pub mod route;
pub mod router;

pub use error::RouteError;
pub use path::{Params, RoutedPath};
pub use route::{Endpoint, Handler, ProcessRequest, RouteBinding};
pub use router::{NamePolicy, Router};
