//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (method, path)
//!     → router.rs (Mapper: ordered route table)
//!     → matcher.rs (segment-wise pattern match)
//!     → RouteMatch { collection, action, path_vars } or NoMatch (404)
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in the hot path
//! - First match wins; method-less routes act as catch-alls
//! - A route only matches if it yields both a collection and an action

pub mod matcher;
pub mod router;

pub use matcher::{PathPattern, PatternError};
pub use router::{install_default_routes, Mapper, Route, RouteMatch};
