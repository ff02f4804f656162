//! Request pipeline: filters, exception handlers and the action call.
//!
//! # Data Flow
//! ```text
//! Request
//!     → Mapper (collection, action, path vars) or 404
//!     → input filters, ascending (priority, serial)
//!         parse body (codec) → transform (rules)
//!     → Collection::call(action, args + input)
//!         Err → exception handlers → handled (empty body) or fault response
//!     → output filters, ascending (priority, serial)
//!         status/headers → reverse transform → format (negotiated codec)
//!     → Response
//! ```
//!
//! # Design Decisions
//! - A filter short-circuits by returning `Err(Fault)`; the fault's status
//!   is the response status
//! - Filter chains are resolved per request from a registry that is
//!   read-only after startup
//! - Standard CRUD behaviour is ordinary filters, installed by default and
//!   replaceable

pub mod application;
pub mod context;
pub mod filter;
pub mod registry;
pub mod standard;

pub use application::{Application, ApplicationBuilder, BuildError};
pub use context::{Phase, Representation, RequestContext};
pub use filter::{priority, ExceptionHandler, InputFilter, OutputFilter};
pub use registry::{FilterRegistry, Scope};
