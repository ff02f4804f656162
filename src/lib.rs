//! REST pipeline library.
//!
//! Serves collections of typed resources over HTTP. Request bodies are
//! parsed by a negotiated codec (XML, YAML, JSON), renamed and converted by
//! per-collection rules, handed to business logic, and the results travel
//! back the same way.
//!
//! ```text
//!  HTTP ─▶ http::server ─▶ routing::Mapper ─▶ pipeline (input filters)
//!                                                 │  entity::codec
//!                                                 │  entity::transform ─ rules
//!                                                 ▼
//!                                          collection::Collection
//!                                                 │
//!  HTTP ◀─ http::response ◀─ pipeline (output filters, negotiation)
//! ```

pub mod collection;
pub mod config;
pub mod entity;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod negotiation;
pub mod observability;
pub mod pipeline;
pub mod resource;
pub mod routing;
pub mod rules;

pub use config::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use pipeline::{Application, ApplicationBuilder};
pub use resource::{Entity, Resource, Value};
