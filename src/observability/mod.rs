//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Pipeline and HTTP adapter produce:
//!     → logging.rs (structured log events, request_id on every line)
//!     → metrics.rs (request counter and latency histogram)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows through all subsystems
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;

pub use logging::{error_chain, init_logging};
pub use metrics::{init_metrics, record_request};
