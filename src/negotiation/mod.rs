//! HTTP content negotiation.
//!
//! # Data Flow
//! ```text
//! Accept / Accept-Charset / Content-Type header text
//!     → header.rs (list header grammar, media types)
//!     → select.rs (q-factors, specificity, tie-breaks)
//!     → chosen candidate, or None (406 Not Acceptable)
//! ```
//!
//! # Design Decisions
//! - Pure functions: no request state, safe to call from any thread
//! - Malformed header text is a `SyntaxError`, never silently ignored
//! - Quality factors are compared as integers (thousandths)

pub mod header;
pub mod select;

pub use header::{parse_content_type, parse_list_header, HeaderItem, MediaType};
pub use select::{select_charset, select_content_type, Quality};
