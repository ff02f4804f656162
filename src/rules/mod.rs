//! Field-mapping rule language.
//!
//! # Data Flow
//! ```text
//! entity_transform text
//!     → lexer.rs (tokens with line/column)
//!     → parser.rs (Rule: fieldspec direction fieldspec mandatory?)
//!     → ruleset.rs (ordered Rules, forward / reverse application)
//! ```
//!
//! # Design Decisions
//! - Hand-written recursive descent; the grammar is nearly regular
//! - Transform functions are a closed enum resolved at parse time, so an
//!   unknown name fails at startup instead of on the first request
//! - `!type` is an ordinary field name in rules; it maps to the resource
//!   type rather than a field

pub mod functions;
pub mod lexer;
pub mod parser;
pub mod ruleset;

pub use functions::TransformFn;
pub use parser::{Direction, FieldSpec, Rule};
pub use ruleset::{ProcessOptions, Ruleset};
