//! Entity bodies: wire formats, charsets, hints and shape conversion.
//!
//! # Data Flow
//! ```text
//! Input:
//!     body bytes + Content-Type
//!     → charset.rs (bytes → text)
//!     → codec/ (text → Value, hints resolve XML ambiguity)
//!     → transform.rs (external → internal, typed by context)
//!
//! Output:
//!     internal Value
//!     → transform.rs (internal → external)
//!     → codec/ (Value → text in the negotiated format)
//!     → charset.rs (text → bytes in the negotiated charset)
//! ```
//!
//! # Design Decisions
//! - Codecs are stateless; per-request data arrives in `CodecContext`
//! - Type resolution uses the registry's precomputed indexes, so a
//!   transform never mutates shared state

pub mod charset;
pub mod codec;
pub mod hints;
pub mod transform;

pub use codec::{Codec, CodecContext, CodecRegistry};
pub use hints::{Hint, Hints};
pub use transform::Transformer;
