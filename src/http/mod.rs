//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, timeout, body buffering)
//!     → request.rs (transport-neutral Request)
//!     → pipeline::Application::handle
//!     → response.rs (Response → axum response)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{Request, X_REQUEST_ID};
pub use response::{Response, ResponseParts};
pub use server::{HttpServer, SERVER_NAME};
