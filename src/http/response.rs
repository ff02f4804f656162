//! Transport-neutral response carrier.
//!
//! # Responsibilities
//! - `ResponseParts`: status and headers that filters set while a request
//!   is in flight
//! - `Response`: the finished status, headers and body handed back to the
//!   transport
//!
//! # Design Decisions
//! - Filters never write the body directly; it comes out of the output
//!   chain as an entity and is attached once at the end

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};

/// Status and headers under construction.
#[derive(Debug, Clone)]
pub struct ResponseParts {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

impl Default for ResponseParts {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
        }
    }
}

/// A finished response.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    pub fn new(parts: ResponseParts, body: impl Into<Bytes>) -> Self {
        Self {
            status: parts.status,
            headers: parts.headers,
            body: body.into(),
        }
    }

    /// Plain-text response, used for faults that carry no entity.
    pub fn text(status: StatusCode, text: impl Into<String>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        Self {
            status,
            headers,
            body: Bytes::from(text.into()),
        }
    }

    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

impl axum::response::IntoResponse for Response {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.headers, self.body).into_response()
    }
}
