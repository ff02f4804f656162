//! Transport-neutral request carrier.
//!
//! # Responsibilities
//! - Hold method, path, decoded query, headers and the buffered body
//! - Carry the request ID assigned by the server layer
//! - Build absolute URLs for `Location` headers
//!
//! # Design Decisions
//! - The body is buffered: codecs need all of it before parsing
//! - Header lookup is case-insensitive (`HeaderMap` semantics)
//! - Query parameters keep their order; later duplicates win when merged
//!   into action arguments

use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, Uri};

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub request_id: String,
}

impl Request {
    /// A request for `target` (path plus optional query string).
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (target, None),
        };
        Self {
            method,
            path: path.to_string(),
            query: query.map(parse_query).unwrap_or_default(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            request_id: String::new(),
        }
    }

    /// Build from the pieces an HTTP server hands over.
    pub fn from_parts(method: Method, uri: &Uri, headers: HeaderMap, body: Bytes) -> Self {
        let request_id = headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        Self {
            method,
            path: uri.path().to_string(),
            query: uri.query().map(parse_query).unwrap_or_default(),
            headers,
            body,
            request_id,
        }
    }

    /// Add a header. Values that are not valid header text are dropped.
    pub fn with_header<V>(mut self, name: HeaderName, value: V) -> Self
    where
        V: TryInto<HeaderValue>,
    {
        if let Ok(value) = value.try_into() {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = id.into();
        self
    }

    /// Header value as text; `None` when absent or not visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn query_params(&self) -> BTreeMap<String, String> {
        self.query.iter().cloned().collect()
    }

    /// Absolute form of `relative`. Uses `public_url` when configured,
    /// otherwise the `Host` header; without either the input is returned
    /// unchanged.
    pub fn absolute_url(&self, relative: &str, public_url: Option<&str>) -> String {
        if relative.starts_with("http://") || relative.starts_with("https://") {
            return relative.to_string();
        }
        if let Some(base) = public_url.and_then(|base| url::Url::parse(base).ok()) {
            if let Ok(joined) = base.join(relative) {
                return joined.to_string();
            }
        }
        match self.header(header::HOST.as_str()) {
            Some(host) => format!("http://{}{}", host, relative),
            None => relative.to_string(),
        }
    }
}

fn parse_query(query: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_is_decoded() {
        let request = Request::new(Method::GET, "/api/books?author=Frank+Herbert&year=1965");
        assert_eq!(request.path, "/api/books");
        let params = request.query_params();
        assert_eq!(params["author"], "Frank Herbert");
        assert_eq!(params["year"], "1965");
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let request = Request::new(Method::GET, "/").with_header(header::CONTENT_TYPE, "text/xml");
        assert_eq!(request.header("Content-Type"), Some("text/xml"));
        assert_eq!(request.header("accept"), None);
    }

    #[test]
    fn test_absolute_url() {
        let request = Request::new(Method::POST, "/api/books").with_header(header::HOST, "example.com:8080");
        assert_eq!(
            request.absolute_url("/api/books/1", None),
            "http://example.com:8080/api/books/1"
        );
        assert_eq!(
            request.absolute_url("/api/books/1", Some("https://books.example.org/")),
            "https://books.example.org/api/books/1"
        );
        assert_eq!(
            Request::new(Method::POST, "/").absolute_url("/api/books/1", None),
            "/api/books/1"
        );
    }
}
