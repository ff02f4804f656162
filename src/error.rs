//! Error taxonomy shared by every stage of the request pipeline.
//!
//! # Kinds
//! - `SyntaxError`: malformed header, rule or hint text (never retried)
//! - `ValidationError`: unknown or missing field during rule application
//! - `NegotiationError`: no acceptable content-type or charset
//! - `CodecError`: body does not match its declared content-type
//! - `ActionError`: raised by collection business logic
//!
//! Everything that can go wrong while serving a request is carried by
//! [`Fault`], which knows the HTTP status it maps to.

use std::fmt;

use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};

/// Malformed header, rule or hint text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyntaxError {
    #[error("illegal header [{header}]: {reason}")]
    Header { header: String, reason: String },

    #[error("rule syntax error at {line}:{column}: {message}")]
    Rule {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("hint syntax error on line {line}: {message}")]
    Hint { line: usize, message: String },
}

impl SyntaxError {
    pub(crate) fn header(header: &str, reason: impl Into<String>) -> Self {
        Self::Header {
            header: header.to_string(),
            reason: reason.into(),
        }
    }
}

/// Rule application failed on the data it was given.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required input: {0}")]
    Missing(String),

    #[error("unknown input encountered: {0}")]
    Unknown(String),

    #[error("cannot apply `{function}` to {field}: {reason}")]
    Conversion {
        field: String,
        function: &'static str,
        reason: String,
    },
}

/// No representation acceptable to the client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NegotiationError {
    #[error("no acceptable content-type in: {accept}")]
    ContentType { accept: String },

    #[error("no acceptable charset in: {accept}")]
    Charset { accept: String },
}

/// A body could not be decoded or encoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("{format} error: {reason}")]
    Malformed { format: &'static str, reason: String },

    #[error("content-type not supported [{0}]")]
    UnsupportedMediaType(String),

    #[error("charset not supported [{0}]")]
    Charset(String),

    #[error("cannot format {format} entity: {reason}")]
    Format { format: &'static str, reason: String },
}

impl CodecError {
    pub(crate) fn malformed(format: &'static str, reason: impl ToString) -> Self {
        Self::Malformed {
            format,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn format(format: &'static str, reason: impl ToString) -> Self {
        Self::Format {
            format,
            reason: reason.to_string(),
        }
    }
}

/// Failure raised by the recursive resource transform.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("no type hint for resource at {path}")]
    MissingTypeHint { path: String },

    #[error("resource at {path} does not specify !type")]
    Untyped { path: String },
}

/// Failure raised by a collection action.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    Invalid(String),

    #[error("{0}")]
    Status(HttpReturn),

    #[error("action failed: {message}")]
    Failed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ActionError {
    /// Wrap an arbitrary error as a server-side action failure.
    pub fn failed<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Failed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Terminal HTTP status signal.
///
/// Raised by filters, handlers or actions to stop processing and answer the
/// request with the given status right away.
#[derive(Debug, Clone)]
pub struct HttpReturn {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub reason: Option<String>,
}

impl HttpReturn {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        self.headers.extend(headers);
        self.body = body.into();
        self
    }
}

impl fmt::Display for HttpReturn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(reason) = &self.reason {
            write!(f, ": {}", reason)?;
        }
        Ok(())
    }
}

impl std::error::Error for HttpReturn {}

/// Anything that interrupts the normal flow of a request.
#[derive(Debug, thiserror::Error)]
pub enum Fault {
    #[error(transparent)]
    Return(HttpReturn),

    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Negotiation(#[from] NegotiationError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Action(#[from] ActionError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<HttpReturn> for Fault {
    fn from(ret: HttpReturn) -> Self {
        Fault::Return(ret)
    }
}

impl Fault {
    /// Shorthand for a terminal status signal with a reason.
    pub fn status_with(status: StatusCode, reason: impl Into<String>) -> Self {
        Fault::Return(HttpReturn::new(status).with_reason(reason))
    }

    /// The HTTP status this fault is answered with.
    pub fn status(&self) -> StatusCode {
        match self {
            Fault::Return(ret) => ret.status,
            Fault::Syntax(SyntaxError::Header { .. }) => StatusCode::BAD_REQUEST,
            Fault::Syntax(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Fault::Validation(_) => StatusCode::BAD_REQUEST,
            Fault::Negotiation(_) => StatusCode::NOT_ACCEPTABLE,
            Fault::Codec(CodecError::UnsupportedMediaType(_) | CodecError::Charset(_)) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            Fault::Codec(CodecError::Malformed { .. }) => StatusCode::BAD_REQUEST,
            Fault::Codec(CodecError::Format { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            Fault::Transform(TransformError::Untyped { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            Fault::Transform(_) => StatusCode::BAD_REQUEST,
            Fault::Action(ActionError::NotFound(_)) => StatusCode::NOT_FOUND,
            Fault::Action(ActionError::Invalid(_)) => StatusCode::BAD_REQUEST,
            Fault::Action(ActionError::Status(ret)) => ret.status,
            Fault::Action(ActionError::Failed { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            Fault::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True when the fault is the client's doing.
    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }
}
