//! Per-request state threaded through every filter.

use axum::http::header;

use crate::collection::CollectionEntry;
use crate::entity::{Codec, CodecContext, Transformer};
use crate::error::{Fault, NegotiationError};
use crate::http::{Request, ResponseParts};
use crate::negotiation::{select_charset, select_content_type};
use crate::pipeline::application::Application;
use crate::routing::RouteMatch;

/// Where a request is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    InputFiltering,
    ActionInvoked,
    OutputFiltering,
    ExceptionHandling,
    Done,
}

/// The representation chosen for a response body.
#[derive(Debug, Clone, Copy)]
pub struct Representation<'a> {
    pub codec: &'a dyn Codec,
    pub charset: &'a str,
}

impl Representation<'_> {
    /// `Content-Type` header value, e.g. `text/xml; charset=utf-8`.
    pub fn content_type(&self) -> String {
        format!("{}; charset={}", self.codec.media_type(), self.charset)
    }
}

/// Everything a filter may look at or change for one request. Owned by
/// the request; never shared between requests.
#[derive(Debug)]
pub struct RequestContext<'a> {
    pub app: &'a Application,
    pub request: &'a Request,
    pub route: &'a RouteMatch,
    pub collection: &'a CollectionEntry,
    pub response: ResponseParts,
    pub phase: Phase,
}

impl<'a> RequestContext<'a> {
    pub fn new(
        app: &'a Application,
        request: &'a Request,
        route: &'a RouteMatch,
        collection: &'a CollectionEntry,
    ) -> Self {
        Self {
            app,
            request,
            route,
            collection,
            response: ResponseParts::default(),
            phase: Phase::InputFiltering,
        }
    }

    pub fn action(&self) -> &'a str {
        &self.route.action
    }

    pub fn codec_context(&self) -> CodecContext<'a> {
        CodecContext {
            hints: self.collection.hints(),
            collection: self.collection.name(),
        }
    }

    pub fn transformer(&self) -> Transformer<'a> {
        Transformer::new(self.app.collections(), self.collection)
    }

    /// Pick the output codec and charset from `Accept` and
    /// `Accept-Charset`. A missing header accepts everything.
    pub fn negotiate(&self) -> Result<Representation<'a>, Fault> {
        let codecs = self.app.codecs();
        let candidates = codecs.media_types();
        let accept = self.request.header(header::ACCEPT.as_str()).unwrap_or("*/*");
        let codec = select_content_type(&candidates, accept)?
            .and_then(|media_type| codecs.for_output(media_type))
            .ok_or_else(|| NegotiationError::ContentType {
                accept: accept.to_string(),
            })?;

        let charsets = self.app.charsets();
        let charset = match self.request.header(header::ACCEPT_CHARSET.as_str()) {
            Some(accept) => select_charset(charsets, accept)?.ok_or_else(|| {
                NegotiationError::Charset {
                    accept: accept.to_string(),
                }
            })?,
            None => charsets
                .first()
                .map(String::as_str)
                .ok_or_else(|| Fault::Internal("no charsets configured".into()))?,
        };

        Ok(Representation { codec, charset })
    }
}
