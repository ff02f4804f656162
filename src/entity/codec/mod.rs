//! Wire formats for entity bodies.
//!
//! Each codec converts between raw bytes and the generic [`Value`] tree.
//! Codecs never see collection rules; type assignment from hints that the
//! wire format cannot express happens later in the transformer.

pub mod json;
pub mod xml;
pub mod yaml;

use std::fmt;
use std::sync::Arc;

use crate::entity::hints::Hints;
use crate::error::CodecError;
use crate::resource::Value;

pub use json::JsonCodec;
pub use xml::XmlCodec;
pub use yaml::YamlCodec;

/// Per-request information a codec may need.
#[derive(Debug, Clone, Copy)]
pub struct CodecContext<'a> {
    /// Hints of the collection serving the request.
    pub hints: &'a Hints,
    /// Name of the collection; XML uses it as the element wrapping a list.
    pub collection: &'a str,
}

/// A parse/format pair for one media type.
pub trait Codec: Send + Sync + fmt::Debug {
    /// Media type advertised for output, e.g. `text/xml`.
    fn media_type(&self) -> &'static str;

    /// Other media types accepted on input.
    fn aliases(&self) -> &'static [&'static str] {
        &[]
    }

    /// Decode a body. `charset` is the one declared by the client, if any.
    fn parse(
        &self,
        body: &[u8],
        charset: Option<&str>,
        cx: &CodecContext<'_>,
    ) -> Result<Value, CodecError>;

    /// Encode a value in the negotiated charset.
    fn format(&self, value: &Value, charset: &str, cx: &CodecContext<'_>)
        -> Result<Vec<u8>, CodecError>;

    fn handles(&self, essence: &str) -> bool {
        self.media_type() == essence || self.aliases().contains(&essence)
    }
}

/// Codecs in preference order. The order is the candidate order used for
/// output negotiation.
#[derive(Debug, Clone)]
pub struct CodecRegistry {
    codecs: Vec<Arc<dyn Codec>>,
}

impl CodecRegistry {
    pub fn empty() -> Self {
        Self { codecs: Vec::new() }
    }

    pub fn register(&mut self, codec: Arc<dyn Codec>) {
        self.codecs.push(codec);
    }

    /// Codec for an input media type essence (`type/subtype`, lowercase).
    pub fn for_input(&self, essence: &str) -> Option<&dyn Codec> {
        self.codecs
            .iter()
            .find(|codec| codec.handles(essence))
            .map(|codec| codec.as_ref())
    }

    /// Codec producing exactly `media_type` on output.
    pub fn for_output(&self, media_type: &str) -> Option<&dyn Codec> {
        self.codecs
            .iter()
            .find(|codec| codec.media_type() == media_type)
            .map(|codec| codec.as_ref())
    }

    /// Output media types in preference order.
    pub fn media_types(&self) -> Vec<&'static str> {
        self.codecs.iter().map(|codec| codec.media_type()).collect()
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(XmlCodec));
        registry.register(Arc::new(YamlCodec));
        registry.register(Arc::new(JsonCodec));
        registry
    }
}
