//! Text encodings supported for entity bodies.

use crate::error::CodecError;

pub const UTF_8: &str = "utf-8";
pub const US_ASCII: &str = "us-ascii";
pub const ISO_8859_1: &str = "iso-8859-1";

/// Canonical name of a supported charset, accepting common aliases.
pub fn canonical(name: &str) -> Option<&'static str> {
    match name.trim().to_ascii_lowercase().as_str() {
        "utf-8" | "utf8" => Some(UTF_8),
        "us-ascii" | "ascii" => Some(US_ASCII),
        "iso-8859-1" | "iso8859-1" | "latin-1" | "latin1" => Some(ISO_8859_1),
        _ => None,
    }
}

/// Decode `bytes` as text in `charset`.
pub fn decode(bytes: &[u8], charset: &str) -> Result<String, CodecError> {
    let charset = canonical(charset).ok_or_else(|| CodecError::Charset(charset.to_string()))?;
    match charset {
        UTF_8 => {
            let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
            String::from_utf8(bytes.to_vec()).map_err(|e| CodecError::malformed(UTF_8, e))
        }
        US_ASCII => match bytes.iter().position(|b| !b.is_ascii()) {
            Some(offset) => Err(CodecError::malformed(
                US_ASCII,
                format!("non-ASCII byte at offset {}", offset),
            )),
            None => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
        },
        _ => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
    }
}

/// Encode `text` in `charset`.
pub fn encode(text: &str, charset: &str) -> Result<Vec<u8>, CodecError> {
    let charset = canonical(charset).ok_or_else(|| CodecError::Charset(charset.to_string()))?;
    let limit = match charset {
        UTF_8 => return Ok(text.as_bytes().to_vec()),
        US_ASCII => 0x7f,
        _ => 0xff,
    };
    text.chars()
        .map(|c| {
            u8::try_from(u32::from(c))
                .ok()
                .filter(|&b| u32::from(b) <= limit)
                .ok_or_else(|| {
                    CodecError::format(charset, format!("character {:?} is not representable", c))
                })
        })
        .collect()
}
