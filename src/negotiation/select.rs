//! Content-type and charset selection.
//!
//! # Algorithm
//! For every server-side candidate, find the `Accept` entries it matches and
//! keep the most specific one (then the highest q):
//!
//! ```text
//! */*            precedence 0
//! text/*         precedence 1
//! text/xml       precedence 2 + number of matched options
//! ```
//!
//! Across candidates the highest q wins. Ties go to the candidate whose
//! winning entry appears first in the header, then to the candidate
//! declared first by the server.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use crate::error::SyntaxError;
use crate::negotiation::header::{parse_content_type, parse_list_header, MediaType};

/// Quality factor in thousandths (`q=0.5` is 500).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Quality(u16);

impl Quality {
    pub const MAX: Quality = Quality(1000);

    fn parse(raw: Option<&str>, header: &str) -> Result<Self, SyntaxError> {
        let Some(raw) = raw else {
            return Ok(Self::MAX);
        };
        let q: f32 = raw
            .trim()
            .parse()
            .map_err(|_| SyntaxError::header(header, format!("illegal quality factor '{}'", raw)))?;
        if !q.is_finite() {
            return Err(SyntaxError::header(header, format!("illegal quality factor '{}'", raw)));
        }
        Ok(Quality((q.clamp(0.0, 1.0) * 1000.0).round() as u16))
    }

    /// q=0 means "not acceptable".
    pub fn is_acceptable(self) -> bool {
        self.0 > 0
    }

    pub fn as_f32(self) -> f32 {
        f32::from(self.0) / 1000.0
    }
}

#[derive(Debug)]
struct AcceptedType {
    media: MediaType,
    options: BTreeMap<String, String>,
    q: Quality,
}

fn parse_accept(accept: &str) -> Result<Vec<AcceptedType>, SyntaxError> {
    parse_list_header(accept, true)?
        .into_iter()
        .map(|item| {
            let q = Quality::parse(item.param("q"), accept)?;
            let media = MediaType::from_item(item, accept)?;
            let options = media
                .params
                .iter()
                .filter(|(k, _)| k.as_str() != "q")
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            Ok(AcceptedType { media, options, q })
        })
        .collect()
}

impl AcceptedType {
    /// Specificity of this entry for `candidate`, or `None` on mismatch.
    fn precedence(&self, candidate: &MediaType) -> Option<usize> {
        if self.media.kind == "*" {
            return Some(0);
        }
        if self.media.kind != candidate.kind {
            return None;
        }
        if self.media.subtype == "*" {
            return Some(1);
        }
        if self.media.subtype != candidate.subtype {
            return None;
        }
        let options_match = self
            .options
            .iter()
            .all(|(k, v)| candidate.params.get(k) == Some(v));
        options_match.then(|| 2 + self.options.len())
    }
}

/// Pick the candidate content-type the client prefers.
///
/// Returns `Ok(None)` when nothing is acceptable; callers answer that with
/// 406 Not Acceptable.
pub fn select_content_type<'c, S: AsRef<str>>(
    candidates: &'c [S],
    accept: &str,
) -> Result<Option<&'c str>, SyntaxError> {
    let accepted = parse_accept(accept)?;
    let mut best: Option<(Quality, Reverse<usize>, Reverse<usize>)> = None;
    let mut winner = None;

    for (ci, candidate) in candidates.iter().enumerate() {
        let candidate = candidate.as_ref();
        let media = parse_content_type(candidate)?;

        // (precedence, q, Reverse(entry index)) of the best matching entry
        let mut matched: Option<(usize, Quality, Reverse<usize>)> = None;
        for (ei, entry) in accepted.iter().enumerate() {
            if let Some(precedence) = entry.precedence(&media) {
                let key = (precedence, entry.q, Reverse(ei));
                if matched.map_or(true, |m| key > m) {
                    matched = Some(key);
                }
            }
        }

        let Some((_, q, entry_index)) = matched else {
            continue;
        };
        if !q.is_acceptable() {
            continue;
        }
        let key = (q, entry_index, Reverse(ci));
        if best.map_or(true, |b| key > b) {
            best = Some(key);
            winner = Some(candidate);
        }
    }

    Ok(winner)
}

/// Pick the candidate charset the client prefers.
///
/// `*` matches every candidate the header does not name explicitly.
/// `iso-8859-1` is acceptable at q=1 unless the header names it.
pub fn select_charset<'c, S: AsRef<str>>(
    candidates: &'c [S],
    accept: &str,
) -> Result<Option<&'c str>, SyntaxError> {
    let mut explicit: Vec<(String, Quality)> = Vec::new();
    let mut wildcard = None;
    for item in parse_list_header(accept, true)? {
        let q = Quality::parse(item.param("q"), accept)?;
        if item.value == "*" {
            wildcard.get_or_insert(q);
        } else {
            explicit.push((item.value, q));
        }
    }

    let mut best: Option<(Quality, Reverse<usize>)> = None;
    let mut winner = None;

    for (ci, candidate) in candidates.iter().enumerate() {
        let name = candidate.as_ref().to_lowercase();
        let q = explicit
            .iter()
            .find(|(charset, _)| *charset == name)
            .map(|(_, q)| *q)
            .or_else(|| {
                if name == "iso-8859-1" {
                    Some(Quality::MAX)
                } else {
                    wildcard
                }
            });

        let Some(q) = q.filter(|q| q.is_acceptable()) else {
            continue;
        };
        let key = (q, Reverse(ci));
        if best.map_or(true, |b| key > b) {
            best = Some(key);
            winner = Some(candidate.as_ref());
        }
    }

    Ok(winner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple() {
        let ctypes = ["text/html", "text/plain"];
        assert_eq!(
            select_content_type(&ctypes, "text/html, text/plain").unwrap(),
            Some("text/html")
        );
    }

    #[test]
    fn test_quality_factor() {
        let ctypes = ["text/html", "text/plain"];
        assert_eq!(
            select_content_type(&ctypes, "text/html; q=0.8, text/plain; q=0.9").unwrap(),
            Some("text/plain")
        );
        assert_eq!(
            select_content_type(&ctypes, "text/html, text/plain; q=0.9").unwrap(),
            Some("text/html")
        );
    }

    #[test]
    fn test_exact_tie_goes_to_earlier_header_entry() {
        let ctypes = ["text/xml", "text/yaml"];
        assert_eq!(
            select_content_type(&ctypes, "text/yaml;q=0.9,text/xml;q=0.9").unwrap(),
            Some("text/yaml")
        );
    }

    #[test]
    fn test_wildcard_tie_goes_to_earlier_candidate() {
        let ctypes = ["text/xml", "text/yaml"];
        assert_eq!(select_content_type(&ctypes, "text/*").unwrap(), Some("text/xml"));
        assert_eq!(select_content_type(&ctypes, "*/*").unwrap(), Some("text/xml"));
    }

    #[test]
    fn test_specificity() {
        let ctypes = ["text/xml", "text/plain"];
        assert_eq!(
            select_content_type(&ctypes, "text/*;q=0.9,text/plain;q=0.8").unwrap(),
            Some("text/xml")
        );
        assert_eq!(
            select_content_type(&ctypes, "text/xml; q=0.7, text/*; q=0.9, text/plain; q=0.8")
                .unwrap(),
            Some("text/plain")
        );
        assert_eq!(
            select_content_type(&ctypes, "text/*;q=0.8,text/plain;q=0.9").unwrap(),
            Some("text/plain")
        );

        let ctypes = ["text/xml; level=1", "text/plain"];
        assert_eq!(
            select_content_type(
                &ctypes,
                "text/xml; level=1; q=0.7, text/xml; q=0.9, text/plain; q=0.8"
            )
            .unwrap(),
            Some("text/plain")
        );
    }

    #[test]
    fn test_options_must_match() {
        let ctypes = ["text/xml; level=2"];
        assert_eq!(select_content_type(&ctypes, "text/xml; level=1").unwrap(), None);
        assert_eq!(
            select_content_type(&ctypes, "text/xml; level=2").unwrap(),
            Some("text/xml; level=2")
        );
    }

    #[test]
    fn test_non_matching_and_zero_quality() {
        let ctypes = ["text/xml", "application/xml"];
        assert_eq!(select_content_type(&ctypes, "text/html, text/plain").unwrap(), None);
        assert_eq!(select_content_type(&ctypes, "text/xml; q=0").unwrap(), None);
    }

    #[test]
    fn test_malformed_accept() {
        let ctypes = ["text/xml"];
        assert!(select_content_type(&ctypes, "text/xml; q=high").is_err());
        assert!(select_content_type(&ctypes, "text").is_err());
    }

    #[test]
    fn test_charset_selection() {
        let charsets = ["utf-8", "utf-16"];
        assert_eq!(select_charset(&charsets, "utf-8").unwrap(), Some("utf-8"));
        assert_eq!(
            select_charset(&charsets, "utf-8; q=0.8, utf-16; q=0.9").unwrap(),
            Some("utf-16")
        );
        assert_eq!(
            select_charset(&charsets, "utf-8, utf-16; q=0.9").unwrap(),
            Some("utf-8")
        );
        assert_eq!(
            select_charset(&charsets, "utf-8; q=0.8, *; q=0.9").unwrap(),
            Some("utf-16")
        );
        assert_eq!(select_charset(&charsets, "koi8-r").unwrap(), None);
    }

    #[test]
    fn test_iso_8859_1_fallback() {
        let charsets = ["utf-8", "iso-8859-1"];
        assert_eq!(
            select_charset(&charsets, "utf-8;q=0.5").unwrap(),
            Some("iso-8859-1")
        );
        assert_eq!(
            select_charset(&charsets, "utf-8, iso-8859-1;q=0.5").unwrap(),
            Some("utf-8")
        );
    }
}
