//! Header value grammar.
//!
//! ```text
//! header    := item (',' item)*
//! item      := primary (';' parameter)*
//! parameter := key '=' (quoted-string | token)
//! ```
//!
//! Quoted strings may escape any character with a backslash. Empty list
//! elements (`a,,b`) are skipped as RFC2616 allows.

use std::collections::BTreeMap;
use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use crate::error::SyntaxError;

/// One comma-separated element of a list header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderItem {
    /// The primary token, e.g. `text/html` or `utf-8`.
    pub value: String,
    /// Parameters in declaration order.
    pub params: Vec<(String, String)>,
}

impl HeaderItem {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Parse a list header such as `Accept` or `Accept-Charset`.
///
/// With `lower_case` set, primary tokens and parameter names are lowered;
/// parameter values are left alone.
pub fn parse_list_header(header: &str, lower_case: bool) -> Result<Vec<HeaderItem>, SyntaxError> {
    let mut scanner = Scanner {
        header,
        chars: header.chars().peekable(),
    };
    let mut items = Vec::new();

    loop {
        scanner.skip_whitespace();
        match scanner.chars.peek() {
            None => break,
            Some(',') => {
                scanner.chars.next();
                continue;
            }
            _ => {}
        }

        let primary = scanner.read_token();
        if primary.is_empty() {
            return Err(SyntaxError::header(header, "missing value before parameters"));
        }
        let mut item = HeaderItem {
            value: if lower_case { primary.to_lowercase() } else { primary },
            params: Vec::new(),
        };

        while scanner.chars.peek() == Some(&';') {
            scanner.chars.next();
            let (key, value) = scanner.read_parameter()?;
            let key = if lower_case { key.to_lowercase() } else { key };
            item.params.push((key, value));
        }

        match scanner.chars.next() {
            None | Some(',') => items.push(item),
            Some(c) => {
                return Err(SyntaxError::header(header, format!("unexpected character '{}'", c)));
            }
        }
    }

    Ok(items)
}

struct Scanner<'a> {
    header: &'a str,
    chars: Peekable<Chars<'a>>,
}

impl Scanner<'_> {
    fn skip_whitespace(&mut self) {
        while self.chars.peek().is_some_and(|c| c.is_whitespace()) {
            self.chars.next();
        }
    }

    /// Read up to the next separator and trim it.
    fn read_token(&mut self) -> String {
        let mut token = String::new();
        while let Some(&c) = self.chars.peek() {
            if matches!(c, ',' | ';' | '=' | '"') {
                break;
            }
            token.push(c);
            self.chars.next();
        }
        token.trim().to_string()
    }

    fn read_parameter(&mut self) -> Result<(String, String), SyntaxError> {
        self.skip_whitespace();
        let key = self.read_token();
        if key.is_empty() {
            return Err(SyntaxError::header(self.header, "missing parameter name"));
        }
        if self.chars.next() != Some('=') {
            return Err(SyntaxError::header(
                self.header,
                format!("missing '=' after parameter '{}'", key),
            ));
        }
        self.skip_whitespace();

        let value = if self.chars.peek() == Some(&'"') {
            self.chars.next();
            let quoted = self.read_quoted()?;
            self.skip_whitespace();
            quoted
        } else {
            let token = self.read_token();
            if token.is_empty() {
                return Err(SyntaxError::header(
                    self.header,
                    format!("missing value for parameter '{}'", key),
                ));
            }
            token
        };

        match self.chars.peek() {
            None | Some(',') | Some(';') => Ok((key, value)),
            Some(c) => Err(SyntaxError::header(
                self.header,
                format!("unexpected character '{}' after parameter '{}'", c, key),
            )),
        }
    }

    fn read_quoted(&mut self) -> Result<String, SyntaxError> {
        let mut value = String::new();
        loop {
            match self.chars.next() {
                None => return Err(SyntaxError::header(self.header, "unterminated quoted string")),
                Some('"') => return Ok(value),
                Some('\\') => match self.chars.next() {
                    Some(c) => value.push(c),
                    None => {
                        return Err(SyntaxError::header(self.header, "unterminated quoted string"))
                    }
                },
                Some(c) => value.push(c),
            }
        }
    }
}

/// A parsed media type, e.g. `text/xml; charset=utf-8`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    pub kind: String,
    pub subtype: String,
    pub params: BTreeMap<String, String>,
}

impl MediaType {
    /// `type/subtype` without parameters.
    pub fn essence(&self) -> String {
        format!("{}/{}", self.kind, self.subtype)
    }

    pub fn charset(&self) -> Option<&str> {
        self.params.get("charset").map(String::as_str)
    }

    pub(crate) fn from_item(item: HeaderItem, header: &str) -> Result<Self, SyntaxError> {
        // A bare `*` shows up in the wild as shorthand for `*/*`.
        let full = if item.value == "*" { "*/*" } else { item.value.as_str() };
        let (kind, subtype) = full
            .split_once('/')
            .filter(|(k, s)| !k.is_empty() && !s.is_empty() && !s.contains('/'))
            .ok_or_else(|| SyntaxError::header(header, format!("illegal media type '{}'", full)))?;
        Ok(Self {
            kind: kind.to_string(),
            subtype: subtype.to_string(),
            params: item.params.into_iter().collect(),
        })
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.subtype)?;
        for (key, value) in &self.params {
            write!(f, "; {}={}", key, value)?;
        }
        Ok(())
    }
}

/// Parse a single `Content-Type` value.
pub fn parse_content_type(header: &str) -> Result<MediaType, SyntaxError> {
    let mut items = parse_list_header(header, true)?;
    if items.len() != 1 {
        return Err(SyntaxError::header(header, "expecting exactly one media type"));
    }
    MediaType::from_item(items.remove(0), header)
}
