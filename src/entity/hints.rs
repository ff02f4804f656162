//! Path-addressed parse hints.
//!
//! A hint table is multi-line text, one hint per line:
//!
//! ```text
//! review: type=review
//! reviews: sequence, type=review
//! /book/*/note: type=note
//! ```
//!
//! A pattern starting with `/` must match the whole node path; any other
//! pattern matches a suffix of it at a segment boundary. `*` matches exactly
//! one segment. The first matching line wins.

use regex::Regex;

use crate::error::SyntaxError;

/// Directives attached to one path pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hint {
    /// Explicit type for a mapping found at the path.
    pub type_name: Option<String>,
    /// Treat the children of the node as a list even without repeated tags.
    pub sequence: bool,
}

#[derive(Debug, Clone)]
struct Entry {
    pattern: String,
    regex: Regex,
    hint: Hint,
}

/// The parsed hint table of one collection.
#[derive(Debug, Clone, Default)]
pub struct Hints {
    entries: Vec<Entry>,
}

impl Hints {
    pub fn parse(source: &str) -> Result<Self, SyntaxError> {
        let mut entries = Vec::new();
        for (index, line) in source.lines().enumerate() {
            let line_no = index + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            entries.push(parse_line(line, line_no)?);
        }
        Ok(Self { entries })
    }

    /// The hint for a normalized node path such as `/book/reviews`.
    pub fn get(&self, path: &str) -> Option<&Hint> {
        self.entries
            .iter()
            .find(|entry| entry.regex.is_match(path))
            .map(|entry| &entry.hint)
    }

    /// Shorthand for the `type` directive at `path`.
    pub fn type_at(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(|hint| hint.type_name.as_deref())
    }

    /// Shorthand for the `sequence` directive at `path`.
    pub fn is_sequence(&self, path: &str) -> bool {
        self.get(path).is_some_and(|hint| hint.sequence)
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.pattern.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_line(line: &str, line_no: usize) -> Result<Entry, SyntaxError> {
    let error = |message: String| SyntaxError::Hint {
        line: line_no,
        message,
    };

    let (pattern, directives) = line
        .split_once(':')
        .ok_or_else(|| error("expecting 'path: directives'".into()))?;
    let pattern = pattern.trim();
    if pattern.is_empty() || pattern == "/" {
        return Err(error("missing path".into()));
    }
    if directives.contains(':') {
        return Err(error("more than one ':'".into()));
    }

    let mut hint = Hint::default();
    for directive in directives.split(',') {
        let directive = directive.trim();
        if directive.is_empty() {
            continue;
        }
        let (key, value) = match directive.split_once('=') {
            Some((key, value)) => (key.trim(), Some(value.trim())),
            None => (directive, None),
        };
        match (key, value) {
            ("type", Some(name)) if !name.is_empty() => hint.type_name = Some(name.to_string()),
            ("type", _) => return Err(error("'type' requires a value".into())),
            ("sequence", None) => hint.sequence = true,
            ("sequence", Some(flag)) => {
                hint.sequence = match flag.to_ascii_lowercase().as_str() {
                    "true" | "yes" | "1" => true,
                    "false" | "no" | "0" => false,
                    other => return Err(error(format!("illegal value for 'sequence': {}", other))),
                }
            }
            (other, _) => return Err(error(format!("unknown hint '{}'", other))),
        }
    }

    let regex = compile(pattern).map_err(|e| error(e.to_string()))?;
    Ok(Entry {
        pattern: pattern.to_string(),
        regex,
        hint,
    })
}

fn compile(pattern: &str) -> Result<Regex, regex::Error> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join("[^/]+");
    if pattern.starts_with('/') {
        Regex::new(&format!("^{}$", body))
    } else {
        Regex::new(&format!("(?:^|/){}$", body))
    }
}
