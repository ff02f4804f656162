//! Path pattern matching.
//!
//! # Responsibilities
//! - Parse route patterns (`/api/:collection/:id` or `/api/{collection}/{id}`)
//! - Match request paths segment by segment, capturing variables
//!
//! # Design Decisions
//! - Paths are case-sensitive
//! - A trailing slash is not significant
//! - No regex: matching is a single pass over the segments

use std::collections::BTreeMap;
use std::fmt;

/// Error type for malformed route patterns.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("route pattern must start with '/': {0}")]
    NotAbsolute(String),

    #[error("empty variable name in route pattern: {0}")]
    EmptyVariable(String),

    #[error("variable '{name}' appears twice in route pattern: {pattern}")]
    DuplicateVariable { name: String, pattern: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Variable(String),
}

/// A compiled path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    source: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        if !pattern.starts_with('/') {
            return Err(PatternError::NotAbsolute(pattern.to_string()));
        }
        let mut segments = Vec::new();
        for part in split(pattern) {
            let variable = part
                .strip_prefix(':')
                .or_else(|| part.strip_prefix('{').and_then(|p| p.strip_suffix('}')));
            let segment = match variable {
                Some("") => return Err(PatternError::EmptyVariable(pattern.to_string())),
                Some(name) => {
                    if segments.contains(&Segment::Variable(name.to_string())) {
                        return Err(PatternError::DuplicateVariable {
                            name: name.to_string(),
                            pattern: pattern.to_string(),
                        });
                    }
                    Segment::Variable(name.to_string())
                }
                None => Segment::Literal(part.to_string()),
            };
            segments.push(segment);
        }
        Ok(Self {
            source: pattern.to_string(),
            segments,
        })
    }

    /// Captured variables when `path` matches.
    pub fn matches(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let mut vars = BTreeMap::new();
        let mut parts = split(path);
        for segment in &self.segments {
            let part = parts.next()?;
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Literal(_) => return None,
                Segment::Variable(name) => {
                    vars.insert(name.clone(), part.to_string());
                }
            }
        }
        if parts.next().is_some() {
            return None;
        }
        Some(vars)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|part| !part.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variables_both_syntaxes() {
        let colon = PathPattern::parse("/api/:collection/:id").unwrap();
        let brace = PathPattern::parse("/api/{collection}/{id}").unwrap();
        for pattern in [colon, brace] {
            let vars = pattern.matches("/api/books/7").unwrap();
            assert_eq!(vars["collection"], "books");
            assert_eq!(vars["id"], "7");
        }
    }

    #[test]
    fn test_segment_count_must_agree() {
        let pattern = PathPattern::parse("/api/:collection").unwrap();
        assert!(pattern.matches("/api/books").is_some());
        assert!(pattern.matches("/api/books/").is_some());
        assert!(pattern.matches("/api").is_none());
        assert!(pattern.matches("/api/books/7").is_none());
        assert!(pattern.matches("/API/books").is_none());
    }

    #[test]
    fn test_bad_patterns() {
        assert!(matches!(PathPattern::parse("api"), Err(PatternError::NotAbsolute(_))));
        assert!(matches!(PathPattern::parse("/api/:"), Err(PatternError::EmptyVariable(_))));
        assert!(matches!(
            PathPattern::parse("/:a/:a"),
            Err(PatternError::DuplicateVariable { .. })
        ));
    }
}
