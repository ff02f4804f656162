//! Recursive-descent parser for single rules.
//!
//! ```text
//! rule       := fieldspec direction fieldspec mandatory?
//! fieldspec  := IDENT | IDENT '(' fieldspec ')'
//! direction  := '<=>' | '<=' | '=>'
//! mandatory  := '*'
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::SyntaxError;
use crate::rules::functions::TransformFn;
use crate::rules::lexer::{tokenize, Span, Token, TokenKind};

/// Which way(s) a rule maps values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// `=>`: applied by `process` only.
    Forward,
    /// `<=`: applied by `process_reverse` only.
    Reverse,
    /// `<=>`
    Both,
}

impl Direction {
    pub fn includes_forward(self) -> bool {
        matches!(self, Direction::Forward | Direction::Both)
    }

    pub fn includes_reverse(self) -> bool {
        matches!(self, Direction::Reverse | Direction::Both)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Forward => "=>",
            Direction::Reverse => "<=",
            Direction::Both => "<=>",
        })
    }
}

/// One side of a rule: a field name and the conversions applied to the
/// value read from it, innermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub transforms: Vec<TransformFn>,
}

impl fmt::Display for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for func in self.transforms.iter().rev() {
            write!(f, "{}(", func)?;
        }
        f.write_str(&self.name)?;
        for _ in &self.transforms {
            f.write_str(")")?;
        }
        Ok(())
    }
}

/// A parsed field correspondence.
///
/// `process` reads `left` and writes `right`; `process_reverse` reads
/// `right` and writes `left`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub left: FieldSpec,
    pub direction: Direction,
    pub right: FieldSpec,
    pub mandatory: bool,
}

impl Rule {
    /// Parse a rule reported as being on `line` of its source.
    pub fn parse_at(source: &str, line: usize) -> Result<Rule, SyntaxError> {
        let tokens = tokenize(source, line)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            end: Span {
                line,
                column: source.chars().count() + 1,
            },
        };
        let rule = parser.rule()?;
        if let Some(token) = parser.peek() {
            return Err(error_at(token.span, format!("unexpected {}", describe(&token.kind))));
        }
        Ok(rule)
    }
}

impl FromStr for Rule {
    type Err = SyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rule::parse_at(s, 1)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.direction, self.right)?;
        if self.mandatory {
            f.write_str(" *")?;
        }
        Ok(())
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    end: Span,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn rule(&mut self) -> Result<Rule, SyntaxError> {
        let left = self.fieldspec()?;
        let direction = match self.next() {
            Some(Token { kind: TokenKind::Both, .. }) => Direction::Both,
            Some(Token { kind: TokenKind::Reverse, .. }) => Direction::Reverse,
            Some(Token { kind: TokenKind::Forward, .. }) => Direction::Forward,
            Some(token) => {
                return Err(error_at(
                    token.span,
                    format!("expecting '<=>', '<=' or '=>', found {}", describe(&token.kind)),
                ))
            }
            None => return Err(error_at(self.end, "expecting '<=>', '<=' or '=>'")),
        };
        let right = self.fieldspec()?;
        let mandatory = matches!(self.peek(), Some(Token { kind: TokenKind::Mandatory, .. }));
        if mandatory {
            self.pos += 1;
        }
        Ok(Rule {
            left,
            direction,
            right,
            mandatory,
        })
    }

    fn fieldspec(&mut self) -> Result<FieldSpec, SyntaxError> {
        let (name, span) = match self.next() {
            Some(Token { kind: TokenKind::Ident(name), span }) => (name, span),
            Some(token) => {
                return Err(error_at(
                    token.span,
                    format!("expecting field name, found {}", describe(&token.kind)),
                ))
            }
            None => return Err(error_at(self.end, "expecting field name")),
        };

        if !matches!(self.peek(), Some(Token { kind: TokenKind::LParen, .. })) {
            return Ok(FieldSpec {
                name,
                transforms: Vec::new(),
            });
        }
        self.pos += 1;

        let function: TransformFn = name.parse().map_err(|msg| error_at(span, msg))?;
        let mut inner = self.fieldspec()?;
        match self.next() {
            Some(Token { kind: TokenKind::RParen, .. }) => {}
            Some(token) => {
                return Err(error_at(
                    token.span,
                    format!("expecting ')', found {}", describe(&token.kind)),
                ))
            }
            None => return Err(error_at(self.end, "unmatched '('")),
        }
        inner.transforms.push(function);
        Ok(inner)
    }
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Ident(name) => format!("'{}'", name),
        TokenKind::LParen => "'('".into(),
        TokenKind::RParen => "')'".into(),
        TokenKind::Both => "'<=>'".into(),
        TokenKind::Reverse => "'<='".into(),
        TokenKind::Forward => "'=>'".into(),
        TokenKind::Mandatory => "'*'".into(),
    }
}

fn error_at(span: Span, message: impl Into<String>) -> SyntaxError {
    SyntaxError::Rule {
        line: span.line,
        column: span.column,
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_rule() {
        let rule: Rule = "name <=> Name *".parse().unwrap();
        assert_eq!(rule.left.name, "name");
        assert_eq!(rule.right.name, "Name");
        assert_eq!(rule.direction, Direction::Both);
        assert!(rule.mandatory);
        assert!(rule.left.transforms.is_empty());
    }

    #[test]
    fn test_nested_functions_innermost_first() {
        let rule: Rule = "int(str(year)) => Year".parse().unwrap();
        assert_eq!(rule.left.name, "year");
        assert_eq!(rule.left.transforms, vec![TransformFn::Str, TransformFn::Int]);
        assert_eq!(rule.direction, Direction::Forward);
        assert!(!rule.mandatory);
        assert_eq!(rule.to_string(), "int(str(year)) => Year");
    }

    #[test]
    fn test_reverse_only() {
        let rule: Rule = "id <= objectid".parse().unwrap();
        assert!(rule.direction.includes_reverse());
        assert!(!rule.direction.includes_forward());
    }

    #[test]
    fn test_errors_carry_position() {
        match Rule::parse_at("int(year <=> Year", 4) {
            Err(SyntaxError::Rule { line, column, .. }) => {
                assert_eq!(line, 4);
                assert_eq!(column, 10);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        match "year <=>".parse::<Rule>() {
            Err(SyntaxError::Rule { column, message, .. }) => {
                assert_eq!(column, 9);
                assert_eq!(message, "expecting field name");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!("year Year".parse::<Rule>().is_err());
        assert!("year <=> Year * *".parse::<Rule>().is_err());
        assert!("frobnicate(year) <=> Year".parse::<Rule>().is_err());
    }
}
