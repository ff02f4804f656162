//! Tokenizer for the field-mapping rule language.

use crate::error::SyntaxError;

/// Position of a token in the rule source (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Ident(String),
    LParen,
    RParen,
    /// `<=>`
    Both,
    /// `<=`
    Reverse,
    /// `=>`
    Forward,
    /// `*`
    Mandatory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// Field name reserved for the resource type.
const TYPE_FIELD: &str = "!type";

/// Split one rule line into tokens. `line` is the line number reported in
/// errors.
pub fn tokenize(source: &str, line: usize) -> Result<Vec<Token>, SyntaxError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = source.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let span = Span { line, column: i + 1 };

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let (kind, width) = match c {
            '(' => (TokenKind::LParen, 1),
            ')' => (TokenKind::RParen, 1),
            '*' => (TokenKind::Mandatory, 1),
            '<' if chars[i..].starts_with(&['<', '=', '>']) => (TokenKind::Both, 3),
            '<' if chars[i..].starts_with(&['<', '=']) => (TokenKind::Reverse, 2),
            '=' if chars[i..].starts_with(&['=', '>']) => (TokenKind::Forward, 2),
            '!' => {
                let rest: String = chars[i..].iter().take(TYPE_FIELD.len()).collect();
                if rest != TYPE_FIELD || chars.get(i + TYPE_FIELD.len()).is_some_and(|c| is_ident_char(*c)) {
                    return Err(illegal(span, c));
                }
                (TokenKind::Ident(TYPE_FIELD.to_string()), TYPE_FIELD.len())
            }
            c if c.is_ascii_alphabetic() => {
                let ident: String = chars[i..].iter().take_while(|c| is_ident_char(**c)).collect();
                let width = ident.chars().count();
                (TokenKind::Ident(ident), width)
            }
            c => return Err(illegal(span, c)),
        };

        tokens.push(Token { kind, span });
        i += width;
    }

    Ok(tokens)
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn illegal(span: Span, c: char) -> SyntaxError {
    SyntaxError::Rule {
        line: span.line,
        column: span.column,
        message: format!("illegal token '{}'", c),
    }
}
