//! Token representation.

use cmini_util::Span;

/// The reserved words and punctuation the lexer recognizes. Keywords and
/// symbols share a single `Reserved` kind at the token-kind level and are
/// told apart by comparing their literal text, matching the grammar's own
/// treatment of them as one lexical class.
pub const KEYWORDS: &[&str] = &[
    "int", "char", "if", "else", "while", "for", "return", "sizeof",
];

/// Two-character symbols, tried before any one-character symbol so that e.g.
/// `==` is not lexed as two `=` tokens.
pub const TWO_CHAR_SYMBOLS: &[&str] = &["==", "!=", "<=", ">="];

/// One-character symbols.
pub const ONE_CHAR_SYMBOLS: &[char] = &[
    '+', '-', '*', '/', '&', '(', ')', '<', '>', '=', '{', '}', ';', ',', '[', ']',
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    /// A keyword or symbol, identified by its literal text.
    Reserved(String),
    Ident(String),
    Number(i64),
    /// A string literal with escapes already resolved.
    Str(String),
    Eof,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn is_reserved(&self, text: &str) -> bool {
        matches!(&self.kind, TokenKind::Reserved(t) if t == text)
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }

    pub fn ident_text(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Ident(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn number_value(&self) -> Option<i64> {
        match &self.kind {
            TokenKind::Number(n) => Some(*n),
            _ => None,
        }
    }
}
