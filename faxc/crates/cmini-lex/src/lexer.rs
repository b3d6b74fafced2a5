//! The lexer: turns a source buffer into a sequence of [`Token`]s.

use crate::cursor::Cursor;
use crate::error::{LexError, LexResult};
use crate::token::{Token, TokenKind, KEYWORDS, ONE_CHAR_SYMBOLS, TWO_CHAR_SYMBOLS};
use cmini_util::Span;

pub struct Lexer<'a> {
    cursor: Cursor<'a>,
    done: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            cursor: Cursor::new(source),
            done: false,
        }
    }

    /// Lexes the whole buffer eagerly, returning the token sequence
    /// terminated by a single `Eof` token.
    pub fn tokenize(source: &'a str) -> LexResult<Vec<Token>> {
        Lexer::new(source).collect()
    }

    fn skip_whitespace(&mut self) {
        while !self.cursor.is_at_end() && self.cursor.current_char().is_whitespace() {
            self.cursor.advance();
        }
    }

    fn next_token(&mut self) -> LexResult<Token> {
        self.skip_whitespace();
        let start = self.cursor.position();

        if self.cursor.is_at_end() {
            return Ok(Token::new(TokenKind::Eof, Span::at(start as u32)));
        }

        if let Some(sym) = self.match_two_char_symbol() {
            self.cursor.advance();
            self.cursor.advance();
            return Ok(Token::new(
                TokenKind::Reserved(sym.to_string()),
                Span::new(start as u32, 2),
            ));
        }

        let c = self.cursor.current_char();

        if c == '"' {
            return self.lex_string(start);
        }

        if ONE_CHAR_SYMBOLS.contains(&c) {
            self.cursor.advance();
            return Ok(Token::new(
                TokenKind::Reserved(c.to_string()),
                Span::new(start as u32, 1),
            ));
        }

        if c.is_ascii_digit() {
            return self.lex_number(start);
        }

        if is_ident_start(c) {
            return self.lex_ident_or_keyword(start);
        }

        Err(LexError::UnexpectedChar {
            span: Span::at(start as u32),
        })
    }

    fn match_two_char_symbol(&self) -> Option<&'static str> {
        let a = self.cursor.char_at(0);
        let b = self.cursor.char_at(1);
        let mut buf = [0u8; 2];
        if a.len_utf8() != 1 || b.len_utf8() != 1 {
            return None;
        }
        buf[0] = a as u8;
        buf[1] = b as u8;
        let two = std::str::from_utf8(&buf).ok()?;
        TWO_CHAR_SYMBOLS.iter().find(|&&s| s == two).copied()
    }

    fn lex_number(&mut self, start: usize) -> LexResult<Token> {
        while !self.cursor.is_at_end() && self.cursor.current_char().is_ascii_digit() {
            self.cursor.advance();
        }
        let text = self.cursor.slice_from(start);
        let value: i64 = text.parse().map_err(|_| LexError::InvalidNumber {
            span: Span::new(start as u32, text.len() as u32),
        })?;
        Ok(Token::new(
            TokenKind::Number(value),
            Span::new(start as u32, text.len() as u32),
        ))
    }

    fn lex_ident_or_keyword(&mut self, start: usize) -> LexResult<Token> {
        self.cursor.advance();
        while !self.cursor.is_at_end() && is_ident_continue(self.cursor.current_char()) {
            self.cursor.advance();
        }
        let text = self.cursor.slice_from(start);
        let span = Span::new(start as u32, text.len() as u32);
        if KEYWORDS.contains(&text) {
            Ok(Token::new(TokenKind::Reserved(text.to_string()), span))
        } else {
            Ok(Token::new(TokenKind::Ident(text.to_string()), span))
        }
    }

    /// String literals support exactly `\\` and `\"` as escapes; any other
    /// backslash sequence is left as-is (no other escape set is required by
    /// the grammar, and this compiler never needs `\n`/`\t`-style control
    /// characters in a label name).
    fn lex_string(&mut self, start: usize) -> LexResult<Token> {
        self.cursor.advance(); // opening quote
        let mut value = String::new();
        loop {
            if self.cursor.is_at_end() {
                return Err(LexError::UnterminatedString {
                    span: Span::at(start as u32),
                });
            }
            match self.cursor.current_char() {
                '"' => {
                    self.cursor.advance();
                    break;
                }
                '\\' => {
                    self.cursor.advance();
                    match self.cursor.current_char() {
                        '"' => {
                            value.push('"');
                            self.cursor.advance();
                        }
                        '\\' => {
                            value.push('\\');
                            self.cursor.advance();
                        }
                        other => {
                            value.push('\\');
                            value.push(other);
                            self.cursor.advance();
                        }
                    }
                }
                c => {
                    value.push(c);
                    self.cursor.advance();
                }
            }
        }
        let len = (self.cursor.position() - start) as u32;
        Ok(Token::new(TokenKind::Str(value), Span::new(start as u32, len)))
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl<'a> Iterator for Lexer<'a> {
    type Item = LexResult<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_token() {
            Ok(token) => {
                if token.is_eof() {
                    self.done = true;
                }
                Some(Ok(token))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::tokenize(src)
            .expect("lex should succeed")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lexes_keyword_before_identifier() {
        let ks = kinds("int x;");
        assert_eq!(
            ks,
            vec![
                TokenKind::Reserved("int".into()),
                TokenKind::Ident("x".into()),
                TokenKind::Reserved(";".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn keyword_prefix_of_identifier_is_not_a_keyword() {
        let ks = kinds("intx");
        assert_eq!(ks, vec![TokenKind::Ident("intx".into()), TokenKind::Eof]);
    }

    #[test]
    fn two_char_symbols_are_not_split() {
        let ks = kinds("a <= b");
        assert_eq!(
            ks,
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Reserved("<=".into()),
                TokenKind::Ident("b".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn less_equal_is_not_less_then_equal() {
        let ks = kinds("a<=b");
        assert!(ks.contains(&TokenKind::Reserved("<=".into())));
        assert!(!ks.contains(&TokenKind::Reserved("<".into())));
    }

    #[test]
    fn lexes_decimal_numbers() {
        let ks = kinds("42");
        assert_eq!(ks, vec![TokenKind::Number(42), TokenKind::Eof]);
    }

    #[test]
    fn unrecognized_character_is_fatal() {
        let err = Lexer::tokenize("@").unwrap_err();
        assert_eq!(err.span(), Span::at(0));
    }

    #[test]
    fn string_literal_resolves_escapes() {
        let ks = kinds(r#""a\"b\\c""#);
        assert_eq!(ks[0], TokenKind::Str("a\"b\\c".to_string()));
    }

    #[test]
    fn unterminated_string_is_fatal() {
        let err = Lexer::tokenize("\"abc").unwrap_err();
        assert!(matches!(err, LexError::UnterminatedString { .. }));
    }

    // ------------------------------------------------------------------
    // Property-based tests over arbitrary inputs.
    // ------------------------------------------------------------------

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn arbitrary_identifiers_lex_as_a_single_ident_token(
            input in "[a-zA-Z_][a-zA-Z0-9_]{0,30}"
        ) {
            let toks = kinds(&input);
            prop_assert_eq!(toks.len(), 2); // ident + Eof
            if KEYWORDS.contains(&input.as_str()) {
                prop_assert_eq!(&toks[0], &TokenKind::Reserved(input.clone()));
            } else {
                prop_assert_eq!(&toks[0], &TokenKind::Ident(input.clone()));
            }
        }

        #[test]
        fn arbitrary_decimal_literals_lex_as_a_single_number_token(
            digits in "[0-9]{1,15}"
        ) {
            let toks = kinds(&digits);
            prop_assert_eq!(toks.len(), 2); // number + Eof
            let expected: i64 = digits.parse().unwrap();
            prop_assert_eq!(&toks[0], &TokenKind::Number(expected));
        }

        #[test]
        fn arbitrary_whitespace_runs_between_tokens_are_skipped(
            gap in " {1,10}"
        ) {
            let src = format!("1{gap}2");
            let toks = kinds(&src);
            prop_assert_eq!(toks, vec![
                TokenKind::Number(1),
                TokenKind::Number(2),
                TokenKind::Eof,
            ]);
        }
    }
}
