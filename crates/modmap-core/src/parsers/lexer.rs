//! Module map lexer
//!
//! Splits file content into identifiers, string literals, integers and single
//! character punctuation. Whitespace and comments are dropped.
//!
//! The lexer is intentionally lenient in two places:
//! - `123bar` lexes as `INTEGER(123)` followed by `IDENT(bar)`.
//! - Block comments do not nest. A comment ends at the first `*/`, so
//!   `/* /* x */ */` leaves a trailing `*` and `/` as punctuation.
//!
//! String literals keep their raw text: a backslash only prevents the next
//! character from terminating the literal, it is not unescaped.

use super::token::{Token, TokenKind};
use crate::diagnostics::LexError;

/// Lex `content` into a token list. The trailing END token is not included.
pub fn tokenize(content: &str) -> Result<Vec<Token>, LexError> {
    let mut lexer = Lexer::new(content);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token();
        match token.kind() {
            TokenKind::End => return Ok(tokens),
            TokenKind::Invalid => return Err(lexer.into_error()),
            _ => tokens.push(token),
        }
    }
}

struct Lexer<'a> {
    content: &'a str,
    pos: usize,
    error: Option<LexError>,
}

impl<'a> Lexer<'a> {
    fn new(content: &'a str) -> Self {
        Self {
            content,
            pos: 0,
            error: None,
        }
    }

    fn rest(&self) -> &'a str {
        &self.content[self.pos..]
    }

    fn into_error(self) -> LexError {
        // An INVALID token is only produced after recording why.
        self.error
            .unwrap_or(LexError::UnterminatedString { offset: self.pos })
    }

    fn fail(&mut self, error: LexError) -> Token {
        self.error = Some(error);
        Token::invalid()
    }

    fn next_token(&mut self) -> Token {
        loop {
            self.skip_whitespace();

            let rest = self.rest();
            let Some(c) = rest.chars().next() else {
                return Token::end();
            };

            if c == '"' {
                return self.lex_string();
            }

            if c.is_ascii_digit() {
                let len = rest
                    .find(|ch: char| !ch.is_ascii_digit())
                    .unwrap_or(rest.len());
                self.pos += len;
                return Token::integer(&rest[..len]);
            }

            if c.is_ascii_alphabetic() || c == '_' {
                let len = rest
                    .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_'))
                    .unwrap_or(rest.len());
                self.pos += len;
                return Token::ident(&rest[..len]);
            }

            if rest.starts_with("//") {
                self.pos += 2;
                self.skip_line();
                continue;
            }

            if rest.starts_with("/*") {
                let start = self.pos;
                self.pos += 2;
                match self.rest().find("*/") {
                    Some(len) => self.pos += len + 2,
                    None => {
                        return self.fail(LexError::UnterminatedBlockComment { offset: start });
                    }
                }
                continue;
            }

            self.pos += c.len_utf8();
            return Token::punc(c);
        }
    }

    fn lex_string(&mut self) -> Token {
        let start = self.pos;
        let bytes = self.content.as_bytes();

        // skip opening quote
        self.pos += 1;
        let begin = self.pos;
        while self.pos < bytes.len() && bytes[self.pos] != b'"' {
            if bytes[self.pos] == b'\\' {
                self.pos += 1;
                if self.pos == bytes.len() {
                    return self.fail(LexError::UnterminatedString { offset: start });
                }
            }
            self.pos += 1;
        }
        if self.pos >= bytes.len() {
            return self.fail(LexError::UnterminatedString { offset: start });
        }

        let text = &self.content[begin..self.pos];
        // skip closing quote
        self.pos += 1;
        Token::string(text)
    }

    fn skip_whitespace(&mut self) {
        let skipped = self
            .rest()
            .bytes()
            .take_while(|b| b.is_ascii_whitespace() || *b == 0x0b)
            .count();
        self.pos += skipped;
    }

    /// Skip up to and including the next newline, or to end of input.
    fn skip_line(&mut self) {
        match self.rest().find('\n') {
            Some(len) => self.pos += len + 1,
            None => self.pos = self.content.len(),
        }
    }
}
