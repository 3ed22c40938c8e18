//! Lexical tokens of the module map language

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Ident,
    String,
    Integer,
    Punc,
    /// End of input. Never appears in a lexed token list.
    End,
    /// Hard lexing failure. Never appears in a lexed token list.
    Invalid,
}

/// A single token. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    kind: TokenKind,
    text: String,
}

impl Token {
    pub fn ident(text: impl Into<String>) -> Self {
        Self::new(TokenKind::Ident, text.into())
    }

    pub fn string(text: impl Into<String>) -> Self {
        Self::new(TokenKind::String, text.into())
    }

    pub fn integer(text: impl Into<String>) -> Self {
        Self::new(TokenKind::Integer, text.into())
    }

    pub fn punc(c: char) -> Self {
        Self::new(TokenKind::Punc, c.to_string())
    }

    pub fn end() -> Self {
        Self::new(TokenKind::End, String::new())
    }

    pub fn invalid() -> Self {
        Self::new(TokenKind::Invalid, String::new())
    }

    fn new(kind: TokenKind, text: String) -> Self {
        Self { kind, text }
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_ident(&self, ident: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == ident
    }

    /// True if this is an identifier equal to one of `idents`.
    pub fn is_ident_of(&self, idents: &[&str]) -> bool {
        self.kind == TokenKind::Ident && idents.contains(&self.text.as_str())
    }

    pub fn is_punc(&self, c: char) -> bool {
        self.kind == TokenKind::Punc && self.text.starts_with(c)
    }

    pub fn is_integer(&self, s: &str) -> bool {
        self.kind == TokenKind::Integer && self.text == s
    }

    pub fn is_string(&self, s: &str) -> bool {
        self.kind == TokenKind::String && self.text == s
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Ident => write!(f, "IDENT({})", self.text),
            TokenKind::String => write!(f, "STRING(\"{}\")", self.text),
            TokenKind::Integer => write!(f, "INTEGER({})", self.text),
            TokenKind::Punc => write!(f, "PUNC({})", self.text),
            TokenKind::End => f.write_str("END"),
            TokenKind::Invalid => f.write_str("INVALID"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ident_predicates() {
        let token = Token::ident("foo");
        assert_eq!(token.kind(), TokenKind::Ident);

        assert!(token.is_ident("foo"));
        assert!(!token.is_ident("bar"));
        assert!(!token.is_punc('*'));
        assert!(!token.is_integer("123"));
        assert!(!token.is_string("foo"));

        assert!(token.is_ident_of(&["foo", "bar"]));
        assert!(!token.is_ident_of(&["bar"]));
        assert!(!token.is_ident_of(&[]));
    }

    #[test]
    fn test_string_is_not_ident() {
        let token = Token::string("foo");
        assert_eq!(token.kind(), TokenKind::String);

        assert!(!token.is_ident("foo"));
        assert!(!token.is_ident_of(&["foo"]));
        assert!(token.is_string("foo"));
        assert!(!token.is_string("bar"));
    }

    #[test]
    fn test_integer_predicates() {
        let token = Token::integer("123");
        assert!(token.is_integer("123"));
        assert!(!token.is_integer("321"));
        assert!(!token.is_ident("123"));
        assert!(!token.is_string("123"));
    }

    #[test]
    fn test_punc_predicates() {
        let token = Token::punc('*');
        assert_eq!(token.kind(), TokenKind::Punc);
        assert_eq!(token.text(), "*");

        assert!(token.is_punc('*'));
        assert!(!token.is_punc('!'));
        assert!(!token.is_ident("*"));
    }

    #[test]
    fn test_sentinels_match_nothing() {
        for token in [Token::end(), Token::invalid()] {
            assert!(token.text().is_empty());
            assert!(!token.is_ident("foo"));
            assert!(!token.is_punc('*'));
            assert!(!token.is_integer("123"));
            assert!(!token.is_string("foo"));
            assert!(!token.is_ident_of(&["foo", "bar"]));
        }
        assert_eq!(Token::end().kind(), TokenKind::End);
        assert_eq!(Token::invalid().kind(), TokenKind::Invalid);
    }

    #[test]
    fn test_display() {
        assert_eq!(Token::ident("std").to_string(), "IDENT(std)");
        assert_eq!(Token::string("a.h").to_string(), "STRING(\"a.h\")");
        assert_eq!(Token::punc('{').to_string(), "PUNC({)");
        assert_eq!(Token::end().to_string(), "END");
    }
}
