//! Module map lexing and parsing
//!
//! [`lexer::tokenize`] turns file content into tokens and
//! [`parser::parse`] builds the declaration tree in [`ast`].

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::{ConfigMacro, Conflict, Feature, Header, Link, Module, ModuleMap};
pub use token::{Token, TokenKind};
