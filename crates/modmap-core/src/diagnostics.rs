//! Error types for lexing, parsing and dependency resolution

use std::path::PathBuf;
use thiserror::Error;

pub type ModMapResult<T> = Result<T, ModMapError>;

/// Lexer failures. Positions are byte offsets into the file content.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("unterminated string literal starting at byte {offset}")]
    UnterminatedString { offset: usize },

    #[error("unterminated block comment starting at byte {offset}")]
    UnterminatedBlockComment { offset: usize },
}

/// Parser failures. Positions are indices into the token sequence.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected {expected}, found {found} at token {position}")]
    Unexpected {
        expected: &'static str,
        found: String,
        position: usize,
    },

    #[error("unexpected trailing {found} at token {position}")]
    TrailingTokens { found: String, position: usize },

    #[error("modules nested too deeply at token {position}")]
    NestingTooDeep { position: usize },
}

/// Errors surfaced by the resolver and the dependency cache
#[derive(Error, Debug)]
pub enum ModMapError {
    #[error("Failed to read file: {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not a regular file: {path}")]
    FileNotRegular { path: PathBuf },

    #[error("File too large: {path} ({size} bytes, limit {limit})")]
    FileTooBig { path: PathBuf, size: u64, limit: u64 },

    #[error("Module map file not found: {path}")]
    MissingFile { path: PathBuf },

    #[error("Module map path is a directory: {path}")]
    IsDirectory { path: PathBuf },

    #[error("Module map path is not valid UTF-8: {path}")]
    NonUtf8Path { path: PathBuf },

    #[error("Failed to lex module map: {path}")]
    Lex {
        path: PathBuf,
        #[source]
        source: LexError,
    },

    #[error("Failed to parse module map: {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("Could not determine dependencies for module map: {module_map}")]
    Unresolvable {
        module_map: PathBuf,
        #[source]
        source: Box<ModMapError>,
    },
}

impl ModMapError {
    /// Path of the file that caused the failure.
    ///
    /// For `Unresolvable` this is the innermost offending file, not the root
    /// module map the caller asked about.
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::FileRead { path, .. }
            | Self::FileNotRegular { path }
            | Self::FileTooBig { path, .. }
            | Self::MissingFile { path }
            | Self::IsDirectory { path }
            | Self::NonUtf8Path { path }
            | Self::Lex { path, .. }
            | Self::Parse { path, .. } => path,
            Self::Unresolvable { source, .. } => source.path(),
        }
    }
}
