//! # modmap-core
//!
//! Dependency discovery for Clang-style module maps.
//!
//! Given a root module map, finds every module map file it depends on
//! (itself plus everything reached through `extern module` declarations)
//! and caches the answer across compilations:
//!
//! - [`parsers`]: lexer, recursive-descent parser and declaration tree
//! - [`resolver`]: cycle-safe transitive `extern module` walk
//! - [`cache`]: bounded, thread-safe cache that revalidates file stats
//!
//! ```rust,ignore
//! use modmap_core::{CacheConfig, DependencyCache};
//! use std::path::Path;
//!
//! let config = CacheConfig::default();
//! let fs = config.file_system();
//! let cache = DependencyCache::with_config(config);
//!
//! let files = cache.resolve_cached(
//!     Path::new("include/module.modulemap"),
//!     Path::new("/src/project"),
//!     &fs,
//! )?;
//! ```

pub mod cache;
pub mod config;
pub mod diagnostics;
pub mod file_utils;
pub mod fs;
pub mod parsers;
pub mod path_utils;
pub mod resolver;

pub use cache::{CacheStats, DependencyCache};
pub use config::CacheConfig;
pub use diagnostics::{LexError, ModMapError, ModMapResult, ParseError};
pub use fs::{FileStat, FileSystem, MockFileSystem, RealFileSystem};
pub use parsers::{ModuleMap, Token};
pub use resolver::{resolve, CollectedModuleMapFile, DependencyResolver};

/// Lex and parse module map content in one step.
///
/// # Errors
///
/// Returns `ModMapError::Lex` or `ModMapError::Parse` carrying `path`.
pub fn parse_module_map(path: &std::path::Path, content: &str) -> ModMapResult<ModuleMap> {
    let tokens = parsers::lexer::tokenize(content).map_err(|source| ModMapError::Lex {
        path: path.to_path_buf(),
        source,
    })?;
    parsers::parser::parse(&tokens).map_err(|source| ModMapError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
