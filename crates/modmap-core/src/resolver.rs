//! Transitive `extern module` discovery
//!
//! Starting from a root module map, every file reachable through
//! `extern module` declarations is stat'ed, read, lexed and parsed exactly
//! once. Extern filenames are relative to the directory of the module map
//! that names them, not to the working directory.
//!
//! Any failure aborts the whole resolution: a partial list would make a
//! cache key that misses files.

use crate::diagnostics::{ModMapError, ModMapResult};
use crate::fs::{FileStat, FileSystem};
use crate::parsers::{lexer, parser};
use crate::path_utils::{dirname, join_respect_absolute, resolve_path};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{trace, warn};

/// One module map file that a resolution depends on.
#[derive(Debug, Clone)]
pub struct CollectedModuleMapFile {
    /// Path as referenced: relative to the working directory, or absolute.
    pub rel_path: String,
    pub abs_path: PathBuf,
    pub file_stat: FileStat,
}

/// Collect `root` and every module map it transitively references.
///
/// Files are returned in discovery order: the root first, then each extern
/// reference depth first as it appears in the parsed declarations.
pub fn resolve(
    root: &Path,
    cwd: &Path,
    fs: &dyn FileSystem,
) -> ModMapResult<Vec<CollectedModuleMapFile>> {
    let mut resolver = DependencyResolver::new(cwd, fs);
    resolver.add_module_map_file(root)?;
    Ok(resolver.into_collected())
}

/// Single-use resolution state. The visited set lives only as long as one
/// call to [`resolve`].
#[derive(Debug)]
pub struct DependencyResolver<'a> {
    cwd: &'a Path,
    fs: &'a dyn FileSystem,
    visited: HashSet<PathBuf>,
    collected: Vec<CollectedModuleMapFile>,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(cwd: &'a Path, fs: &'a dyn FileSystem) -> Self {
        Self {
            cwd,
            fs,
            visited: HashSet::new(),
            collected: Vec::new(),
        }
    }

    /// Add `module_map` (relative to the working directory, or absolute) and
    /// everything it references. Already-visited files are a no-op.
    pub fn add_module_map_file(&mut self, module_map: &Path) -> ModMapResult<()> {
        let Some(rel_path) = module_map.to_str() else {
            warn!(path = %module_map.display(), "module map path is not valid UTF-8");
            return Err(ModMapError::NonUtf8Path {
                path: module_map.to_path_buf(),
            });
        };

        let abs_path = resolve_path(&join_respect_absolute(self.cwd, module_map));
        if self.visited.contains(&abs_path) {
            trace!(path = %abs_path.display(), "module map already visited");
            return Ok(());
        }

        let file_stat = self.fs.stat(&abs_path);
        if !file_stat.is_valid() {
            warn!(path = %abs_path.display(), "failed to read module map");
            return Err(ModMapError::MissingFile { path: abs_path });
        }
        if file_stat.is_directory {
            warn!(path = %abs_path.display(), "failed to read module map");
            return Err(ModMapError::IsDirectory { path: abs_path });
        }

        trace!(path = %abs_path.display(), "visiting module map");
        self.collected.push(CollectedModuleMapFile {
            rel_path: rel_path.to_string(),
            abs_path: abs_path.clone(),
            file_stat,
        });
        self.visited.insert(abs_path.clone());

        let content = self.fs.read_to_string(&abs_path).map_err(|e| {
            warn!(path = %abs_path.display(), error = %e, "failed to read module map");
            e
        })?;

        let tokens = lexer::tokenize(&content).map_err(|source| {
            warn!(path = %abs_path.display(), error = %source, "failed to run lexing");
            ModMapError::Lex {
                path: abs_path.clone(),
                source,
            }
        })?;

        let module_map_decls = parser::parse(&tokens).map_err(|source| {
            warn!(path = %abs_path.display(), error = %source, "failed to run parsing");
            ModMapError::Parse {
                path: abs_path.clone(),
                source,
            }
        })?;

        let module_map_dir = dirname(module_map);
        for extern_filename in module_map_decls.extern_filenames() {
            let rel_path = join_respect_absolute(module_map_dir, Path::new(extern_filename));
            self.add_module_map_file(&rel_path)?;
        }

        Ok(())
    }

    pub fn collected(&self) -> &[CollectedModuleMapFile] {
        &self.collected
    }

    pub fn into_collected(self) -> Vec<CollectedModuleMapFile> {
        self.collected
    }
}
