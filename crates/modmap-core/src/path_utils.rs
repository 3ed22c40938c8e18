//! Lexical path helpers
//!
//! None of these touch the file system. Symlinks are not resolved, so
//! `resolve_path("/a/link/..")` is `/a` even when `link` points elsewhere.

use std::path::{Component, Path, PathBuf};

/// Join `rel` onto `base`, unless `rel` is already absolute.
pub fn join_respect_absolute(base: &Path, rel: &Path) -> PathBuf {
    if is_absolute(rel) {
        rel.to_path_buf()
    } else {
        base.join(rel)
    }
}

/// Directory part of `path`. Empty for a bare file name.
pub fn dirname(path: &Path) -> &Path {
    path.parent().unwrap_or(Path::new(""))
}

pub fn is_absolute(path: &Path) -> bool {
    path.has_root()
}

/// Remove `.` components and fold `..` into the preceding component.
///
/// `..` directly under the root stays at the root. Leading `..` of a relative
/// path is kept.
pub fn resolve_path(path: &Path) -> PathBuf {
    let mut resolved = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match resolved.components().next_back() {
                Some(Component::Normal(_)) => {
                    resolved.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => resolved.push(".."),
            },
            other => resolved.push(other.as_os_str()),
        }
    }

    if resolved.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        resolved
    }
}
