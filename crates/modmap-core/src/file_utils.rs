//! Bounded module map reading
//!
//! Module maps are small declarative files. Reading is refused for anything
//! that is not a regular file (directories, FIFOs, devices) and for files above
//! a size limit, so a bad `extern module` path cannot hang or exhaust the
//! build client.
//!
//! Symlinks are followed: SDKs and toolchains commonly install module maps
//! behind links.

use crate::diagnostics::{ModMapError, ModMapResult};
use std::fs;
use std::path::Path;

/// Default maximum file size (1 MiB = 1,048,576 bytes = 2^20 bytes)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1_048_576;

/// Read a module map with the default size limit.
///
/// # Errors
///
/// Returns `ModMapError::FileNotRegular` if the path is not a regular file.
/// Returns `ModMapError::FileTooBig` if the file exceeds the size limit.
/// Returns `ModMapError::FileRead` for other I/O errors.
pub fn safe_read_file(path: &Path) -> ModMapResult<String> {
    safe_read_file_with_limit(path, DEFAULT_MAX_FILE_SIZE)
}

/// Read a module map with a custom size limit.
///
/// The size limit uses `>` comparison, so files at exactly `max_size` bytes
/// are accepted, while files larger than `max_size` are rejected.
pub fn safe_read_file_with_limit(path: &Path, max_size: u64) -> ModMapResult<String> {
    let metadata = fs::metadata(path).map_err(|e| ModMapError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    if !metadata.is_file() {
        return Err(ModMapError::FileNotRegular {
            path: path.to_path_buf(),
        });
    }

    let size = metadata.len();
    if size > max_size {
        return Err(ModMapError::FileTooBig {
            path: path.to_path_buf(),
            size,
            limit: max_size,
        });
    }

    fs::read_to_string(path).map_err(|e| ModMapError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })
}
