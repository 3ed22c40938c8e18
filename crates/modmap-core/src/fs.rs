//! FileSystem abstraction for testability
//!
//! This module provides a `FileSystem` trait covering the two things the
//! resolver and the cache need from the outside world: a stat snapshot of a
//! path and the content of a module map.
//!
//! ## Usage
//!
//! For production code, use `RealFileSystem` which delegates to `std::fs` and
//! the bounded reader in `file_utils`.
//!
//! For tests, use `MockFileSystem` which provides an in-memory HashMap-based
//! storage with `RwLock` for thread safety, a controllable clock, and
//! per-path read counters.
//!
//! ## Staleness
//!
//! A [`FileStat`] records when it was taken. File system timestamps can be
//! coarse (one second on some file systems, delayed on some VMs), so a file
//! whose mtime is within a slack window of that moment may still change
//! without its mtime moving. Such a snapshot is "stale-able" and must not be
//! trusted for caching. See [`FileStat::can_be_stale`] and
//! [`FileStat::can_be_newer_than`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use modmap_core::fs::{FileSystem, MockFileSystem, RealFileSystem};
//! use std::path::Path;
//!
//! // In production code
//! let fs = RealFileSystem::default();
//! assert!(fs.stat(Path::new("Cargo.toml")).is_valid());
//!
//! // In tests
//! let mock_fs = MockFileSystem::new();
//! mock_fs.add_file("/src/module.modulemap", "module foo {}");
//! assert!(mock_fs.stat(Path::new("/src/module.modulemap")).is_valid());
//! ```

use crate::diagnostics::{ModMapError, ModMapResult};
use crate::file_utils::{safe_read_file_with_limit, DEFAULT_MAX_FILE_SIZE};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::{Duration, SystemTime};

/// Snapshot of a path's existence, kind, size and modification time.
#[derive(Debug, Clone)]
pub struct FileStat {
    pub exists: bool,
    pub is_directory: bool,
    /// File size in bytes
    pub size: u64,
    pub mtime: Option<SystemTime>,
    /// When the snapshot was taken. Never later than the underlying stat call.
    pub taken_at: SystemTime,
}

impl FileStat {
    pub fn missing(taken_at: SystemTime) -> Self {
        Self {
            exists: false,
            is_directory: false,
            size: 0,
            mtime: None,
            taken_at,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.exists && self.mtime.is_some()
    }

    /// Same existence, kind, size and mtime. `taken_at` is ignored.
    ///
    /// Only meaningful for two snapshots of the same path.
    pub fn same_snapshot(&self, other: &FileStat) -> bool {
        self.exists == other.exists
            && self.is_directory == other.is_directory
            && self.size == other.size
            && self.mtime == other.mtime
    }

    /// The file may have changed after this snapshot without its mtime
    /// moving: `mtime + slack >= taken_at`.
    pub fn can_be_stale(&self, slack: Duration) -> bool {
        mtime_within_slack(self.mtime, slack, self.taken_at)
    }

    /// Whether the file seen in `self` (the current snapshot) may differ from
    /// the one recorded in `old`.
    ///
    /// True when `old`'s mtime is within `slack` of the time `self` was taken,
    /// or when the two snapshots differ.
    pub fn can_be_newer_than(&self, old: &FileStat, slack: Duration) -> bool {
        mtime_within_slack(old.mtime, slack, self.taken_at) || !self.same_snapshot(old)
    }
}

fn mtime_within_slack(mtime: Option<SystemTime>, slack: Duration, now: SystemTime) -> bool {
    match mtime {
        Some(mtime) => mtime.checked_add(slack).map_or(true, |t| t >= now),
        None => true,
    }
}

/// Trait for abstracting file system operations.
///
/// This trait must be `Send + Sync` so one provider can serve concurrent
/// cache lookups. It also requires `Debug` for use in structs that derive
/// Debug.
pub trait FileSystem: Send + Sync + std::fmt::Debug {
    /// Stat a path (follows symlinks). A missing path yields a snapshot with
    /// `exists == false` rather than an error.
    fn stat(&self, path: &Path) -> FileStat;

    /// Read a module map's content.
    fn read_to_string(&self, path: &Path) -> ModMapResult<String>;
}

/// Real file system implementation that delegates to `std::fs` and `file_utils`.
#[derive(Debug, Clone, Copy)]
pub struct RealFileSystem {
    max_file_size: u64,
}

impl RealFileSystem {
    pub fn with_max_file_size(max_file_size: u64) -> Self {
        Self { max_file_size }
    }
}

impl Default for RealFileSystem {
    fn default() -> Self {
        Self::with_max_file_size(DEFAULT_MAX_FILE_SIZE)
    }
}

impl FileSystem for RealFileSystem {
    fn stat(&self, path: &Path) -> FileStat {
        let taken_at = SystemTime::now();
        match std::fs::metadata(path) {
            Ok(meta) => FileStat {
                exists: true,
                is_directory: meta.is_dir(),
                size: meta.len(),
                mtime: meta.modified().ok(),
                taken_at,
            },
            Err(_) => FileStat::missing(taken_at),
        }
    }

    fn read_to_string(&self, path: &Path) -> ModMapResult<String> {
        safe_read_file_with_limit(path, self.max_file_size)
    }
}

/// Mock entry type for the in-memory file system.
#[derive(Debug, Clone)]
enum MockEntry {
    File { content: String, mtime: SystemTime },
    Directory { mtime: SystemTime },
}

/// Mock file system for testing.
///
/// Provides an in-memory HashMap-based storage with `RwLock` for thread safety.
/// The clock starts at a fixed instant and only moves through
/// [`MockFileSystem::set_now`] or [`MockFileSystem::advance`]. Files added
/// with [`MockFileSystem::add_file`] get an mtime well outside any slack
/// window, so they are cacheable unless a test says otherwise.
#[derive(Debug)]
pub struct MockFileSystem {
    entries: RwLock<HashMap<PathBuf, MockEntry>>,
    reads: RwLock<HashMap<PathBuf, usize>>,
    now: RwLock<SystemTime>,
}

impl Default for MockFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFileSystem {
    /// Age given to files added without an explicit mtime.
    pub const DEFAULT_FILE_AGE: Duration = Duration::from_secs(60);

    /// Create a new empty mock file system
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            reads: RwLock::new(HashMap::new()),
            now: RwLock::new(SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)),
        }
    }

    pub fn now(&self) -> SystemTime {
        *self.now.read().expect("MockFileSystem lock poisoned")
    }

    pub fn set_now(&self, now: SystemTime) {
        *self.now.write().expect("MockFileSystem lock poisoned") = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write().expect("MockFileSystem lock poisoned");
        *now += by;
    }

    /// Add (or overwrite) a file whose mtime is `DEFAULT_FILE_AGE` in the past
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<String>) {
        let mtime = self.now() - Self::DEFAULT_FILE_AGE;
        self.add_file_with_mtime(path, content, mtime);
    }

    /// Add (or overwrite) a file with an explicit mtime
    pub fn add_file_with_mtime(
        &self,
        path: impl AsRef<Path>,
        content: impl Into<String>,
        mtime: SystemTime,
    ) {
        let path = normalize_mock_path(path.as_ref());
        let mut entries = self.entries.write().expect("MockFileSystem lock poisoned");
        entries.insert(
            path,
            MockEntry::File {
                content: content.into(),
                mtime,
            },
        );
    }

    /// Add a directory
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = normalize_mock_path(path.as_ref());
        let mtime = self.now() - Self::DEFAULT_FILE_AGE;
        let mut entries = self.entries.write().expect("MockFileSystem lock poisoned");
        entries.insert(path, MockEntry::Directory { mtime });
    }

    /// Remove an entry
    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = normalize_mock_path(path.as_ref());
        let mut entries = self.entries.write().expect("MockFileSystem lock poisoned");
        entries.remove(&path);
    }

    /// Clear all entries and read counters
    pub fn clear(&self) {
        self.entries
            .write()
            .expect("MockFileSystem lock poisoned")
            .clear();
        self.reads
            .write()
            .expect("MockFileSystem lock poisoned")
            .clear();
    }

    /// Number of successful `read_to_string` calls for `path`
    pub fn read_count(&self, path: impl AsRef<Path>) -> usize {
        let path = normalize_mock_path(path.as_ref());
        let reads = self.reads.read().expect("MockFileSystem lock poisoned");
        reads.get(&path).copied().unwrap_or(0)
    }

    fn get_entry(&self, path: &Path) -> Option<MockEntry> {
        let path = normalize_mock_path(path);
        let entries = self.entries.read().expect("MockFileSystem lock poisoned");
        entries.get(&path).cloned()
    }
}

/// Normalize a path for mock file system storage.
/// Converts backslashes to forward slashes for cross-platform consistency.
fn normalize_mock_path(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    PathBuf::from(path_str.replace('\\', "/"))
}

impl FileSystem for MockFileSystem {
    fn stat(&self, path: &Path) -> FileStat {
        let taken_at = self.now();
        match self.get_entry(path) {
            None => FileStat::missing(taken_at),
            Some(MockEntry::File { content, mtime }) => FileStat {
                exists: true,
                is_directory: false,
                size: content.len() as u64,
                mtime: Some(mtime),
                taken_at,
            },
            Some(MockEntry::Directory { mtime }) => FileStat {
                exists: true,
                is_directory: true,
                size: 0,
                mtime: Some(mtime),
                taken_at,
            },
        }
    }

    fn read_to_string(&self, path: &Path) -> ModMapResult<String> {
        match self.get_entry(path) {
            Some(MockEntry::File { content, .. }) => {
                let mut reads = self.reads.write().expect("MockFileSystem lock poisoned");
                *reads.entry(normalize_mock_path(path)).or_insert(0) += 1;
                Ok(content)
            }
            Some(MockEntry::Directory { .. }) => Err(ModMapError::FileNotRegular {
                path: path.to_path_buf(),
            }),
            None => Err(ModMapError::FileRead {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::NotFound, "file not found"),
            }),
        }
    }
}
