//! Bounded, thread-safe cache of module map dependency lists
//!
//! Keyed by (working directory, absolute root module map). A stored list is
//! served only after every file in it is stat'ed again and found unchanged;
//! results containing a file modified too recently to be trusted are never
//! stored. Eviction is strictly by insertion order.
//!
//! The entry table sits behind one `RwLock`: lookups copy the stored list out
//! under the read lock and revalidate it with no lock held, so slow stats do
//! not block other callers. Counters are independent atomics.

use crate::config::CacheConfig;
use crate::diagnostics::{ModMapError, ModMapResult};
use crate::fs::FileSystem;
use crate::path_utils::{join_respect_absolute, resolve_path};
use crate::resolver::{self, CollectedModuleMapFile};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    cwd: PathBuf,
    module_map: PathBuf,
}

impl CacheKey {
    fn new(root: &Path, cwd: &Path) -> Self {
        Self {
            cwd: cwd.to_path_buf(),
            module_map: resolve_path(&join_respect_absolute(cwd, root)),
        }
    }
}

/// Insertion-ordered entry table.
#[derive(Debug, Default)]
struct Entries {
    map: HashMap<CacheKey, Vec<CollectedModuleMapFile>>,
    order: VecDeque<CacheKey>,
}

impl Entries {
    /// Replaces in place when `key` is present, otherwise appends as newest.
    fn insert(&mut self, key: CacheKey, files: Vec<CollectedModuleMapFile>) {
        if let Some(slot) = self.map.get_mut(&key) {
            *slot = files;
            return;
        }
        self.order.push_back(key.clone());
        self.map.insert(key, files);
    }

    fn pop_oldest(&mut self) -> Option<CacheKey> {
        let key = self.order.pop_front()?;
        self.map.remove(&key);
        Some(key)
    }

    fn len(&self) -> usize {
        self.map.len()
    }
}

/// Outcome of looking a key up and revalidating it.
#[derive(Debug)]
enum Lookup {
    Hit(Vec<CollectedModuleMapFile>),
    Miss(MissReason),
}

#[derive(Debug)]
enum MissReason {
    NotCached,
    /// A recorded file is gone or may have changed.
    Invalidated { path: PathBuf },
}

/// Snapshot of the cumulative counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evicted: u64,
}

/// Process-wide module map dependency cache.
///
/// Construct one at start-up with [`DependencyCache::init`] or
/// [`DependencyCache::with_config`], share it by reference (or `Arc`), and
/// hand it back to [`DependencyCache::shutdown`] at exit.
#[derive(Debug)]
pub struct DependencyCache {
    config: CacheConfig,
    entries: RwLock<Entries>,
    hits: AtomicU64,
    misses: AtomicU64,
    evicted: AtomicU64,
}

impl DependencyCache {
    /// Create a cache holding at most `max_entries` entries, other settings default.
    pub fn init(max_entries: usize) -> Self {
        Self::with_config(CacheConfig {
            max_entries,
            ..CacheConfig::default()
        })
    }

    pub fn with_config(config: CacheConfig) -> Self {
        debug!(
            max_entries = config.max_entries,
            stale_slack_ms = config.stale_slack_ms,
            "module map cache initialized"
        );
        Self {
            config,
            entries: RwLock::new(Entries::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Tear the cache down, returning its final counters.
    pub fn shutdown(self) -> CacheStats {
        let stats = self.stats();
        debug!(
            entries = self.len(),
            hits = stats.hits,
            misses = stats.misses,
            evicted = stats.evicted,
            "module map cache shut down"
        );
        stats
    }

    /// Every module map `root` depends on, itself included, as the paths they
    /// were referenced by (relative to `cwd`, or absolute).
    ///
    /// Served from the cache when no recorded file may have changed.
    /// Otherwise the module maps are resolved afresh, and the result is
    /// stored unless one of the files was modified within the slack window.
    ///
    /// # Errors
    ///
    /// Returns `ModMapError::Unresolvable` wrapping the first read, lex or
    /// parse failure. Nothing is stored in that case.
    pub fn resolve_cached(
        &self,
        root: &Path,
        cwd: &Path,
        fs: &dyn FileSystem,
    ) -> ModMapResult<Vec<String>> {
        let key = CacheKey::new(root, cwd);

        match self.lookup(&key, fs) {
            Lookup::Hit(files) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(module_map = %key.module_map.display(), "module map cache hit");
                return Ok(rel_paths(&files));
            }
            Lookup::Miss(MissReason::NotCached) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(module_map = %key.module_map.display(), "module map cache miss");
            }
            Lookup::Miss(MissReason::Invalidated { path }) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(
                    module_map = %key.module_map.display(),
                    path = %path.display(),
                    "module map cache miss: file changed"
                );
            }
        }

        let collected =
            resolver::resolve(root, cwd, fs).map_err(|e| ModMapError::Unresolvable {
                module_map: key.module_map.clone(),
                source: Box::new(e),
            })?;
        let paths = rel_paths(&collected);

        let slack = self.config.stale_slack();
        if let Some(file) = collected.iter().find(|f| f.file_stat.can_be_stale(slack)) {
            debug!(
                module_map = %key.module_map.display(),
                path = %file.abs_path.display(),
                "not caching: file modified too recently"
            );
            return Ok(paths);
        }

        self.insert(key, collected);
        Ok(paths)
    }

    /// Like [`DependencyCache::resolve_cached`], adding the paths to `include_files`.
    pub fn resolve_cached_into(
        &self,
        root: &Path,
        cwd: &Path,
        fs: &dyn FileSystem,
        include_files: &mut BTreeSet<String>,
    ) -> ModMapResult<()> {
        include_files.extend(self.resolve_cached(root, cwd, fs)?);
        Ok(())
    }

    fn lookup(&self, key: &CacheKey, fs: &dyn FileSystem) -> Lookup {
        let cached = self.read_entries().map.get(key).cloned();
        let Some(files) = cached else {
            return Lookup::Miss(MissReason::NotCached);
        };

        let slack = self.config.stale_slack();
        for file in &files {
            let current = fs.stat(&file.abs_path);
            if !current.is_valid() || current.can_be_newer_than(&file.file_stat, slack) {
                return Lookup::Miss(MissReason::Invalidated {
                    path: file.abs_path.clone(),
                });
            }
        }
        Lookup::Hit(files)
    }

    fn insert(&self, key: CacheKey, files: Vec<CollectedModuleMapFile>) {
        let mut entries = self.write_entries();
        entries.insert(key, files);

        while entries.len() > self.config.max_entries {
            let Some(evicted) = entries.pop_oldest() else {
                break;
            };
            self.evicted.fetch_add(1, Ordering::Relaxed);
            debug!(module_map = %evicted.module_map.display(), "module map cache eviction");
        }
    }

    fn read_entries(&self) -> RwLockReadGuard<'_, Entries> {
        // The table stays consistent if a holder panicked: every mutation is
        // a single insert or pop.
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, Entries> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn cache_hit(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn cache_miss(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn cache_evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.cache_hit(),
            misses: self.cache_miss(),
            evicted: self.cache_evicted(),
        }
    }
}

fn rel_paths(files: &[CollectedModuleMapFile]) -> Vec<String> {
    files.iter().map(|f| f.rel_path.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ParseError;
    use crate::fs::MockFileSystem;
    use std::time::Duration;

    const CWD: &str = "/work";

    fn stats(hits: u64, misses: u64, evicted: u64) -> CacheStats {
        CacheStats {
            hits,
            misses,
            evicted,
        }
    }

    fn resolve(cache: &DependencyCache, fs: &MockFileSystem, root: &str) -> Vec<String> {
        cache
            .resolve_cached(Path::new(root), Path::new(CWD), fs)
            .unwrap()
    }

    fn three_roots() -> MockFileSystem {
        let fs = MockFileSystem::new();
        fs.add_file("/work/foo.modulemap", "module foo {}");
        fs.add_file("/work/bar.modulemap", "module bar {}");
        fs.add_file("/work/baz.modulemap", "module baz {}");
        fs
    }

    #[test]
    fn test_hit_miss_eviction_counts() {
        let fs = three_roots();
        let cache = DependencyCache::init(2);

        resolve(&cache, &fs, "foo.modulemap");
        resolve(&cache, &fs, "bar.modulemap");
        assert_eq!(cache.stats(), stats(0, 2, 0));
        assert_eq!(cache.len(), 2);

        resolve(&cache, &fs, "baz.modulemap");
        assert_eq!(cache.stats(), stats(0, 3, 1));
        assert_eq!(cache.len(), 2);

        // foo was oldest
        resolve(&cache, &fs, "foo.modulemap");
        assert_eq!(cache.stats(), stats(0, 4, 2));

        // foo's return evicted bar; baz is still there
        resolve(&cache, &fs, "baz.modulemap");
        assert_eq!(cache.stats(), stats(1, 4, 2));
    }

    #[test]
    fn test_idempotent_second_call_hits() {
        let fs = MockFileSystem::new();
        fs.add_file("/work/foo.modulemap", "extern module bar \"bar.modulemap\"");
        fs.add_file("/work/bar.modulemap", "module bar { header \"a.h\" }");
        let cache = DependencyCache::init(10);

        let first = resolve(&cache, &fs, "foo.modulemap");
        let second = resolve(&cache, &fs, "foo.modulemap");

        assert_eq!(first, vec!["foo.modulemap", "bar.modulemap"]);
        assert_eq!(first, second);
        assert_eq!(cache.stats(), stats(1, 1, 0));
        assert_eq!(fs.read_count("/work/foo.modulemap"), 1);
    }

    #[test]
    fn test_size_change_invalidates() {
        let fs = MockFileSystem::new();
        fs.add_file("/work/foo.modulemap", "extern module bar \"bar.modulemap\"");
        fs.add_file("/work/bar.modulemap", "module bar {}");
        let cache = DependencyCache::init(10);

        resolve(&cache, &fs, "foo.modulemap");
        resolve(&cache, &fs, "foo.modulemap");
        assert_eq!(cache.stats(), stats(1, 1, 0));

        fs.add_file("/work/bar.modulemap", "module bar { header \"b.h\" }");
        resolve(&cache, &fs, "foo.modulemap");
        assert_eq!(cache.stats(), stats(1, 2, 0));
        assert_eq!(fs.read_count("/work/bar.modulemap"), 2);

        // the refreshed entry is served again
        resolve(&cache, &fs, "foo.modulemap");
        assert_eq!(cache.stats(), stats(2, 2, 0));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_deleted_file_invalidates_and_fails() {
        let fs = MockFileSystem::new();
        fs.add_file("/work/foo.modulemap", "extern module bar \"bar.modulemap\"");
        fs.add_file("/work/bar.modulemap", "module bar {}");
        let cache = DependencyCache::init(10);

        resolve(&cache, &fs, "foo.modulemap");
        fs.remove("/work/bar.modulemap");

        let err = cache
            .resolve_cached(Path::new("foo.modulemap"), Path::new(CWD), &fs)
            .unwrap_err();
        assert!(matches!(err, ModMapError::Unresolvable { .. }));
        assert_eq!(err.path(), &PathBuf::from("/work/bar.modulemap"));
        assert_eq!(cache.stats(), stats(0, 2, 0));
    }

    #[test]
    fn test_recent_mtime_not_cached() {
        let fs = MockFileSystem::new();
        let now = fs.now();
        fs.add_file_with_mtime("/work/foo.modulemap", "module foo {}", now);
        let cache = DependencyCache::init(10);

        resolve(&cache, &fs, "foo.modulemap");
        assert!(cache.is_empty());
        resolve(&cache, &fs, "foo.modulemap");
        assert_eq!(cache.stats(), stats(0, 2, 0));

        // once the slack window has passed the result is stored
        fs.advance(Duration::from_secs(2));
        resolve(&cache, &fs, "foo.modulemap");
        assert_eq!(cache.len(), 1);
        resolve(&cache, &fs, "foo.modulemap");
        assert_eq!(cache.stats(), stats(1, 3, 0));
    }

    #[test]
    fn test_one_recent_dependency_blocks_caching() {
        let fs = MockFileSystem::new();
        fs.add_file("/work/foo.modulemap", "extern module bar \"bar.modulemap\"");
        let now = fs.now();
        fs.add_file_with_mtime(
            "/work/bar.modulemap",
            "module bar {}",
            now - Duration::from_millis(400),
        );
        let cache = DependencyCache::init(10);

        let paths = resolve(&cache, &fs, "foo.modulemap");
        assert_eq!(paths, vec!["foo.modulemap", "bar.modulemap"]);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_custom_slack() {
        let fs = MockFileSystem::new();
        let now = fs.now();
        fs.add_file_with_mtime(
            "/work/foo.modulemap",
            "module foo {}",
            now - Duration::from_secs(5),
        );
        let cache = DependencyCache::with_config(CacheConfig {
            stale_slack_ms: 10_000,
            ..CacheConfig::default()
        });

        resolve(&cache, &fs, "foo.modulemap");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_failure_counts_as_miss_and_stores_nothing() {
        let fs = MockFileSystem::new();
        fs.add_file("/work/foo.modulemap", "module foo {");
        let cache = DependencyCache::init(10);

        let err = cache
            .resolve_cached(Path::new("foo.modulemap"), Path::new(CWD), &fs)
            .unwrap_err();
        match &err {
            ModMapError::Unresolvable { module_map, source } => {
                assert_eq!(module_map, &PathBuf::from("/work/foo.modulemap"));
                assert!(matches!(**source, ModMapError::Parse { .. }));
            }
            other => panic!("Expected Unresolvable, got {:?}", other),
        }
        assert!(err
            .to_string()
            .contains("Could not determine dependencies for module map"));
        assert_eq!(cache.stats(), stats(0, 1, 0));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_reinsert_keeps_insertion_position() {
        let fs = three_roots();
        let cache = DependencyCache::init(2);

        resolve(&cache, &fs, "foo.modulemap");
        resolve(&cache, &fs, "bar.modulemap");

        // invalidate and refresh foo; it stays the oldest entry
        fs.add_file("/work/foo.modulemap", "module foo { }");
        resolve(&cache, &fs, "foo.modulemap");
        assert_eq!(cache.stats(), stats(0, 3, 0));
        assert_eq!(cache.len(), 2);

        resolve(&cache, &fs, "baz.modulemap");
        assert_eq!(cache.stats(), stats(0, 4, 1));

        resolve(&cache, &fs, "bar.modulemap");
        assert_eq!(cache.stats(), stats(1, 4, 1));
    }

    #[test]
    fn test_key_includes_cwd() {
        let fs = MockFileSystem::new();
        fs.add_file("/work/foo.modulemap", "module foo {}");
        let cache = DependencyCache::init(10);

        for cwd in ["/a", "/b", "/a"] {
            cache
                .resolve_cached(Path::new("/work/foo.modulemap"), Path::new(cwd), &fs)
                .unwrap();
        }
        assert_eq!(cache.stats(), stats(1, 2, 0));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_equivalent_root_spellings_share_entry() {
        let fs = MockFileSystem::new();
        fs.add_file("/work/foo.modulemap", "module foo {}");
        let cache = DependencyCache::init(10);

        resolve(&cache, &fs, "foo.modulemap");
        let paths = resolve(&cache, &fs, "./sub/../foo.modulemap");

        assert_eq!(cache.stats(), stats(1, 1, 0));
        // hits report the paths recorded by the first resolution
        assert_eq!(paths, vec!["foo.modulemap"]);
    }

    #[test]
    fn test_zero_capacity_never_holds_entries() {
        let fs = three_roots();
        let cache = DependencyCache::init(0);

        resolve(&cache, &fs, "foo.modulemap");
        resolve(&cache, &fs, "foo.modulemap");
        assert!(cache.is_empty());
        assert_eq!(cache.stats(), stats(0, 2, 2));
    }

    #[test]
    fn test_lookup_names_changed_file() {
        let fs = MockFileSystem::new();
        fs.add_file("/work/foo.modulemap", "extern module bar \"bar.modulemap\"");
        fs.add_file("/work/bar.modulemap", "module bar {}");
        let cache = DependencyCache::init(10);
        let key = CacheKey::new(Path::new("foo.modulemap"), Path::new(CWD));

        assert!(matches!(
            cache.lookup(&key, &fs),
            Lookup::Miss(MissReason::NotCached)
        ));

        resolve(&cache, &fs, "foo.modulemap");
        assert!(matches!(cache.lookup(&key, &fs), Lookup::Hit(_)));

        fs.add_file("/work/bar.modulemap", "module bar { }");
        match cache.lookup(&key, &fs) {
            Lookup::Miss(MissReason::Invalidated { path }) => {
                assert_eq!(path, PathBuf::from("/work/bar.modulemap"))
            }
            other => panic!("Expected Invalidated miss, got {:?}", other),
        }
    }

    #[test]
    fn test_deeply_nested_module_map_is_an_error() {
        let fs = MockFileSystem::new();
        fs.add_file("/work/deep.modulemap", "module a{".repeat(20_000));
        let cache = DependencyCache::init(10);

        let err = cache
            .resolve_cached(Path::new("deep.modulemap"), Path::new(CWD), &fs)
            .unwrap_err();
        match err {
            ModMapError::Unresolvable { source, .. } => assert!(matches!(
                *source,
                ModMapError::Parse {
                    source: ParseError::NestingTooDeep { .. },
                    ..
                }
            )),
            other => panic!("Expected Unresolvable, got {:?}", other),
        }
        assert!(cache.is_empty());
    }

    #[test]
    fn test_resolve_cached_into_set() {
        let fs = MockFileSystem::new();
        fs.add_file("/work/foo.modulemap", "extern module bar \"bar.modulemap\"");
        fs.add_file("/work/bar.modulemap", "module bar {}");
        let cache = DependencyCache::init(10);

        let mut include_files = BTreeSet::new();
        include_files.insert("foo.h".to_string());
        cache
            .resolve_cached_into(
                Path::new("foo.modulemap"),
                Path::new(CWD),
                &fs,
                &mut include_files,
            )
            .unwrap();

        let expected: BTreeSet<String> = ["bar.modulemap", "foo.h", "foo.modulemap"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(include_files, expected);
    }

    #[test]
    fn test_shutdown_returns_final_counters() {
        let fs = three_roots();
        let cache = DependencyCache::init(1);

        resolve(&cache, &fs, "foo.modulemap");
        resolve(&cache, &fs, "bar.modulemap");
        resolve(&cache, &fs, "bar.modulemap");

        assert_eq!(cache.shutdown(), stats(1, 2, 1));
    }

    #[test]
    fn test_concurrent_lookups() {
        use std::sync::Arc;
        use std::thread;

        let fs = Arc::new(MockFileSystem::new());
        fs.add_file("/work/foo.modulemap", "extern module bar \"bar.modulemap\"");
        fs.add_file("/work/bar.modulemap", "module bar {}");
        let cache = Arc::new(DependencyCache::init(4));

        let mut handles = vec![];
        for _ in 0..8 {
            let fs = Arc::clone(&fs);
            let cache = Arc::clone(&cache);
            handles.push(thread::spawn(move || {
                for _ in 0..10 {
                    let paths = cache
                        .resolve_cached(Path::new("foo.modulemap"), Path::new(CWD), &*fs)
                        .unwrap();
                    assert_eq!(paths, vec!["foo.modulemap", "bar.modulemap"]);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let stats = cache.stats();
        assert_eq!(stats.hits + stats.misses, 80);
        assert!(stats.misses >= 1);
        assert_eq!(stats.evicted, 0);
        assert_eq!(cache.len(), 1);
    }
}
