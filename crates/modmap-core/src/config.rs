//! Dependency cache configuration

use crate::file_utils::DEFAULT_MAX_FILE_SIZE;
use crate::fs::RealFileSystem;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for the dependency cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Entries kept before the oldest insertion is evicted
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Files modified within this many milliseconds of a stat are not trusted
    #[serde(default = "default_stale_slack_ms")]
    pub stale_slack_ms: u64,

    /// Module maps larger than this are refused
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

fn default_max_entries() -> usize {
    1024
}

fn default_stale_slack_ms() -> u64 {
    1000
}

fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            stale_slack_ms: default_stale_slack_ms(),
            max_file_size: default_max_file_size(),
        }
    }
}

impl CacheConfig {
    /// Load config from file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load config or use default
    pub fn load_or_default(path: Option<&Path>) -> Self {
        path.and_then(|p| Self::load(p).ok()).unwrap_or_default()
    }

    pub fn stale_slack(&self) -> Duration {
        Duration::from_millis(self.stale_slack_ms)
    }

    /// A real file system honoring `max_file_size`.
    pub fn file_system(&self) -> RealFileSystem {
        RealFileSystem::with_max_file_size(self.max_file_size)
    }
}
