//! Time-bounded local cache for index files
//!
//! Entries are raw bytes stored as one file per key. Freshness is judged by
//! the file's modification time against a fixed TTL. A read that fails for
//! any reason is a miss, never an error.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::debug;

use super::{CacheWriteError, PopulationError, Result, DEFAULT_CACHE_TTL};

/// Index cache rooted at a directory
#[derive(Debug, Clone)]
pub struct Cache {
    dir: PathBuf,
    ttl: Duration,
    disabled: bool,
}

impl Cache {
    /// Create a cache with the default TTL
    ///
    /// A disabled cache always misses and silently drops writes.
    pub fn new(dir: impl Into<PathBuf>, disabled: bool) -> Self {
        Self {
            dir: dir.into(),
            ttl: DEFAULT_CACHE_TTL,
            disabled,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    fn entry_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Return the cached bytes for `name` if present and fresh
    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        if self.disabled {
            return None;
        }

        let path = self.entry_path(name);
        let modified = std::fs::metadata(&path).and_then(|m| m.modified()).ok()?;

        // Modification times in the future count as fresh
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);

        if age > self.ttl {
            debug!("Cache expired for {} (age: {:?})", name, age);
            return None;
        }

        let content = std::fs::read(&path).ok()?;
        debug!("Cache hit for {} (age: {:?})", name, age);
        Some(content)
    }

    /// Store bytes under `name`, replacing any previous entry
    pub fn set(&self, name: &str, content: &[u8]) -> std::result::Result<(), CacheWriteError> {
        if self.disabled {
            return Ok(());
        }

        std::fs::create_dir_all(&self.dir).map_err(|source| CacheWriteError {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.entry_path(name);
        std::fs::write(&path, content).map_err(|source| CacheWriteError {
            path: path.clone(),
            source,
        })?;

        debug!("Saved {} to cache: {}", name, path.display());
        Ok(())
    }

    /// Remove a single entry; a missing entry is not an error
    pub fn invalidate(&self, name: &str) -> Result<()> {
        let path = self.entry_path(name);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(PopulationError::CacheClear { path, source }),
        }
    }

    /// Remove the whole cache directory; a missing directory is not an error
    pub fn invalidate_all(&self) -> Result<()> {
        match std::fs::remove_dir_all(&self.dir) {
            Ok(()) => {
                debug!("Cleared cache directory {}", self.dir.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(PopulationError::CacheClear {
                path: self.dir.clone(),
                source,
            }),
        }
    }
}
