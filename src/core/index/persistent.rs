//! Run-scoped wrapper around an index backend.

use super::{write_csv, IndexBackend, IndexEntry, IndexStats, InMemoryIndex, SqliteIndex};
use crate::core::hasher::ContentHash;
use crate::error::IndexError;
use std::io::Write;
use std::path::{Path, PathBuf};

/// The index as seen by a sorting run.
///
/// Lookups never fail: a backend error is logged and treated as a miss.
/// Writes are dropped when the index is disabled. Under dry-run they land in
/// an in-memory overlay that later lookups of the same run see, so a preview
/// makes the same decisions as the real run while the database stays as is.
/// The backend (and its database connection) is released when this value is
/// dropped, on every exit path of the run.
pub struct PersistentIndex {
    backend: Option<Box<dyn IndexBackend>>,
    simulated: InMemoryIndex,
    path: Option<PathBuf>,
    dry_run: bool,
}

impl PersistentIndex {
    /// Open the SQLite index at `path` for a run.
    ///
    /// If it cannot be opened the run continues with indexing disabled and a
    /// single warning is logged. A dry run never creates the database: an
    /// existing one is opened read-only, a missing one is replaced by an
    /// empty in-memory index.
    pub fn open(path: &Path, dry_run: bool) -> Self {
        let opened = if dry_run {
            if path.exists() {
                SqliteIndex::open_read_only(path).map(|i| Box::new(i) as Box<dyn IndexBackend>)
            } else {
                Ok(Box::new(InMemoryIndex::new()) as Box<dyn IndexBackend>)
            }
        } else {
            SqliteIndex::open(path).map(|i| Box::new(i) as Box<dyn IndexBackend>)
        };

        match opened {
            Ok(backend) => {
                tracing::info!(path = %path.display(), "Using hash index");
                Self {
                    backend: Some(backend),
                    simulated: InMemoryIndex::new(),
                    path: Some(path.to_path_buf()),
                    dry_run,
                }
            }
            Err(e) => {
                tracing::warn!("{}. Continuing without the hash index.", e);
                Self::disabled()
            }
        }
    }

    /// Wrap an already-open backend
    pub fn with_backend(backend: Box<dyn IndexBackend>, dry_run: bool) -> Self {
        Self {
            backend: Some(backend),
            simulated: InMemoryIndex::new(),
            path: None,
            dry_run,
        }
    }

    /// No index: every lookup misses, every write is ignored
    pub fn disabled() -> Self {
        Self {
            backend: None,
            simulated: InMemoryIndex::new(),
            path: None,
            dry_run: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Database location, when backed by a file
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Find the entry for a hash. Errors degrade to a miss.
    pub fn lookup(&self, hash: &ContentHash) -> Option<IndexEntry> {
        let backend = self.backend.as_ref()?;
        if self.dry_run {
            if let Ok(Some(entry)) = self.simulated.get(hash) {
                return Some(entry);
            }
        }
        match backend.get(hash) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(hash = %hash, "Index lookup failed: {}", e);
                None
            }
        }
    }

    /// Record a filed file. Kept in memory under dry-run, dropped when disabled.
    pub fn upsert(&self, entry: &IndexEntry) -> Result<(), IndexError> {
        match &self.backend {
            Some(_) if self.dry_run => self.simulated.upsert(entry),
            Some(backend) => backend.upsert(entry),
            None => Ok(()),
        }
    }

    /// Statistics, when the index is enabled and readable
    pub fn stats(&self) -> Option<IndexStats> {
        let backend = self.backend.as_ref()?;
        match backend.stats() {
            Ok(stats) => Some(stats),
            Err(e) => {
                tracing::warn!("Could not read index statistics: {}", e);
                None
            }
        }
    }

    /// Drop entries whose file is gone. Under dry-run the stale entries are
    /// only counted.
    pub fn cleanup(&self) -> Result<usize, IndexError> {
        match &self.backend {
            Some(backend) if self.dry_run => Ok(backend
                .entries()?
                .iter()
                .filter(|e| !e.file_path.exists())
                .count()),
            Some(backend) => {
                let removed = backend.cleanup()?;
                tracing::info!(removed, "Removed index entries for missing files");
                Ok(removed)
            }
            None => Ok(0),
        }
    }

    /// Write every entry as CSV. Returns the number of rows.
    pub fn export<W: Write>(&self, sink: W) -> Result<usize, IndexError> {
        match &self.backend {
            Some(backend) => write_csv(&backend.entries()?, sink),
            None => write_csv(&[], sink),
        }
    }
}

impl Drop for PersistentIndex {
    fn drop(&mut self) {
        if let Some(path) = &self.path {
            tracing::debug!(path = %path.display(), "Closing hash index");
        }
    }
}
