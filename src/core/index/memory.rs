//! In-memory index backend for testing and database-less dry runs.

use super::{IndexBackend, IndexEntry, IndexStats};
use crate::core::hasher::ContentHash;
use crate::error::IndexError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory index backend
pub struct InMemoryIndex {
    entries: RwLock<HashMap<ContentHash, IndexEntry>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<ContentHash, IndexEntry>>, IndexError> {
        self.entries.read().map_err(|_| IndexError::Corrupted {
            path: PathBuf::from("memory"),
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<ContentHash, IndexEntry>>, IndexError> {
        self.entries.write().map_err(|_| IndexError::Corrupted {
            path: PathBuf::from("memory"),
        })
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexBackend for InMemoryIndex {
    fn get(&self, hash: &ContentHash) -> Result<Option<IndexEntry>, IndexError> {
        Ok(self.read()?.get(hash).cloned())
    }

    fn upsert(&self, entry: &IndexEntry) -> Result<(), IndexError> {
        self.write()?.insert(entry.hash, entry.clone());
        Ok(())
    }

    fn remove(&self, hash: &ContentHash) -> Result<bool, IndexError> {
        Ok(self.write()?.remove(hash).is_some())
    }

    fn update_path(&self, hash: &ContentHash, new_path: &Path) -> Result<bool, IndexError> {
        match self.write()?.get_mut(hash) {
            Some(entry) => {
                entry.file_path = new_path.to_path_buf();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn entries(&self) -> Result<Vec<IndexEntry>, IndexError> {
        let mut entries: Vec<IndexEntry> = self.read()?.values().cloned().collect();
        entries.sort_by(|a, b| {
            a.date_taken
                .cmp(&b.date_taken)
                .then_with(|| a.file_name.cmp(&b.file_name))
        });
        Ok(entries)
    }

    fn stats(&self) -> Result<IndexStats, IndexError> {
        let entries = self.read()?;
        let taken = entries.values().filter_map(|e| e.date_taken);

        Ok(IndexStats {
            total_entries: entries.len(),
            distinct_hashes: entries.len(),
            duplicate_entries: 0,
            earliest_taken: taken.clone().min(),
            latest_taken: taken.max(),
        })
    }

    fn cleanup(&self) -> Result<usize, IndexError> {
        let mut entries = self.write()?;
        let before = entries.len();
        entries.retain(|_, entry| entry.file_path.exists());
        Ok(before - entries.len())
    }
}
