//! Index backend trait definition.

use super::{IndexEntry, IndexStats};
use crate::core::hasher::ContentHash;
use crate::error::IndexError;
use chrono::NaiveDate;
use std::path::Path;

/// Storage for content-hash records
///
/// At most one entry exists per hash; `upsert` replaces.
pub trait IndexBackend: Send + Sync {
    /// Fetch the entry for a hash
    fn get(&self, hash: &ContentHash) -> Result<Option<IndexEntry>, IndexError>;

    /// Insert or replace the entry for `entry.hash`
    fn upsert(&self, entry: &IndexEntry) -> Result<(), IndexError>;

    /// Delete one entry. Returns whether it existed.
    fn remove(&self, hash: &ContentHash) -> Result<bool, IndexError>;

    /// Repoint an entry at a new location. Returns whether it existed.
    fn update_path(&self, hash: &ContentHash, new_path: &Path) -> Result<bool, IndexError>;

    /// All entries, ordered by `date_taken` then `file_name`
    fn entries(&self) -> Result<Vec<IndexEntry>, IndexError>;

    /// Entries whose file name contains `fragment` (case-insensitive)
    fn search_by_name(&self, fragment: &str) -> Result<Vec<IndexEntry>, IndexError> {
        let needle = fragment.to_lowercase();
        Ok(self
            .entries()?
            .into_iter()
            .filter(|e| e.file_name.to_lowercase().contains(&needle))
            .collect())
    }

    /// Entries taken on a calendar day in `[start, end]`
    fn search_by_date(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<IndexEntry>, IndexError> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(|e| {
                e.date_taken
                    .map(|d| (start..=end).contains(&d.date()))
                    .unwrap_or(false)
            })
            .collect())
    }

    /// Aggregate statistics
    fn stats(&self) -> Result<IndexStats, IndexError>;

    /// Remove entries whose file no longer exists
    ///
    /// Returns the number of entries removed.
    fn cleanup(&self) -> Result<usize, IndexError>;
}
