//! # Index Module
//!
//! Remembers every file already filed, keyed by content hash, so repeated
//! runs skip what they have seen and date conflicts can be detected.
//!
//! ## Backends
//! - `SqliteIndex` - `media_hashes.db` in the target root
//! - `InMemoryIndex` - for testing and dry runs without a database
//!
//! [`PersistentIndex`] wraps a backend for the duration of a run: it degrades
//! to "always miss" when the database cannot be opened and suppresses writes
//! under dry-run.

mod export;
mod memory;
mod persistent;
mod sqlite;
mod traits;

pub use export::{write_csv, CSV_HEADER};
pub use memory::InMemoryIndex;
pub use persistent::PersistentIndex;
pub use sqlite::SqliteIndex;
pub use traits::IndexBackend;

use crate::core::date::{DateRecord, DateSource};
use crate::core::hasher::ContentHash;
use crate::core::scanner::MediaFile;
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default database file name inside the target root
pub const INDEX_FILE_NAME: &str = "media_hashes.db";

/// Timestamp format used for stored and exported dates
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A filed file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub hash: ContentHash,
    /// Name of the file as it was found in the source
    pub file_name: String,
    /// Where the file lives in the target tree
    pub file_path: PathBuf,
    pub file_size: u64,
    /// `IMAGE`, `VIDEO`, `AUDIO` or `UNKNOWN`
    pub media_type: String,
    pub date_added: NaiveDateTime,
    pub date_taken: Option<NaiveDateTime>,
    pub date_source: Option<DateSource>,
}

impl IndexEntry {
    /// Entry for a file just filed at `destination`
    pub fn for_filed(
        hash: ContentHash,
        file: &MediaFile,
        destination: &Path,
        date: &DateRecord,
    ) -> Self {
        Self {
            hash,
            file_name: file.file_name(),
            file_path: destination.to_path_buf(),
            file_size: file.size,
            media_type: file.kind.index_tag().to_string(),
            date_added: Local::now().naive_local(),
            date_taken: Some(date.taken),
            date_source: Some(date.source),
        }
    }
}

/// Index statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_entries: usize,
    pub distinct_hashes: usize,
    /// `total_entries - distinct_hashes`
    pub duplicate_entries: usize,
    pub earliest_taken: Option<NaiveDateTime>,
    pub latest_taken: Option<NaiveDateTime>,
}

fn format_date(date: &NaiveDateTime) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a stored timestamp, tolerating fractional seconds
fn parse_date(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, DATE_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::NaiveDate;

    pub fn entry(byte: u8, name: &str, path: &str, taken: Option<(i32, u32, u32)>) -> IndexEntry {
        IndexEntry {
            hash: ContentHash::from_bytes([byte; 16]),
            file_name: name.to_string(),
            file_path: PathBuf::from(path),
            file_size: 100 + byte as u64,
            media_type: "IMAGE".to_string(),
            date_added: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            date_taken: taken.map(|(y, m, d)| {
                NaiveDate::from_ymd_opt(y, m, d)
                    .unwrap()
                    .and_hms_opt(10, 30, 0)
                    .unwrap()
            }),
            date_source: taken.map(|_| DateSource::Exif),
        }
    }
}
