//! Destination path computation.

use super::types::Layout;
use crate::core::date::{DateRecord, DateSource};
use chrono::Datelike;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Folder for files without any usable date
pub const UNKNOWN_DATE_DIR: &str = "_unknown_date";
/// Folder for files whose only dates fell outside the validity window
pub const INVALID_DATE_DIR: &str = "_invalid_date";
/// Folder receiving extra copies found in the source
pub const DUPLICATES_DIR: &str = "_duplicates";

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Maps a date record to a location under the target root
#[derive(Debug, Clone)]
pub struct DestinationPlanner {
    root: PathBuf,
    layout: Layout,
}

impl DestinationPlanner {
    pub fn new(root: impl Into<PathBuf>, layout: Layout) -> Self {
        Self {
            root: root.into(),
            layout,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Folder for a date record, relative to the root
    pub fn relative_folder(&self, date: &DateRecord) -> PathBuf {
        match date.source {
            DateSource::Unknown => PathBuf::from(UNKNOWN_DATE_DIR),
            DateSource::Invalid => PathBuf::from(INVALID_DATE_DIR),
            DateSource::Filename | DateSource::Exif | DateSource::Metadata => {
                let taken = date.taken;
                let month = taken.month();
                let mut folder = PathBuf::from(format!("{:04}", taken.year()));
                folder.push(format!("{:02}-{}", month, MONTH_NAMES[(month - 1) as usize]));
                if self.layout == Layout::Day {
                    folder.push(format!("{:02}", taken.day()));
                }
                folder
            }
        }
    }

    /// Preferred destination, before collision avoidance
    pub fn target_for(&self, date: &DateRecord, file_name: &str) -> PathBuf {
        self.root.join(self.relative_folder(date)).join(file_name)
    }

    /// Preferred destination inside the duplicates folder
    pub fn duplicate_target(&self, file_name: &str) -> PathBuf {
        self.root.join(DUPLICATES_DIR).join(file_name)
    }
}

/// First free variant of `path`: the path itself, then `stem_1.ext`,
/// `stem_2.ext`, ...
///
/// A path is taken if it exists on disk or appears in `claimed`, which holds
/// destinations already handed out during the current run.
pub fn generate_unique_path(path: &Path, claimed: &HashSet<PathBuf>) -> PathBuf {
    let taken = |p: &Path| p.exists() || claimed.contains(p);
    if !taken(path) {
        return path.to_path_buf();
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parent = path.parent().unwrap_or(Path::new(""));

    let mut counter = 1;
    loop {
        let new_name = if ext.is_empty() {
            format!("{}_{}", stem, counter)
        } else {
            format!("{}_{}.{}", stem, counter, ext)
        };
        let candidate = parent.join(new_name);
        if !taken(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}
