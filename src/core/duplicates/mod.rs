//! # Duplicates Module
//!
//! Finds byte-identical files in the source before sorting.
//!
//! ## How It Works
//! 1. Optional size pre-filter: a file with a unique size cannot have a twin
//! 2. Remaining candidates are hashed on a bounded rayon pool
//! 3. Workers send `(index, hash)` over a channel to a single collector
//! 4. Files sharing a hash form a [`DuplicateGroup`]; the first file in
//!    enumeration order is the original, the rest are extra copies

mod detector;

pub use detector::{filter_by_size, pool_size, DuplicateDetector};

use crate::core::hasher::ContentHash;
use crate::core::scanner::MediaFile;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// What happens to extra copies found in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Move extra copies to `_duplicates/`, sort the original
    #[default]
    Move,
    /// Leave extra copies where they are, sort the original
    Ignore,
    /// Skip detection entirely
    Off,
}

impl DuplicatePolicy {
    pub fn name(&self) -> &'static str {
        match self {
            DuplicatePolicy::Move => "move",
            DuplicatePolicy::Ignore => "ignore",
            DuplicatePolicy::Off => "off",
        }
    }
}

impl std::str::FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "move" => Ok(DuplicatePolicy::Move),
            "ignore" => Ok(DuplicatePolicy::Ignore),
            "off" | "none" => Ok(DuplicatePolicy::Off),
            other => Err(format!("unknown duplicate policy '{}'", other)),
        }
    }
}

/// Files sharing one content hash
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub hash: ContentHash,
    /// Members in enumeration order; always at least two
    pub files: Vec<MediaFile>,
}

impl DuplicateGroup {
    /// The canonical original
    pub fn original(&self) -> &MediaFile {
        &self.files[0]
    }

    /// Every member after the original
    pub fn duplicates(&self) -> &[MediaFile] {
        &self.files[1..]
    }

    /// Bytes that the extra copies occupy
    pub fn wasted_bytes(&self) -> u64 {
        self.duplicates().iter().map(|f| f.size).sum()
    }
}

/// Outcome of a detection pass
#[derive(Debug, Default)]
pub struct DuplicateScan {
    /// Groups with more than one member, ordered by their original
    pub groups: Vec<DuplicateGroup>,
    /// Every hash computed, so later stages need not hash again
    pub hashes: HashMap<PathBuf, ContentHash>,
    /// Files that could not be read, with the reason
    pub failed: Vec<(PathBuf, String)>,
    /// Files excluded by the size pre-filter
    pub skipped_unique_size: usize,
    /// True when cancellation stopped hashing early
    pub cancelled: bool,
}

impl DuplicateScan {
    /// Number of extra copies across all groups
    pub fn duplicate_count(&self) -> usize {
        self.groups.iter().map(|g| g.files.len() - 1).sum()
    }
}
