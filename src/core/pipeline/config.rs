//! Run configuration.

use crate::core::date::{ValidityWindow, DEFAULT_EARLIEST_YEAR};
use crate::core::duplicates::DuplicatePolicy;
use crate::core::hasher::HashMode;
use crate::core::index::INDEX_FILE_NAME;
use crate::core::organize::{Layout, OperationMode, DEFAULT_BATCH_SIZE};
use crate::core::scanner::{MediaFilter, MediaSelection};
use crate::error::{Result, SorterError};
use chrono::{Datelike, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Every option of a sorting run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SorterConfig {
    pub source: PathBuf,
    pub target: PathBuf,
    pub operation: OperationMode,
    pub layout: Layout,
    /// Compute and log everything, change nothing
    pub dry_run: bool,
    /// Remember filed content across runs
    pub use_index: bool,
    /// Index location; `<target>/media_hashes.db` when unset
    pub index_path: Option<PathBuf>,
    /// Reject dates outside `[earliest_year, now]`
    pub validate_dates: bool,
    pub earliest_year: i32,
    pub duplicates: DuplicatePolicy,
    /// Sampled hashing for large files
    pub turbo: bool,
    /// Skip hashing files with a unique size; defaults to `turbo`
    pub size_prefilter: Option<bool>,
    pub batch: bool,
    pub batch_size: usize,
    pub media: MediaSelection,
    /// Explicit extension list replacing `media`, e.g. `"crw, thm"`
    pub extensions: Option<String>,
    pub include_hidden: bool,
}

impl Default for SorterConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            target: PathBuf::new(),
            operation: OperationMode::default(),
            layout: Layout::default(),
            dry_run: false,
            use_index: true,
            index_path: None,
            validate_dates: true,
            earliest_year: DEFAULT_EARLIEST_YEAR,
            duplicates: DuplicatePolicy::default(),
            turbo: false,
            size_prefilter: None,
            batch: false,
            batch_size: DEFAULT_BATCH_SIZE,
            media: MediaSelection::default(),
            extensions: None,
            include_hidden: false,
        }
    }
}

impl SorterConfig {
    /// Load a JSON config file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            SorterError::Config(format!("cannot read config {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            SorterError::Config(format!("invalid config {}: {}", path.display(), e))
        })
    }

    /// Reject options a run cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.source.as_os_str().is_empty() {
            return Err(SorterError::Config("no source directory given".into()));
        }
        if self.target.as_os_str().is_empty() {
            return Err(SorterError::Config("no target directory given".into()));
        }
        if same_location(&self.source, &self.target) {
            return Err(SorterError::Config(
                "source and target must be different directories".into(),
            ));
        }

        let current_year = Local::now().year();
        if !(1900..=current_year).contains(&self.earliest_year) {
            return Err(SorterError::Config(format!(
                "earliest year must be between 1900 and {}, got {}",
                current_year, self.earliest_year
            )));
        }
        if self.batch_size == 0 {
            return Err(SorterError::Config("batch size must be at least 1".into()));
        }
        if let Some(list) = &self.extensions {
            if MediaFilter::from_custom_list(list).extensions().is_empty() {
                return Err(SorterError::Config(format!(
                    "extension list '{}' names no extensions",
                    list
                )));
            }
        }
        Ok(())
    }

    pub fn hash_mode(&self) -> HashMode {
        if self.turbo {
            HashMode::Turbo
        } else {
            HashMode::Full
        }
    }

    pub fn size_prefilter_enabled(&self) -> bool {
        self.size_prefilter.unwrap_or(self.turbo)
    }

    pub fn index_location(&self) -> PathBuf {
        self.index_path
            .clone()
            .unwrap_or_else(|| self.target.join(INDEX_FILE_NAME))
    }

    pub fn validity_window(&self) -> ValidityWindow {
        if self.validate_dates {
            ValidityWindow::new(self.earliest_year)
        } else {
            ValidityWindow::disabled()
        }
    }

    pub fn media_filter(&self) -> MediaFilter {
        let filter = match &self.extensions {
            Some(list) => MediaFilter::from_custom_list(list),
            None => MediaFilter::new(self.media),
        };
        filter.with_hidden(self.include_hidden)
    }

    /// Batch size in effect, `None` when batching is off
    pub fn effective_batch_size(&self) -> Option<usize> {
        self.batch.then_some(self.batch_size)
    }

    /// Human-readable description of the media selection
    pub fn media_description(&self) -> String {
        match &self.extensions {
            Some(list) => format!("custom ({})", list.trim()),
            None => self.media.describe(),
        }
    }
}

/// Whether two paths name the same directory, comparing canonical forms when
/// both exist
fn same_location(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
