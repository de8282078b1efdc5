//! Types for the organize module.

use crate::core::date::DateRecord;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Folder granularity of the dated tree
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// Year/Month (e.g., 2023/01-January/)
    #[default]
    Month,
    /// Year/Month/Day (e.g., 2023/01-January/15/)
    Day,
}

impl Layout {
    pub fn name(&self) -> &'static str {
        match self {
            Layout::Month => "by month",
            Layout::Day => "by day",
        }
    }
}

/// Operation mode
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OperationMode {
    /// Move files into the target (source is emptied)
    #[default]
    Move,
    /// Copy files into the target (keep originals)
    Copy,
}

impl OperationMode {
    pub fn name(&self) -> &'static str {
        match self {
            OperationMode::Move => "move",
            OperationMode::Copy => "copy",
        }
    }

    /// Past-tense verb for logs and reports
    pub fn past_tense(&self) -> &'static str {
        match self {
            OperationMode::Move => "Moved",
            OperationMode::Copy => "Copied",
        }
    }
}

/// A file placed in the target tree (or that would be, under dry-run)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiledFile {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub date: DateRecord,
    pub size_bytes: u64,
}

/// Result of filing a single file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortOutcome {
    Filed(FiledFile),
    Failed { source: PathBuf, message: String },
}

impl SortOutcome {
    pub fn is_filed(&self) -> bool {
        matches!(self, SortOutcome::Filed(_))
    }
}
