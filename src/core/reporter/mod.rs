//! # Reporter Module
//!
//! Writes the plain-text run report, `sort_report.txt`, into the target root.
//!
//! ## Sections
//! 1. Header: timestamp, source, target
//! 2. Options the run used
//! 3. Counts
//! 4. Index statistics (when the index is enabled)
//! 5. Lists: duplicate groups, undated files, skipped files, date
//!    conflicts, failures, and every `source -> destination` pair

mod text;

pub use text::render_report;

use crate::core::pipeline::RunOutcome;
use crate::error::ReportError;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Report file name inside the target root
pub const REPORT_FILE_NAME: &str = "sort_report.txt";

/// Write the report for `outcome` into `target`. Returns the report path.
pub fn write_report(outcome: &RunOutcome, target: &Path) -> Result<PathBuf, ReportError> {
    let path = target.join(REPORT_FILE_NAME);
    let write_err = |source: std::io::Error| ReportError::Write {
        path: path.clone(),
        source,
    };

    std::fs::create_dir_all(target).map_err(write_err)?;
    let file = File::create(&path).map_err(write_err)?;
    render_report(outcome, BufWriter::new(file)).map_err(write_err)?;
    Ok(path)
}

/// Human-readable byte count
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
