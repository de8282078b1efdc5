//! # Error Module
//!
//! Error types for the media sorter.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, file names, what went wrong
//! - **Keep going** - per-file failures are recorded, only setup errors abort a run

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum SorterError {
    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Hashing error: {0}")]
    Hash(#[from] HashError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Sorting error: {0}")]
    Sort(#[from] SortError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Output error: {0}")]
    Output(String),
}

/// Errors that occur while enumerating source files
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Permission denied accessing: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read {path}: {source}")]
    ReadEntry {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Scan was cancelled")]
    Cancelled,
}

/// Errors that occur while hashing file content
#[derive(Error, Debug)]
pub enum HashError {
    #[error("Failed to read {path} for hashing: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not start hashing workers: {0}")]
    WorkerPool(String),
}

/// Errors that occur with the persistent hash index
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Failed to open index database at {path}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    #[error("Index query failed: {0}")]
    QueryFailed(String),

    #[error("Index is unusable at {path}. Delete this file and run again.")]
    Corrupted { path: PathBuf },

    #[error("Failed to export index: {0}")]
    ExportFailed(String),
}

/// Errors that occur while filing a single file
#[derive(Error, Debug)]
pub enum SortError {
    #[error("Source file not found: {path}")]
    SourceMissing { path: PathBuf },

    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to transfer {from} -> {to}: {source}")]
    Transfer {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Copy verification failed for {path}: source {expected} bytes, destination {actual} bytes")]
    VerificationFailed {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },
}

/// Errors that occur while writing the run report
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to write report {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, SorterError>;
