//! # Core Module
//!
//! The front-end-agnostic sorting engine.
//!
//! ## Modules
//! - `scanner` - Enumerates media files and classifies them by extension
//! - `hasher` - Content hashes (full read or turbo sampling)
//! - `metadata` - Reads embedded capture dates (EXIF)
//! - `date` - Decides the authoritative date of a file
//! - `index` - Remembers filed content across runs
//! - `duplicates` - Finds identical files in the source
//! - `conflict` - Reconciles indexed content that reappears with another date
//! - `organize` - Computes destinations and moves or copies files
//! - `pipeline` - Orchestrates a run
//! - `reporter` - Writes the run report

pub mod conflict;
pub mod date;
pub mod duplicates;
pub mod hasher;
pub mod index;
pub mod metadata;
pub mod organize;
pub mod pipeline;
pub mod reporter;
pub mod scanner;

// Re-export commonly used types
pub use date::{DateRecord, DateSource};
pub use duplicates::{DuplicateGroup, DuplicatePolicy};
pub use hasher::{ContentHash, HashMode};
pub use index::{IndexEntry, PersistentIndex};
pub use organize::{Layout, OperationMode};
pub use pipeline::{CancellationToken, Pipeline, RunOutcome, SorterConfig};
pub use scanner::{MediaFile, MediaKind};
