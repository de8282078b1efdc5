//! # Pipeline Module
//!
//! Orchestrates one sorting run.
//!
//! ## Pipeline Stages
//! 1. **Scan** - Enumerate media files under the source, in sorted order
//! 2. **Detect** - Group byte-identical files (optional)
//! 3. **Handle duplicates** - Set extra copies aside or leave them in place
//! 4. **Sort** - Index lookup, conflict resolution, date resolution, filing
//! 5. **Report** - Write `sort_report.txt` into the target
//!
//! The index is opened when a run starts and released when it ends, on every
//! exit path. Cancellation is checked between files.

mod cancel;
mod config;
mod executor;

pub use cancel::CancellationToken;
pub use config::SorterConfig;
pub use executor::{FileFailure, Pipeline, PipelineBuilder, RunOutcome, SetAside};
