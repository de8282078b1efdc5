//! # Organize Module
//!
//! Files media into a date-based folder tree under the target root.
//!
//! ## Layout
//! - `<root>/<YYYY>/<MM-MonthName>/` or `<root>/<YYYY>/<MM-MonthName>/<DD>/`
//! - `<root>/_unknown_date/` and `<root>/_invalid_date/` for undated files
//! - `<root>/_duplicates/` for extra copies found in the source
//!
//! Existing files are never overwritten: a clashing name gets `_1`, `_2`, ...
//! before the extension.

mod executor;
mod planner;
mod types;

pub use executor::{batch_ranges, transfer_file, SortExecutor, DEFAULT_BATCH_SIZE};
pub use planner::{
    generate_unique_path, DestinationPlanner, DUPLICATES_DIR, INVALID_DATE_DIR, UNKNOWN_DATE_DIR,
};
pub use types::*;
