//! # media-sort CLI
//!
//! Command-line interface for the media sorter.
//!
//! ## Usage
//! ```bash
//! media-sort sort ~/Camera ~/Pictures/Sorted --dry-run
//! media-sort sort ~/Camera ~/Pictures/Sorted --video --by-day --copy
//! media-sort index ~/Pictures/Sorted/media_hashes.db stats
//! ```

mod cli;

use media_sorter::Result;

fn main() -> Result<()> {
    cli::run()
}
