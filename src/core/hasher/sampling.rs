//! Turbo-mode sampling plan.
//!
//! Large media files are identified from a few slices instead of every byte:
//!
//! | size              | bytes hashed                              |
//! |-------------------|-------------------------------------------|
//! | `< 1 MiB`         | whole file                                |
//! | `1 MiB ..< 50 MiB`| first 1 MiB                               |
//! | `>= 50 MiB`       | 512 KiB at start, middle and end          |

/// Files below this size are always hashed in full
pub const SMALL_THRESHOLD: u64 = 1024 * 1024;

/// Files at or above this size are hashed from three samples
pub const MEDIUM_THRESHOLD: u64 = 50 * 1024 * 1024;

/// Length of the prefix hashed for medium files
pub const PREFIX_LEN: u64 = 1024 * 1024;

/// Length of each sample for large files
pub const SAMPLE_LEN: u64 = 512 * 1024;

/// Which bytes of a file feed the digest
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SamplePlan {
    /// Every byte, front to back
    Whole,
    /// `(offset, len)` ranges, hashed in order
    Ranges(Vec<(u64, u64)>),
}

impl SamplePlan {
    /// Plan for a turbo hash of a file of `size` bytes
    pub fn turbo(size: u64) -> Self {
        if size < SMALL_THRESHOLD {
            return SamplePlan::Whole;
        }
        if size < MEDIUM_THRESHOLD {
            return SamplePlan::Ranges(vec![(0, PREFIX_LEN.min(size))]);
        }

        let mut ranges = vec![(0, SAMPLE_LEN)];
        let mut covered_to = SAMPLE_LEN;

        let middle = (size / 2).saturating_sub(SAMPLE_LEN / 2);
        if middle >= covered_to {
            ranges.push((middle, SAMPLE_LEN));
            covered_to = middle + SAMPLE_LEN;
        }

        let end = size.saturating_sub(SAMPLE_LEN);
        if end >= covered_to {
            ranges.push((end, SAMPLE_LEN));
        }

        SamplePlan::Ranges(ranges)
    }
}
