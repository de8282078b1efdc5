//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by a sorting run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Source enumeration events
    Scan(ScanEvent),
    /// Duplicate detection (hashing) events
    Hash(HashEvent),
    /// Filing events
    Sort(SortEvent),
    /// Pipeline-level events
    Pipeline(PipelineEvent),
}

/// Events while enumerating the source directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScanEvent {
    /// Enumeration has started
    Started { root: PathBuf },
    /// Progress update during enumeration
    Progress(ScanProgress),
    /// An entry could not be read; enumeration continues
    Error { path: PathBuf, message: String },
    /// Enumeration completed
    Completed { total_files: usize },
}

/// Progress information during enumeration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanProgress {
    /// Number of directories visited so far
    pub directories_scanned: usize,
    /// Number of media files found so far
    pub files_found: usize,
    /// Directory currently being visited
    pub current_path: PathBuf,
}

/// Events during duplicate detection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HashEvent {
    /// Hashing has started
    Started {
        total_files: usize,
        candidates: usize,
        workers: usize,
    },
    /// Progress update during hashing
    Progress(HashProgress),
    /// A file could not be hashed and is skipped
    Error { path: PathBuf, message: String },
    /// Hashing completed
    Completed {
        hashed: usize,
        failed: usize,
        groups: usize,
    },
}

/// Progress information during hashing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashProgress {
    /// Files hashed so far
    pub completed: usize,
    /// Files to hash in total
    pub total: usize,
    /// Most recently hashed file
    pub current_path: PathBuf,
}

/// Events during filing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SortEvent {
    /// Filing has started
    Started { total_files: usize },
    /// A new batch is being processed
    BatchStarted {
        batch: usize,
        total_batches: usize,
        files: usize,
    },
    /// Progress update during filing
    Progress(SortProgress),
    /// A file was filed (or would be, under dry-run)
    Filed {
        source: PathBuf,
        destination: PathBuf,
    },
    /// A file was skipped because its content is already indexed
    Skipped { path: PathBuf },
    /// A file could not be filed
    Failed { path: PathBuf, message: String },
    /// Filing completed
    Completed {
        filed: usize,
        skipped: usize,
        failed: usize,
    },
}

/// Progress information during filing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortProgress {
    /// Files processed so far (1-based position of the current file)
    pub completed: usize,
    /// Files to process in total
    pub total: usize,
    /// File currently being processed
    pub current_path: PathBuf,
}

impl SortProgress {
    /// Completion as a percentage in `0.0..=100.0`
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.completed as f64 * 100.0 / self.total as f64
        }
    }
}

/// Pipeline-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// Run has started
    Started,
    /// Moving to a new phase
    PhaseChanged { phase: PipelinePhase },
    /// Run completed
    Completed { summary: RunSummary },
    /// Run was cancelled before all files were processed
    Cancelled,
}

/// Phases of a sorting run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelinePhase {
    Scanning,
    DetectingDuplicates,
    HandlingDuplicates,
    Sorting,
    Reporting,
}

/// Summary of a completed run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Files moved or copied into the target tree
    pub filed: usize,
    /// Duplicate groups found in the source
    pub duplicate_groups: usize,
    /// Files skipped because their content was already indexed
    pub skipped: usize,
    /// Date conflicts encountered against the index
    pub date_conflicts: usize,
    /// Files that failed to hash or transfer
    pub failed: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl std::fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelinePhase::Scanning => write!(f, "Scanning"),
            PipelinePhase::DetectingDuplicates => write!(f, "Detecting duplicates"),
            PipelinePhase::HandlingDuplicates => write!(f, "Handling duplicates"),
            PipelinePhase::Sorting => write!(f, "Sorting"),
            PipelinePhase::Reporting => write!(f, "Reporting"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_serializable() {
        let event = Event::Sort(SortEvent::Progress(SortProgress {
            completed: 10,
            total: 50,
            current_path: PathBuf::from("/photos/a.jpg"),
        }));

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: Event = serde_json::from_str(&json).unwrap();

        match deserialized {
            Event::Sort(SortEvent::Progress(p)) => assert_eq!(p.total, 50),
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn sort_progress_percent() {
        let progress = SortProgress {
            completed: 25,
            total: 100,
            current_path: PathBuf::new(),
        };
        assert!((progress.percent() - 25.0).abs() < f64::EPSILON);

        let empty = SortProgress {
            completed: 0,
            total: 0,
            current_path: PathBuf::new(),
        };
        assert!((empty.percent() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn phase_display() {
        assert_eq!(
            PipelinePhase::DetectingDuplicates.to_string(),
            "Detecting duplicates"
        );
    }
}
