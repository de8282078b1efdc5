//! # Conflict Module
//!
//! Handles content that is already indexed when it shows up again with a
//! different date. The earlier date wins: if the incoming copy is older, the
//! filed copy is moved to the older folder and its index entry follows.

use crate::core::date::DateRecord;
use crate::core::index::{IndexEntry, PersistentIndex};
use crate::core::organize::SortExecutor;
use crate::error::SortError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What happened to an already-indexed file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictOutcome {
    /// Same day, or one side has no usable date
    Skip,
    /// Incoming date was earlier; the filed copy was moved
    RelocatedExisting { from: PathBuf, to: PathBuf },
    /// Filed date was earlier; nothing changed
    KeptExisting,
    /// Incoming date was earlier but the filed copy is gone
    ExistingMissing { path: PathBuf },
}

/// A date disagreement between a filed copy and an incoming copy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateConflict {
    /// The incoming file
    pub file: PathBuf,
    /// Date that lost
    pub old: NaiveDate,
    /// Date that won
    pub new: NaiveDate,
}

/// Decision without side effects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Skip,
    IncomingEarlier,
    ExistingEarlier,
}

/// Compare the filed date with the incoming one.
///
/// Dates are compared by calendar day. An incoming record without a real
/// date (`Unknown`/`Invalid`) or an entry without `date_taken` gives `Skip`.
pub fn judge(existing: &IndexEntry, incoming: &DateRecord) -> Verdict {
    let Some(existing_taken) = existing.date_taken else {
        return Verdict::Skip;
    };
    if !incoming.source.is_dated() {
        return Verdict::Skip;
    }

    let (old, new) = (existing_taken.date(), incoming.taken.date());
    if new < old {
        Verdict::IncomingEarlier
    } else if old < new {
        Verdict::ExistingEarlier
    } else {
        Verdict::Skip
    }
}

/// Applies the earlier-date-wins policy for one run
pub struct ConflictResolver<'a> {
    index: &'a PersistentIndex,
    conflicts: Vec<DateConflict>,
}

impl<'a> ConflictResolver<'a> {
    pub fn new(index: &'a PersistentIndex) -> Self {
        Self {
            index,
            conflicts: Vec::new(),
        }
    }

    /// Conflicts recorded so far
    pub fn conflicts(&self) -> &[DateConflict] {
        &self.conflicts
    }

    pub fn into_conflicts(self) -> Vec<DateConflict> {
        self.conflicts
    }

    /// Reconcile an index hit.
    ///
    /// The incoming file itself is never filed. Errors come only from a
    /// failed relocation; the conflict is still recorded.
    pub fn resolve(
        &mut self,
        incoming_path: &Path,
        incoming: &DateRecord,
        existing: &IndexEntry,
        executor: &mut SortExecutor,
    ) -> Result<ConflictOutcome, SortError> {
        let incoming_day = incoming.taken.date();
        let existing_day = existing.date_taken.map(|d| d.date());

        match (judge(existing, incoming), existing_day) {
            (Verdict::ExistingEarlier, Some(existing_day)) => {
                tracing::warn!(
                    path = %incoming_path.display(),
                    indexed = %existing_day,
                    incoming = %incoming_day,
                    "Date conflict, keeping earlier indexed date"
                );
                self.conflicts.push(DateConflict {
                    file: incoming_path.to_path_buf(),
                    old: incoming_day,
                    new: existing_day,
                });
                Ok(ConflictOutcome::KeptExisting)
            }
            (Verdict::IncomingEarlier, Some(existing_day)) => {
                tracing::warn!(
                    path = %incoming_path.display(),
                    indexed = %existing_day,
                    incoming = %incoming_day,
                    "Date conflict, moving filed copy to earlier date"
                );
                self.conflicts.push(DateConflict {
                    file: incoming_path.to_path_buf(),
                    old: existing_day,
                    new: incoming_day,
                });
                self.relocate(existing, incoming, executor)
            }
            _ => {
                tracing::info!(path = %incoming_path.display(), "Skipped, already indexed");
                Ok(ConflictOutcome::Skip)
            }
        }
    }

    fn relocate(
        &self,
        existing: &IndexEntry,
        incoming: &DateRecord,
        executor: &mut SortExecutor,
    ) -> Result<ConflictOutcome, SortError> {
        let from = existing.file_path.clone();
        if !from.exists() {
            tracing::warn!(
                path = %from.display(),
                "Indexed file no longer exists, cannot move it to the earlier date"
            );
            return Ok(ConflictOutcome::ExistingMissing { path: from });
        }

        let to = executor.relocate(&from, incoming)?;

        let updated = IndexEntry {
            file_path: to.clone(),
            date_taken: Some(incoming.taken),
            date_source: Some(incoming.source),
            ..existing.clone()
        };
        if let Err(e) = self.index.upsert(&updated) {
            tracing::warn!(hash = %existing.hash, "Could not update index entry: {}", e);
        }

        if executor.is_dry_run() {
            tracing::info!(from = %from.display(), "[dry run] Would move filed copy to {}", to.display());
        } else {
            tracing::info!(from = %from.display(), "Moved filed copy to {}", to.display());
        }

        Ok(ConflictOutcome::RelocatedExisting { from, to })
    }
}
