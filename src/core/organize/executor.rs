//! Places files in the target tree.

use super::planner::{generate_unique_path, DestinationPlanner};
use super::types::*;
use crate::core::date::DateRecord;
use crate::core::scanner::MediaFile;
use crate::error::SortError;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Files per batch when batching is enabled
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Split `total` items into consecutive ranges.
///
/// With `batch_size` set and `total` above it, ranges hold at most
/// `batch_size` items; otherwise everything is one range.
pub fn batch_ranges(total: usize, batch_size: Option<usize>) -> Vec<Range<usize>> {
    if total == 0 {
        return Vec::new();
    }
    match batch_size {
        Some(size) if size > 0 && total > size => (0..total)
            .step_by(size)
            .map(|start| start..(start + size).min(total))
            .collect(),
        _ => vec![0..total],
    }
}

/// Executes filing decisions for one run.
///
/// Every destination handed out is remembered, so a dry run produces the
/// same names a real run would even though nothing lands on disk.
pub struct SortExecutor {
    planner: DestinationPlanner,
    mode: OperationMode,
    dry_run: bool,
    claimed: HashSet<PathBuf>,
    created_dirs: HashSet<PathBuf>,
}

impl SortExecutor {
    pub fn new(planner: DestinationPlanner, mode: OperationMode, dry_run: bool) -> Self {
        Self {
            planner,
            mode,
            dry_run,
            claimed: HashSet::new(),
            created_dirs: HashSet::new(),
        }
    }

    pub fn planner(&self) -> &DestinationPlanner {
        &self.planner
    }

    pub fn mode(&self) -> OperationMode {
        self.mode
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Number of directories created so far
    pub fn folders_created(&self) -> usize {
        self.created_dirs.len()
    }

    /// Compute the destination for `file` and copy or move it there
    pub fn plan_and_apply(&mut self, file: &MediaFile, date: &DateRecord) -> SortOutcome {
        let preferred = self.planner.target_for(date, &file.file_name());

        match self.place(&file.path, &preferred, self.mode) {
            Ok(destination) => {
                let relative = destination
                    .strip_prefix(self.planner.root())
                    .unwrap_or(&destination);
                if self.dry_run {
                    tracing::info!(
                        source = %file.path.display(),
                        date = %date.taken.format("%Y-%m-%d"),
                        date_source = %date.source,
                        "[dry run] Would {} to {}",
                        self.mode.name(),
                        relative.display()
                    );
                } else {
                    tracing::info!(
                        source = %file.path.display(),
                        date = %date.taken.format("%Y-%m-%d"),
                        date_source = %date.source,
                        "{} to {}",
                        self.mode.past_tense(),
                        relative.display()
                    );
                }
                SortOutcome::Filed(FiledFile {
                    source: file.path.clone(),
                    destination,
                    date: *date,
                    size_bytes: file.size,
                })
            }
            Err(e) => {
                tracing::error!(path = %file.path.display(), "Could not file: {}", e);
                SortOutcome::Failed {
                    source: file.path.clone(),
                    message: e.to_string(),
                }
            }
        }
    }

    /// Move an extra copy into the duplicates folder
    pub fn set_aside_duplicate(&mut self, file: &MediaFile) -> Result<PathBuf, SortError> {
        let preferred = self.planner.duplicate_target(&file.file_name());
        let destination = self.place(&file.path, &preferred, OperationMode::Move)?;
        let verb = if self.dry_run { "[dry run] Would move" } else { "Moved" };
        tracing::info!(
            path = %file.path.display(),
            "{} duplicate to {}",
            verb,
            destination.display()
        );
        Ok(destination)
    }

    /// Move an already-filed file to the folder for a new date.
    ///
    /// The file keeps its name, collision-suffixed if needed.
    pub fn relocate(&mut self, existing: &Path, date: &DateRecord) -> Result<PathBuf, SortError> {
        let name = existing
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let preferred = self.planner.target_for(date, &name);
        if preferred == existing {
            return Ok(preferred);
        }
        self.place(existing, &preferred, OperationMode::Move)
    }

    /// Pick a free destination near `preferred` and transfer `source` there
    fn place(
        &mut self,
        source: &Path,
        preferred: &Path,
        mode: OperationMode,
    ) -> Result<PathBuf, SortError> {
        let destination = generate_unique_path(preferred, &self.claimed);

        if !self.dry_run {
            if let Some(parent) = destination.parent() {
                self.ensure_dir(parent)?;
            }
            transfer_file(source, &destination, mode)?;
        }

        self.claimed.insert(destination.clone());
        Ok(destination)
    }

    fn ensure_dir(&mut self, dir: &Path) -> Result<(), SortError> {
        if self.created_dirs.contains(dir) {
            return Ok(());
        }
        fs::create_dir_all(dir).map_err(|source| SortError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;
        self.created_dirs.insert(dir.to_path_buf());
        Ok(())
    }
}

/// Copy or move a single file.
///
/// The destination only ever appears complete: content is written to a
/// temporary file in the destination directory and renamed into place once
/// it is verified, so a failed transfer leaves nothing behind. A move that
/// cannot be done by rename (e.g. across filesystems) falls back to that copy,
/// then removes the source. If the source cannot be removed the copy is
/// taken back and the move fails.
pub fn transfer_file(source: &Path, destination: &Path, mode: OperationMode) -> Result<(), SortError> {
    let source_meta = fs::metadata(source).map_err(|_| SortError::SourceMissing {
        path: source.to_path_buf(),
    })?;

    // rename would replace an existing destination
    if mode == OperationMode::Move && !destination.exists() && fs::rename(source, destination).is_ok() {
        return Ok(());
    }

    copy_into_place(source, &source_meta, destination)?;

    if mode == OperationMode::Move {
        if let Err(e) = fs::remove_file(source) {
            if let Err(undo) = fs::remove_file(destination) {
                tracing::error!(path = %destination.display(), "Could not take back copy: {}", undo);
            }
            return Err(SortError::Transfer {
                from: source.to_path_buf(),
                to: destination.to_path_buf(),
                source: e,
            });
        }
    }
    Ok(())
}

/// Write a verified copy of `source` to `destination` in one step.
///
/// The temporary file is deleted on every error path when it is dropped.
fn copy_into_place(
    source: &Path,
    source_meta: &fs::Metadata,
    destination: &Path,
) -> Result<(), SortError> {
    let transfer_err = |e: std::io::Error| SortError::Transfer {
        from: source.to_path_buf(),
        to: destination.to_path_buf(),
        source: e,
    };
    let dir = destination
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut temp = NamedTempFile::new_in(dir).map_err(transfer_err)?;
    let mut input = fs::File::open(source).map_err(transfer_err)?;
    io::copy(&mut input, temp.as_file_mut()).map_err(transfer_err)?;
    temp.as_file().sync_all().map_err(transfer_err)?;

    let copied = temp.as_file().metadata().map_err(transfer_err)?.len();
    if copied != source_meta.len() {
        return Err(SortError::VerificationFailed {
            path: destination.to_path_buf(),
            expected: source_meta.len(),
            actual: copied,
        });
    }

    if let Err(e) = temp.as_file().set_permissions(source_meta.permissions()) {
        tracing::debug!(path = %destination.display(), "Could not keep permissions: {}", e);
    }
    preserve_modified(source_meta, temp.as_file(), destination);

    temp.persist_noclobber(destination)
        .map_err(|e| transfer_err(e.error))?;
    Ok(())
}

/// Carry the source modification time over to a copy
fn preserve_modified(source_meta: &fs::Metadata, copy: &fs::File, destination: &Path) {
    let Ok(modified) = source_meta.modified() else {
        return;
    };
    if let Err(e) = copy.set_modified(modified) {
        tracing::debug!(path = %destination.display(), "Could not keep modification time: {}", e);
    }
}
