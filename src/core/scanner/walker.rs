//! Directory walking implementation using walkdir.

use super::{filter::MediaFilter, MediaFile, ScanResult};
use crate::core::pipeline::CancellationToken;
use crate::error::ScanError;
use crate::events::{null_sender, Event, EventSender, ScanEvent, ScanProgress};
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Configuration for the directory scanner
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Whether to follow symbolic links
    pub follow_symlinks: bool,
    /// Whether to include hidden files and directories
    pub include_hidden: bool,
    /// Maximum directory depth (None = unlimited)
    pub max_depth: Option<usize>,
    /// Directories never descended into (e.g. a target inside the source)
    pub exclude: Vec<PathBuf>,
    /// Which files to pick up
    pub filter: MediaFilter,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            include_hidden: false,
            max_depth: None,
            exclude: Vec::new(),
            filter: MediaFilter::default(),
        }
    }
}

/// Scanner implementation using the walkdir crate
pub struct WalkDirScanner {
    config: ScanConfig,
    filter: MediaFilter,
}

impl WalkDirScanner {
    /// Create a new scanner with the given configuration
    pub fn new(config: ScanConfig) -> Self {
        let filter = config.filter.clone().with_hidden(config.include_hidden);
        Self { config, filter }
    }

    /// Scan a source root without progress reporting
    pub fn scan(&self, root: &Path) -> Result<ScanResult, ScanError> {
        self.scan_with_events(root, &null_sender(), &CancellationToken::new())
    }

    /// Scan a source root, reporting progress and honouring cancellation.
    ///
    /// Entries are visited sorted by file name so enumeration order is stable.
    /// Unreadable entries are collected in [`ScanResult::errors`] and the walk
    /// continues.
    pub fn scan_with_events(
        &self,
        root: &Path,
        events: &EventSender,
        cancel: &CancellationToken,
    ) -> Result<ScanResult, ScanError> {
        if !root.is_dir() {
            return Err(ScanError::DirectoryNotFound {
                path: root.to_path_buf(),
            });
        }

        events.send(Event::Scan(ScanEvent::Started {
            root: root.to_path_buf(),
        }));

        let mut files = Vec::new();
        let mut errors = Vec::new();
        let mut directories_scanned = 0;

        let mut walker = WalkDir::new(root)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name();
        if let Some(depth) = self.config.max_depth {
            walker = walker.max_depth(depth);
        }

        let entries = walker
            .into_iter()
            .filter_entry(|entry| self.should_descend(root, entry));

        for entry_result in entries {
            if cancel.is_cancelled() {
                return Err(ScanError::Cancelled);
            }

            let entry = match entry_result {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                    let error = if e.io_error().map(|io| io.kind())
                        == Some(std::io::ErrorKind::PermissionDenied)
                    {
                        ScanError::PermissionDenied { path: path.clone() }
                    } else {
                        ScanError::ReadEntry {
                            path: path.clone(),
                            source: std::io::Error::other(e.to_string()),
                        }
                    };
                    tracing::warn!(path = %path.display(), "{}", error);
                    events.send(Event::Scan(ScanEvent::Error {
                        path,
                        message: error.to_string(),
                    }));
                    errors.push(error);
                    continue;
                }
            };

            let path = entry.path();
            if entry.file_type().is_dir() {
                directories_scanned += 1;
                events.send(Event::Scan(ScanEvent::Progress(ScanProgress {
                    directories_scanned,
                    files_found: files.len(),
                    current_path: path.to_path_buf(),
                })));
                continue;
            }

            if !self.filter.should_include(path) {
                continue;
            }

            match MediaFile::from_path(path) {
                Ok(file) => files.push(file),
                Err(error) => {
                    events.send(Event::Scan(ScanEvent::Error {
                        path: path.to_path_buf(),
                        message: error.to_string(),
                    }));
                    errors.push(error);
                }
            }
        }

        tracing::debug!(
            root = %root.display(),
            files = files.len(),
            directories = directories_scanned,
            "Scan finished"
        );
        events.send(Event::Scan(ScanEvent::Completed {
            total_files: files.len(),
        }));

        Ok(ScanResult { files, errors })
    }

    /// Prune hidden and excluded directories before walkdir descends into them
    fn should_descend(&self, root: &Path, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return true;
        }
        if !self.config.include_hidden && is_hidden(entry) {
            return false;
        }
        let path = entry.path();
        !self
            .config
            .exclude
            .iter()
            .any(|excluded| excluded != root && path.starts_with(excluded))
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}
