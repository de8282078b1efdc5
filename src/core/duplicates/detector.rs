//! Parallel hashing and grouping.

use super::{DuplicateGroup, DuplicateScan};
use crate::core::hasher::{ContentHash, ContentHasher, HashMode};
use crate::core::pipeline::CancellationToken;
use crate::core::scanner::MediaFile;
use crate::error::HashError;
use crate::events::{Event, EventSender, HashEvent, HashProgress};
use crossbeam_channel::unbounded;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::collections::HashMap;

/// Worker count for a hashing mode on a machine with `cpus` cores.
///
/// Standard mode stays between 2 and 8 threads; turbo mode oversubscribes
/// (sampling is I/O bound) and stays between 4 and 16.
pub fn pool_size(mode: HashMode, cpus: usize) -> usize {
    match mode {
        HashMode::Full => cpus.max(2).min(8),
        HashMode::Turbo => (cpus * 2).max(4).min(16),
    }
}

/// Indices of files whose size is shared with at least one other file.
///
/// Files with unique sizes cannot be exact duplicates. Order is preserved.
pub fn filter_by_size(files: &[MediaFile]) -> Vec<usize> {
    let mut size_counts: HashMap<u64, usize> = HashMap::new();
    for file in files {
        *size_counts.entry(file.size).or_default() += 1;
    }

    files
        .iter()
        .enumerate()
        .filter(|(_, file)| size_counts.get(&file.size).copied().unwrap_or(0) >= 2)
        .map(|(i, _)| i)
        .collect()
}

/// Finds exact duplicates among scanned files
#[derive(Debug, Clone)]
pub struct DuplicateDetector {
    hasher: ContentHasher,
    size_prefilter: bool,
    workers: usize,
}

impl DuplicateDetector {
    /// Detector for a hashing mode; the size pre-filter defaults to on in
    /// turbo mode and off otherwise
    pub fn new(mode: HashMode) -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            hasher: ContentHasher::new(mode),
            size_prefilter: mode == HashMode::Turbo,
            workers: pool_size(mode, cpus),
        }
    }

    pub fn with_size_prefilter(mut self, enabled: bool) -> Self {
        self.size_prefilter = enabled;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Hash candidates in parallel and group them by content.
    ///
    /// Cancellation is checked before each file; files not yet started when
    /// the token flips are left out and [`DuplicateScan::cancelled`] is set.
    pub fn detect(
        &self,
        files: &[MediaFile],
        cancel: &CancellationToken,
        events: &EventSender,
    ) -> Result<DuplicateScan, HashError> {
        let candidates: Vec<usize> = if self.size_prefilter {
            filter_by_size(files)
        } else {
            (0..files.len()).collect()
        };
        let skipped_unique_size = files.len() - candidates.len();
        let total = candidates.len();

        tracing::info!(
            files = files.len(),
            candidates = total,
            workers = self.workers,
            mode = self.hasher.mode().name(),
            "Detecting duplicates"
        );
        events.send(Event::Hash(HashEvent::Started {
            total_files: files.len(),
            candidates: total,
            workers: self.workers,
        }));

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("hash-{i}"))
            .build()
            .map_err(|e| HashError::WorkerPool(e.to_string()))?;

        let (sender, receiver) = unbounded::<(usize, Result<ContentHash, HashError>)>();
        let hasher = self.hasher;

        let collected = std::thread::scope(|scope| {
            let collector_events = events.clone();
            let collector = scope.spawn(move || {
                let mut hashes: Vec<(usize, ContentHash)> = Vec::with_capacity(total);
                let mut failed = Vec::new();
                let mut completed = 0;

                for (index, result) in receiver {
                    completed += 1;
                    let path = files[index].path.clone();
                    match result {
                        Ok(hash) => hashes.push((index, hash)),
                        Err(e) => {
                            tracing::warn!(path = %path.display(), "Could not hash file: {}", e);
                            collector_events.send(Event::Hash(HashEvent::Error {
                                path: path.clone(),
                                message: e.to_string(),
                            }));
                            failed.push((path.clone(), e.to_string()));
                        }
                    }
                    collector_events.send(Event::Hash(HashEvent::Progress(HashProgress {
                        completed,
                        total,
                        current_path: path,
                    })));
                }

                (hashes, failed)
            });

            pool.install(|| {
                candidates.par_iter().for_each_with(sender, |sender, &index| {
                    if cancel.is_cancelled() {
                        return;
                    }
                    let result = hasher.hash_file(&files[index].path);
                    let _ = sender.send((index, result));
                });
            });

            collector.join()
        });

        let (mut hashes, failed) =
            collected.map_err(|_| HashError::WorkerPool("hash collector panicked".to_string()))?;

        hashes.sort_unstable_by_key(|(index, _)| *index);
        let groups = group_by_hash(files, &hashes);
        let cancelled = cancel.is_cancelled() && hashes.len() + failed.len() < total;

        events.send(Event::Hash(HashEvent::Completed {
            hashed: hashes.len(),
            failed: failed.len(),
            groups: groups.len(),
        }));
        tracing::info!(
            hashed = hashes.len(),
            failed = failed.len(),
            groups = groups.len(),
            "Duplicate detection finished"
        );

        Ok(DuplicateScan {
            groups,
            hashes: hashes
                .into_iter()
                .map(|(index, hash)| (files[index].path.clone(), hash))
                .collect(),
            failed,
            skipped_unique_size,
            cancelled,
        })
    }
}

/// Build groups from `(index, hash)` pairs sorted by index
fn group_by_hash(files: &[MediaFile], hashes: &[(usize, ContentHash)]) -> Vec<DuplicateGroup> {
    let mut order: Vec<ContentHash> = Vec::new();
    let mut members: HashMap<ContentHash, Vec<usize>> = HashMap::new();

    for &(index, hash) in hashes {
        let slot = members.entry(hash).or_insert_with(|| {
            order.push(hash);
            Vec::new()
        });
        slot.push(index);
    }

    order
        .into_iter()
        .filter_map(|hash| {
            let indices = members.remove(&hash)?;
            (indices.len() > 1).then(|| DuplicateGroup {
                hash,
                files: indices.into_iter().map(|i| files[i].clone()).collect(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scanner::MediaKind;
    use crate::events::null_sender;
    use std::fs;
    use std::path::PathBuf;
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn media(dir: &TempDir, name: &str, bytes: &[u8]) -> MediaFile {
        let path = dir.path().join(name);
        fs::write(&path, bytes).unwrap();
        MediaFile::from_path(&path).unwrap()
    }

    fn phantom(path: &str, size: u64) -> MediaFile {
        MediaFile {
            path: PathBuf::from(path),
            extension: "jpg".into(),
            kind: MediaKind::Image,
            size,
            modified: SystemTime::now(),
            created: None,
        }
    }

    #[test]
    fn pool_size_bounds() {
        assert_eq!(pool_size(HashMode::Full, 1), 2);
        assert_eq!(pool_size(HashMode::Full, 6), 6);
        assert_eq!(pool_size(HashMode::Full, 32), 8);
        assert_eq!(pool_size(HashMode::Turbo, 1), 4);
        assert_eq!(pool_size(HashMode::Turbo, 5), 10);
        assert_eq!(pool_size(HashMode::Turbo, 32), 16);
    }

    #[test]
    fn size_filter_removes_unique_sizes() {
        let files = vec![
            phantom("/a.jpg", 1000),
            phantom("/b.jpg", 1000),
            phantom("/c.jpg", 2000),
            phantom("/d.jpg", 3000),
        ];
        assert_eq!(filter_by_size(&files), vec![0, 1]);
    }

    #[test]
    fn groups_identical_content_with_first_as_original() {
        let dir = TempDir::new().unwrap();
        let files = vec![
            media(&dir, "a.jpg", b"same bytes"),
            media(&dir, "b.jpg", b"different"),
            media(&dir, "c.jpg", b"same bytes"),
            media(&dir, "d.jpg", b"same bytes"),
        ];

        let scan = DuplicateDetector::new(HashMode::Full)
            .with_workers(3)
            .detect(&files, &CancellationToken::new(), &null_sender())
            .unwrap();

        assert_eq!(scan.groups.len(), 1);
        let group = &scan.groups[0];
        assert!(group.original().path.ends_with("a.jpg"));
        let rest: Vec<_> = group.duplicates().iter().map(|f| f.file_name()).collect();
        assert_eq!(rest, vec!["c.jpg", "d.jpg"]);
        assert_eq!(scan.duplicate_count(), 2);
        assert_eq!(scan.hashes.len(), 4);
    }

    #[test]
    fn unique_files_produce_no_groups() {
        let dir = TempDir::new().unwrap();
        let files = vec![media(&dir, "a.jpg", b"one"), media(&dir, "b.jpg", b"two")];

        let scan = DuplicateDetector::new(HashMode::Full)
            .detect(&files, &CancellationToken::new(), &null_sender())
            .unwrap();
        assert!(scan.groups.is_empty());
    }

    #[test]
    fn size_prefilter_skips_unique_sizes() {
        let dir = TempDir::new().unwrap();
        let files = vec![
            media(&dir, "a.jpg", b"xx"),
            media(&dir, "b.jpg", b"xx"),
            media(&dir, "c.jpg", b"longer content"),
        ];

        let scan = DuplicateDetector::new(HashMode::Turbo)
            .detect(&files, &CancellationToken::new(), &null_sender())
            .unwrap();
        assert_eq!(scan.skipped_unique_size, 1);
        assert_eq!(scan.groups.len(), 1);
        assert!(!scan.hashes.contains_key(&files[2].path));
    }

    #[test]
    fn unreadable_file_is_recorded_as_failed() {
        let dir = TempDir::new().unwrap();
        let files = vec![media(&dir, "a.jpg", b"data"), phantom("/nonexistent/x.jpg", 4)];

        let scan = DuplicateDetector::new(HashMode::Full)
            .detect(&files, &CancellationToken::new(), &null_sender())
            .unwrap();
        assert_eq!(scan.failed.len(), 1);
        assert_eq!(scan.failed[0].0, PathBuf::from("/nonexistent/x.jpg"));
    }

    #[test]
    fn cancelled_before_start_hashes_nothing() {
        let dir = TempDir::new().unwrap();
        let files = vec![media(&dir, "a.jpg", b"same"), media(&dir, "b.jpg", b"same")];
        let cancel = CancellationToken::new();
        cancel.cancel();

        let scan = DuplicateDetector::new(HashMode::Full)
            .detect(&files, &cancel, &null_sender())
            .unwrap();
        assert!(scan.cancelled);
        assert!(scan.groups.is_empty());
        assert!(scan.hashes.is_empty());
    }
}
