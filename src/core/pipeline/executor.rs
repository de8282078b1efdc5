//! Pipeline execution implementation.

use super::cancel::CancellationToken;
use super::config::SorterConfig;
use crate::core::conflict::{ConflictResolver, DateConflict};
use crate::core::date::{DateResolver, DateSource};
use crate::core::duplicates::{DuplicateDetector, DuplicateGroup, DuplicatePolicy, DuplicateScan};
use crate::core::hasher::{ContentHash, ContentHasher};
use crate::core::index::{IndexBackend, IndexEntry, IndexStats, PersistentIndex};
use crate::core::metadata::{ExifMetadataReader, MetadataReader};
use crate::core::organize::{
    batch_ranges, DestinationPlanner, FiledFile, OperationMode, SortExecutor, SortOutcome,
};
use crate::core::reporter;
use crate::core::scanner::{MediaFile, ScanConfig, WalkDirScanner};
use crate::error::{Result, ScanError};
use crate::events::{
    null_sender, Event, EventSender, PipelineEvent, PipelinePhase, RunSummary, SortEvent,
    SortProgress,
};
use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use uuid::Uuid;

/// A file that could not be processed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub message: String,
}

/// An extra copy moved out of the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetAside {
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// Everything a run did (or would do, under dry-run)
#[derive(Debug, Serialize)]
pub struct RunOutcome {
    pub run_id: String,
    pub started_at: NaiveDateTime,
    pub config: SorterConfig,
    /// Media files found in the source
    pub total_files: usize,
    /// Files placed in the dated tree or the undated folders
    pub filed: Vec<FiledFile>,
    /// Groups of identical files found in the source
    pub duplicate_groups: Vec<DuplicateGroup>,
    /// Extra copies moved to `_duplicates/`
    pub set_aside: Vec<SetAside>,
    pub unknown_date: Vec<PathBuf>,
    pub invalid_date: Vec<PathBuf>,
    /// Files whose content was already indexed
    pub skipped: Vec<PathBuf>,
    pub conflicts: Vec<DateConflict>,
    pub failed: Vec<FileFailure>,
    /// Non-fatal problems that are not tied to a single file
    pub errors: Vec<String>,
    pub index_stats: Option<IndexStats>,
    pub report_path: Option<PathBuf>,
    pub cancelled: bool,
    pub duration_ms: u64,
}

impl RunOutcome {
    fn new(config: SorterConfig) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            started_at: Local::now().naive_local(),
            config,
            total_files: 0,
            filed: Vec::new(),
            duplicate_groups: Vec::new(),
            set_aside: Vec::new(),
            unknown_date: Vec::new(),
            invalid_date: Vec::new(),
            skipped: Vec::new(),
            conflicts: Vec::new(),
            failed: Vec::new(),
            errors: Vec::new(),
            index_stats: None,
            report_path: None,
            cancelled: false,
            duration_ms: 0,
        }
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            filed: self.filed.len(),
            duplicate_groups: self.duplicate_groups.len(),
            skipped: self.skipped.len(),
            date_conflicts: self.conflicts.len(),
            failed: self.failed.len(),
            duration_ms: self.duration_ms,
        }
    }

    /// Bytes taken up by every copy after the original, across all groups
    pub fn duplicate_bytes(&self) -> u64 {
        self.duplicate_groups.iter().map(|g| g.wasted_bytes()).sum()
    }

    fn fail(&mut self, path: &Path, message: impl Into<String>) {
        self.failed.push(FileFailure {
            path: path.to_path_buf(),
            message: message.into(),
        });
    }
}

/// Builder for a sorting run
pub struct PipelineBuilder {
    config: SorterConfig,
    reader: Option<Arc<dyn MetadataReader>>,
    index: Option<Box<dyn IndexBackend>>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            config: SorterConfig::default(),
            reader: None,
            index: None,
        }
    }

    /// Start from a complete configuration
    pub fn config(mut self, config: SorterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn source(mut self, source: impl Into<PathBuf>) -> Self {
        self.config.source = source.into();
        self
    }

    pub fn target(mut self, target: impl Into<PathBuf>) -> Self {
        self.config.target = target.into();
        self
    }

    pub fn operation(mut self, operation: OperationMode) -> Self {
        self.config.operation = operation;
        self
    }

    pub fn layout(mut self, layout: crate::core::organize::Layout) -> Self {
        self.config.layout = layout;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.config.dry_run = dry_run;
        self
    }

    pub fn use_index(mut self, enabled: bool) -> Self {
        self.config.use_index = enabled;
        self
    }

    pub fn index_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.index_path = Some(path.into());
        self
    }

    /// Validate dates against `[earliest_year, now]`, or accept all dates
    pub fn validate_dates(mut self, enabled: bool, earliest_year: i32) -> Self {
        self.config.validate_dates = enabled;
        self.config.earliest_year = earliest_year;
        self
    }

    pub fn duplicates(mut self, policy: DuplicatePolicy) -> Self {
        self.config.duplicates = policy;
        self
    }

    pub fn turbo(mut self, turbo: bool) -> Self {
        self.config.turbo = turbo;
        self
    }

    pub fn size_prefilter(mut self, enabled: bool) -> Self {
        self.config.size_prefilter = Some(enabled);
        self
    }

    /// Process files in batches of `size`
    pub fn batch(mut self, size: usize) -> Self {
        self.config.batch = true;
        self.config.batch_size = size;
        self
    }

    pub fn media(mut self, media: crate::core::scanner::MediaSelection) -> Self {
        self.config.media = media;
        self
    }

    pub fn extensions(mut self, list: impl Into<String>) -> Self {
        self.config.extensions = Some(list.into());
        self
    }

    pub fn include_hidden(mut self, include: bool) -> Self {
        self.config.include_hidden = include;
        self
    }

    /// Replace the EXIF reader
    pub fn metadata_reader(mut self, reader: Arc<dyn MetadataReader>) -> Self {
        self.reader = Some(reader);
        self
    }

    /// Use an already-open index backend instead of the database file
    pub fn index_backend(mut self, backend: Box<dyn IndexBackend>) -> Self {
        self.index = Some(backend);
        self
    }

    /// Build the pipeline
    pub fn build(self) -> Pipeline {
        Pipeline {
            config: self.config,
            reader: self
                .reader
                .unwrap_or_else(|| Arc::new(ExifMetadataReader::new())),
            index: Mutex::new(self.index),
            cancel: CancellationToken::new(),
        }
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// One sorting run
pub struct Pipeline {
    config: SorterConfig,
    reader: Arc<dyn MetadataReader>,
    /// Injected backend, consumed by the first run
    index: Mutex<Option<Box<dyn IndexBackend>>>,
    cancel: CancellationToken,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    pub fn config(&self) -> &SorterConfig {
        &self.config
    }

    /// Token that stops the run between files when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the pipeline without events
    pub fn run(&self) -> Result<RunOutcome> {
        self.run_with_events(&null_sender())
    }

    /// Run the pipeline with event reporting.
    ///
    /// Only configuration problems and a missing source directory return an
    /// error; per-file failures are collected in [`RunOutcome::failed`].
    pub fn run_with_events(&self, events: &EventSender) -> Result<RunOutcome> {
        let config = &self.config;
        config.validate()?;

        let start_time = Instant::now();
        let mut outcome = RunOutcome::new(config.clone());
        tracing::info!(
            source = %config.source.display(),
            target = %config.target.display(),
            dry_run = config.dry_run,
            "Starting media sort"
        );
        events.send(Event::Pipeline(PipelineEvent::Started));

        // Phase 1: Scanning
        phase(events, PipelinePhase::Scanning);
        let scanner = WalkDirScanner::new(ScanConfig {
            include_hidden: config.include_hidden,
            exclude: vec![config.target.clone()],
            filter: config.media_filter(),
            ..ScanConfig::default()
        });
        let files = match scanner.scan_with_events(&config.source, events, &self.cancel) {
            Ok(scan) => {
                outcome
                    .errors
                    .extend(scan.errors.iter().map(|e| e.to_string()));
                scan.files
            }
            Err(ScanError::Cancelled) => return Ok(self.finish_cancelled(outcome, start_time, events)),
            Err(e) => return Err(e.into()),
        };
        outcome.total_files = files.len();

        let index = self.open_index();
        let mut executor = SortExecutor::new(
            DestinationPlanner::new(&config.target, config.layout),
            config.operation,
            config.dry_run,
        );

        // Phase 2 and 3: duplicates inside the source
        let detection = if config.duplicates == DuplicatePolicy::Off {
            DuplicateScan::default()
        } else {
            phase(events, PipelinePhase::DetectingDuplicates);
            let detector = DuplicateDetector::new(config.hash_mode())
                .with_size_prefilter(config.size_prefilter_enabled());
            detector.detect(&files, &self.cancel, events)?
        };
        if detection.cancelled {
            outcome.duplicate_groups = detection.groups;
            return Ok(self.finish_cancelled(outcome, start_time, events));
        }

        let mut excluded: HashSet<PathBuf> = HashSet::new();
        for (path, message) in &detection.failed {
            outcome.fail(path, message.as_str());
            excluded.insert(path.clone());
        }
        if !detection.groups.is_empty() {
            phase(events, PipelinePhase::HandlingDuplicates);
            self.handle_duplicates(&detection.groups, &mut executor, &mut excluded, &mut outcome);
        }

        // Phase 4: Sorting
        phase(events, PipelinePhase::Sorting);
        let candidates: Vec<&MediaFile> = files
            .iter()
            .filter(|f| !excluded.contains(&f.path))
            .collect();
        let cancelled = self.sort_files(
            &candidates,
            &detection.hashes,
            &index,
            &mut executor,
            &mut outcome,
            events,
        );
        outcome.duplicate_groups = detection.groups;
        outcome.index_stats = index.stats();
        drop(index);

        if cancelled {
            return Ok(self.finish_cancelled(outcome, start_time, events));
        }

        // Phase 5: Reporting
        phase(events, PipelinePhase::Reporting);
        outcome.duration_ms = start_time.elapsed().as_millis() as u64;
        if !config.dry_run {
            match reporter::write_report(&outcome, &config.target) {
                Ok(path) => {
                    tracing::info!(path = %path.display(), "Report written");
                    outcome.report_path = Some(path);
                }
                Err(e) => {
                    tracing::warn!("{}", e);
                    outcome.errors.push(e.to_string());
                }
            }
        }

        let summary = outcome.summary();
        tracing::info!(
            filed = summary.filed,
            skipped = summary.skipped,
            failed = summary.failed,
            conflicts = summary.date_conflicts,
            "Media sort finished"
        );
        events.send(Event::Pipeline(PipelineEvent::Completed { summary }));
        Ok(outcome)
    }

    fn open_index(&self) -> PersistentIndex {
        let config = &self.config;
        if !config.use_index {
            return PersistentIndex::disabled();
        }
        let injected = self.index.lock().ok().and_then(|mut slot| slot.take());
        match injected {
            Some(backend) => PersistentIndex::with_backend(backend, config.dry_run),
            None => PersistentIndex::open(&config.index_location(), config.dry_run),
        }
    }

    /// Keep the first file of every group; set the rest aside or leave them
    fn handle_duplicates(
        &self,
        groups: &[DuplicateGroup],
        executor: &mut SortExecutor,
        excluded: &mut HashSet<PathBuf>,
        outcome: &mut RunOutcome,
    ) {
        tracing::info!(groups = groups.len(), policy = self.config.duplicates.name(), "Handling duplicates");
        for group in groups {
            tracing::info!(original = %group.original().path.display(), "Keeping original");
            for duplicate in group.duplicates() {
                excluded.insert(duplicate.path.clone());
                if self.config.duplicates != DuplicatePolicy::Move {
                    continue;
                }
                match executor.set_aside_duplicate(duplicate) {
                    Ok(destination) => outcome.set_aside.push(SetAside {
                        source: duplicate.path.clone(),
                        destination,
                    }),
                    Err(e) => {
                        tracing::error!(path = %duplicate.path.display(), "Could not move duplicate: {}", e);
                        outcome.fail(&duplicate.path, e.to_string());
                    }
                }
            }
        }
    }

    /// File every candidate in order. Returns true when cancelled part way.
    fn sort_files(
        &self,
        files: &[&MediaFile],
        known_hashes: &HashMap<PathBuf, ContentHash>,
        index: &PersistentIndex,
        executor: &mut SortExecutor,
        outcome: &mut RunOutcome,
        events: &EventSender,
    ) -> bool {
        let resolver = DateResolver::new(self.config.validity_window(), self.reader.clone());
        let hasher = ContentHasher::new(self.config.hash_mode());
        let mut conflicts = ConflictResolver::new(index);
        let total = files.len();
        let ranges = batch_ranges(total, self.config.effective_batch_size());
        let batched = ranges.len() > 1;
        let mut cancelled = false;

        tracing::info!(files = total, batches = ranges.len(), "Sorting files");
        events.send(Event::Sort(SortEvent::Started { total_files: total }));

        'batches: for (batch_no, range) in ranges.iter().enumerate() {
            if batched {
                tracing::info!(batch = batch_no + 1, of = ranges.len(), files = range.len(), "Processing batch");
                events.send(Event::Sort(SortEvent::BatchStarted {
                    batch: batch_no + 1,
                    total_batches: ranges.len(),
                    files: range.len(),
                }));
            }

            for position in range.clone() {
                if self.cancel.is_cancelled() {
                    tracing::info!("Sorting stopped by cancellation");
                    cancelled = true;
                    break 'batches;
                }
                let file = files[position];
                events.send(Event::Sort(SortEvent::Progress(SortProgress {
                    completed: position + 1,
                    total,
                    current_path: file.path.clone(),
                })));

                let hash = if index.is_enabled() {
                    match known_hashes.get(&file.path) {
                        Some(hash) => Some(*hash),
                        None => match hasher.hash_file(&file.path) {
                            Ok(hash) => Some(hash),
                            Err(e) => {
                                tracing::warn!(path = %file.path.display(), "Could not hash file: {}", e);
                                outcome.fail(&file.path, e.to_string());
                                events.send(Event::Sort(SortEvent::Failed {
                                    path: file.path.clone(),
                                    message: e.to_string(),
                                }));
                                continue;
                            }
                        },
                    }
                } else {
                    None
                };

                let date = resolver.resolve(file);

                if let Some(existing) = hash.and_then(|h| index.lookup(&h)) {
                    if let Err(e) = conflicts.resolve(&file.path, &date, &existing, executor) {
                        tracing::error!(path = %existing.file_path.display(), "Could not move filed copy: {}", e);
                        outcome.errors.push(e.to_string());
                    }
                    outcome.skipped.push(file.path.clone());
                    events.send(Event::Sort(SortEvent::Skipped {
                        path: file.path.clone(),
                    }));
                    continue;
                }

                match executor.plan_and_apply(file, &date) {
                    SortOutcome::Filed(filed) => {
                        match date.source {
                            DateSource::Unknown => outcome.unknown_date.push(file.path.clone()),
                            DateSource::Invalid => outcome.invalid_date.push(file.path.clone()),
                            _ => {}
                        }
                        if let Some(hash) = hash {
                            let entry = IndexEntry::for_filed(hash, file, &filed.destination, &date);
                            if let Err(e) = index.upsert(&entry) {
                                tracing::warn!(path = %file.path.display(), "Could not record file in index: {}", e);
                            }
                        }
                        events.send(Event::Sort(SortEvent::Filed {
                            source: filed.source.clone(),
                            destination: filed.destination.clone(),
                        }));
                        outcome.filed.push(filed);
                    }
                    SortOutcome::Failed { source, message } => {
                        events.send(Event::Sort(SortEvent::Failed {
                            path: source.clone(),
                            message: message.clone(),
                        }));
                        outcome.fail(&source, message);
                    }
                }
            }
        }

        outcome.conflicts = conflicts.into_conflicts();
        events.send(Event::Sort(SortEvent::Completed {
            filed: outcome.filed.len(),
            skipped: outcome.skipped.len(),
            failed: outcome.failed.len(),
        }));
        cancelled
    }

    fn finish_cancelled(
        &self,
        mut outcome: RunOutcome,
        start_time: Instant,
        events: &EventSender,
    ) -> RunOutcome {
        outcome.cancelled = true;
        outcome.duration_ms = start_time.elapsed().as_millis() as u64;
        tracing::warn!(filed = outcome.filed.len(), "Media sort cancelled");
        events.send(Event::Pipeline(PipelineEvent::Cancelled));
        outcome
    }
}

fn phase(events: &EventSender, phase: PipelinePhase) {
    events.send(Event::Pipeline(PipelineEvent::PhaseChanged { phase }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::index::InMemoryIndex;
    use crate::core::organize::Layout;
    use crate::events::EventChannel;
    use std::fs;
    use tempfile::TempDir;

    struct NoExif;

    impl MetadataReader for NoExif {
        fn capture_time(&self, _file: &MediaFile) -> Option<NaiveDateTime> {
            None
        }
    }

    fn setup() -> (TempDir, PathBuf, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("in");
        let target = temp_dir.path().join("out");
        fs::create_dir_all(&source).unwrap();
        (temp_dir, source, target)
    }

    fn builder(source: &Path, target: &Path) -> PipelineBuilder {
        Pipeline::builder()
            .source(source)
            .target(target)
            .metadata_reader(Arc::new(NoExif))
            .index_backend(Box::new(InMemoryIndex::new()))
    }

    #[test]
    fn pipeline_builder_sets_options() {
        let pipeline = Pipeline::builder()
            .source("/in")
            .target("/out")
            .layout(Layout::Day)
            .operation(OperationMode::Copy)
            .batch(50)
            .turbo(true)
            .build();

        let config = pipeline.config();
        assert_eq!(config.layout, Layout::Day);
        assert_eq!(config.operation, OperationMode::Copy);
        assert_eq!(config.effective_batch_size(), Some(50));
        assert!(config.turbo);
    }

    #[test]
    fn missing_source_is_an_error() {
        let (_temp, source, target) = setup();
        let result = builder(&source.join("missing"), &target).build().run();
        assert!(result.is_err());
    }

    #[test]
    fn invalid_config_is_rejected_before_touching_disk() {
        let (_temp, source, target) = setup();
        let result = builder(&source, &target).batch(0).build().run();
        assert!(matches!(result, Err(crate::error::SorterError::Config(_))));
        assert!(!target.exists());
    }

    #[test]
    fn empty_source_completes() {
        let (_temp, source, target) = setup();
        let outcome = builder(&source, &target).build().run().unwrap();

        assert_eq!(outcome.total_files, 0);
        assert!(outcome.filed.is_empty());
        assert!(!outcome.cancelled);
    }

    #[test]
    fn files_by_filename_date_and_writes_report() {
        let (_temp, source, target) = setup();
        fs::write(source.join("IMG_20190704_120000.jpg"), b"july").unwrap();

        let outcome = builder(&source, &target).build().run().unwrap();

        assert_eq!(outcome.filed.len(), 1);
        assert!(target.join("2019/07-July/IMG_20190704_120000.jpg").exists());
        assert_eq!(outcome.report_path, Some(target.join("sort_report.txt")));
        assert!(target.join("sort_report.txt").exists());
    }

    #[test]
    fn batching_does_not_change_the_result() {
        let (_temp, source, target) = setup();
        for day in 1..=5 {
            fs::write(source.join(format!("2020-03-0{}.jpg", day)), format!("d{}", day)).unwrap();
        }
        let (sender, receiver) = EventChannel::new();

        let outcome = builder(&source, &target)
            .batch(2)
            .operation(OperationMode::Copy)
            .build()
            .run_with_events(&sender)
            .unwrap();
        drop(sender);

        assert_eq!(outcome.filed.len(), 5);
        let batches = receiver
            .iter()
            .filter(|e| matches!(e, Event::Sort(SortEvent::BatchStarted { .. })))
            .count();
        assert_eq!(batches, 3);
    }

    #[test]
    fn cancelled_before_start_files_nothing() {
        let (_temp, source, target) = setup();
        fs::write(source.join("2020-03-01.jpg"), b"x").unwrap();

        let pipeline = builder(&source, &target).build();
        pipeline.cancellation_token().cancel();
        let outcome = pipeline.run().unwrap();

        assert!(outcome.cancelled);
        assert!(outcome.filed.is_empty());
        assert!(source.join("2020-03-01.jpg").exists());
    }

    #[test]
    fn cancelling_mid_sort_keeps_what_was_filed() {
        let (_temp, source, target) = setup();
        for day in 1..=5u8 {
            fs::write(source.join(format!("2020-03-0{}.jpg", day)), [day; 4]).unwrap();
        }

        let pipeline = builder(&source, &target).build();
        let token = pipeline.cancellation_token();
        // every send waits for the handler, so the cancel lands before file 3
        let (sender, receiver) = EventChannel::bounded(0);
        let handler = std::thread::spawn(move || {
            for event in receiver.iter() {
                if let Event::Sort(SortEvent::Progress(p)) = event {
                    if p.completed == 2 {
                        token.cancel();
                    }
                }
            }
        });

        let outcome = pipeline.run_with_events(&sender).unwrap();
        drop(sender);
        handler.join().unwrap();

        assert!(outcome.cancelled);
        assert_eq!(outcome.filed.len(), 2);
        assert!(target.join("2020/03-March/2020-03-02.jpg").exists());
        assert!(source.join("2020-03-03.jpg").exists());
        assert!(!target.join("2020/03-March/2020-03-03.jpg").exists());
        assert!(outcome.report_path.is_none());
    }

    #[test]
    fn hash_index_disabled_files_everything() {
        let (_temp, source, target) = setup();
        fs::write(source.join("2020-03-01.jpg"), b"x").unwrap();

        let outcome = builder(&source, &target)
            .use_index(false)
            .duplicates(DuplicatePolicy::Off)
            .build()
            .run()
            .unwrap();

        assert_eq!(outcome.filed.len(), 1);
        assert!(outcome.index_stats.is_none());
        assert!(!target.join("media_hashes.db").exists());
    }
}
