//! # Date Module
//!
//! Decides the authoritative "date taken" for a media file.
//!
//! ## Priority chain
//! 1. Date embedded in the file name
//! 2. Embedded metadata (EXIF for images and RAW, the reader's field or the
//!    modification time for video and audio)
//! 3. Filesystem timestamps (earlier of creation and modification)
//! 4. Now, tagged `Unknown` or `Invalid`
//!
//! The first candidate inside the [`ValidityWindow`] wins. Resolution never
//! fails.

mod filename;

pub use filename::{FilenameDateParser, FilenameMatch};

use crate::core::metadata::{ExifMetadataReader, MetadataReader};
use crate::core::scanner::{MediaFile, MediaKind};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

/// Default lower bound of the validity window
pub const DEFAULT_EARLIEST_YEAR: i32 = 2004;

/// Where a date came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DateSource {
    Filename,
    Exif,
    Metadata,
    Unknown,
    Invalid,
}

impl DateSource {
    /// Tag persisted in the index
    pub fn tag(&self) -> &'static str {
        match self {
            DateSource::Filename => "FILENAME",
            DateSource::Exif => "EXIF",
            DateSource::Metadata => "METADATA",
            DateSource::Unknown => "UNKNOWN",
            DateSource::Invalid => "INVALID",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_uppercase().as_str() {
            "FILENAME" => Some(DateSource::Filename),
            "EXIF" => Some(DateSource::Exif),
            "METADATA" => Some(DateSource::Metadata),
            "UNKNOWN" => Some(DateSource::Unknown),
            "INVALID" => Some(DateSource::Invalid),
            _ => None,
        }
    }

    /// True for sources that place a file in the dated tree
    pub fn is_dated(&self) -> bool {
        matches!(
            self,
            DateSource::Filename | DateSource::Exif | DateSource::Metadata
        )
    }
}

impl fmt::Display for DateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A resolved date together with its provenance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRecord {
    pub taken: NaiveDateTime,
    pub source: DateSource,
}

impl DateRecord {
    pub fn new(taken: NaiveDateTime, source: DateSource) -> Self {
        Self { taken, source }
    }
}

/// Range of dates considered plausible for a digital capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityWindow {
    earliest: NaiveDateTime,
    latest: NaiveDateTime,
    enforced: bool,
}

impl ValidityWindow {
    /// `[earliest_year-01-01, now]`
    pub fn new(earliest_year: i32) -> Self {
        Self::between(earliest_year, Local::now().naive_local())
    }

    /// `[earliest_year-01-01, now]` with an explicit "now"
    pub fn between(earliest_year: i32, now: NaiveDateTime) -> Self {
        let earliest = NaiveDate::from_ymd_opt(earliest_year, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or(NaiveDateTime::MIN);
        Self {
            earliest,
            latest: now,
            enforced: true,
        }
    }

    /// Accept every date
    pub fn disabled() -> Self {
        let mut window = Self::new(DEFAULT_EARLIEST_YEAR);
        window.enforced = false;
        window
    }

    pub fn contains(&self, date: &NaiveDateTime) -> bool {
        !self.enforced || (self.earliest <= *date && *date <= self.latest)
    }

    pub fn is_enforced(&self) -> bool {
        self.enforced
    }

    /// The instant treated as "now" by this window
    pub fn now(&self) -> NaiveDateTime {
        self.latest
    }
}

impl Default for ValidityWindow {
    fn default() -> Self {
        Self::new(DEFAULT_EARLIEST_YEAR)
    }
}

/// Convert a filesystem timestamp to local wall-clock time
pub fn local_datetime(time: SystemTime) -> NaiveDateTime {
    DateTime::<Local>::from(time).naive_local()
}

/// Runs the priority chain
pub struct DateResolver {
    parser: FilenameDateParser,
    window: ValidityWindow,
    reader: Arc<dyn MetadataReader>,
}

impl DateResolver {
    pub fn new(window: ValidityWindow, reader: Arc<dyn MetadataReader>) -> Self {
        Self {
            parser: FilenameDateParser::new(),
            window,
            reader,
        }
    }

    /// Resolver that reads EXIF through kamadak-exif
    pub fn with_exif(window: ValidityWindow) -> Self {
        Self::new(window, Arc::new(ExifMetadataReader::new()))
    }

    pub fn window(&self) -> &ValidityWindow {
        &self.window
    }

    /// Date a file by the first valid candidate in the chain
    pub fn resolve(&self, file: &MediaFile) -> DateRecord {
        let name = file.file_name();
        let mut saw_rejected = false;

        match self.parser.parse(&name) {
            FilenameMatch::Valid(date) => {
                if self.window.contains(&date) {
                    return DateRecord::new(date, DateSource::Filename);
                }
                tracing::debug!(file = %name, %date, "File name date outside validity window");
                saw_rejected = true;
            }
            FilenameMatch::Rejected => saw_rejected = true,
            FilenameMatch::NoMatch => {}
        }

        if let Some((date, source)) = self.metadata_candidate(file) {
            if self.window.contains(&date) {
                return DateRecord::new(date, source);
            }
            tracing::debug!(file = %name, %date, "Metadata date outside validity window");
            saw_rejected = true;
        }

        if let Some(fs_date) = filesystem_date(file) {
            if self.window.contains(&fs_date) {
                return DateRecord::new(fs_date, DateSource::Metadata);
            }
            tracing::debug!(file = %name, date = %fs_date, "Filesystem date outside validity window");
            saw_rejected = true;
        }

        let source = if saw_rejected {
            DateSource::Invalid
        } else {
            DateSource::Unknown
        };
        tracing::warn!(file = %name, source = %source, "No usable date, using current time");
        DateRecord::new(self.window.now(), source)
    }

    fn metadata_candidate(&self, file: &MediaFile) -> Option<(NaiveDateTime, DateSource)> {
        match file.kind {
            MediaKind::Image | MediaKind::Raw => self
                .reader
                .capture_time(file)
                .map(|date| (date, DateSource::Exif)),
            MediaKind::Video | MediaKind::Audio => {
                let date = self
                    .reader
                    .capture_time(file)
                    .or_else(|| file.modified_time().map(local_datetime))?;
                Some((date, DateSource::Metadata))
            }
            MediaKind::Unknown => None,
        }
    }
}

/// Earlier of creation and modification time
fn filesystem_date(file: &MediaFile) -> Option<NaiveDateTime> {
    let modified = file.modified_time().map(local_datetime);
    let created = file.created.map(local_datetime);
    match (created, modified) {
        (Some(c), Some(m)) => Some(c.min(m)),
        (c, m) => c.or(m),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::{Duration, UNIX_EPOCH};

    struct FixedReader(Option<NaiveDateTime>);

    impl MetadataReader for FixedReader {
        fn capture_time(&self, _file: &MediaFile) -> Option<NaiveDateTime> {
            self.0
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn system_time(date: NaiveDateTime) -> SystemTime {
        let local = date.and_local_timezone(Local).unwrap();
        UNIX_EPOCH + Duration::from_secs(local.timestamp() as u64)
    }

    fn media(name: &str, kind: MediaKind, modified: NaiveDateTime) -> MediaFile {
        MediaFile {
            path: PathBuf::from("/src/nested/2001-01-01").join(name),
            extension: name.rsplit('.').next().unwrap_or_default().to_string(),
            kind,
            size: 10,
            modified: system_time(modified),
            created: None,
        }
    }

    fn resolver(reader: Option<NaiveDateTime>) -> DateResolver {
        DateResolver::new(
            ValidityWindow::between(2004, ymd(2024, 6, 1)),
            Arc::new(FixedReader(reader)),
        )
    }

    #[test]
    fn filename_beats_exif() {
        let file = media("IMG_20210514_101010.jpg", MediaKind::Image, ymd(2022, 1, 1));
        let record = resolver(Some(ymd(2019, 3, 3))).resolve(&file);
        assert_eq!(record.source, DateSource::Filename);
        assert_eq!(record.taken.date(), ymd(2021, 5, 14).date());
    }

    #[test]
    fn directory_names_are_ignored() {
        let file = media("holiday.jpg", MediaKind::Image, ymd(2015, 2, 2));
        let record = resolver(None).resolve(&file);
        assert_eq!(record.source, DateSource::Metadata);
        assert_eq!(record.taken, ymd(2015, 2, 2));
    }

    #[test]
    fn exif_used_when_name_has_no_date() {
        let file = media("holiday.jpg", MediaKind::Image, ymd(2022, 1, 1));
        let record = resolver(Some(ymd(2019, 3, 3))).resolve(&file);
        assert_eq!(record, DateRecord::new(ymd(2019, 3, 3), DateSource::Exif));
    }

    #[test]
    fn video_uses_modification_time_as_metadata() {
        let file = media("clip.mp4", MediaKind::Video, ymd(2018, 8, 8));
        let record = resolver(None).resolve(&file);
        assert_eq!(record, DateRecord::new(ymd(2018, 8, 8), DateSource::Metadata));
    }

    #[test]
    fn filesystem_takes_earlier_of_created_and_modified() {
        let mut file = media("scan.thm", MediaKind::Unknown, ymd(2020, 1, 1));
        file.created = Some(system_time(ymd(2010, 1, 1)));
        let record = resolver(None).resolve(&file);
        assert_eq!(record, DateRecord::new(ymd(2010, 1, 1), DateSource::Metadata));
    }

    #[test]
    fn only_out_of_window_candidates_is_invalid() {
        let file = media("old.jpg", MediaKind::Image, ymd(2001, 1, 1));
        let record = resolver(None).resolve(&file);
        assert_eq!(record.source, DateSource::Invalid);
        assert_eq!(record.taken, ymd(2024, 6, 1));
    }

    #[test]
    fn rejected_filename_makes_fallback_invalid() {
        let resolver = DateResolver::new(
            ValidityWindow::between(2004, ymd(2024, 6, 1)),
            Arc::new(FixedReader(None)),
        );
        // modification time in the future forces the fallback
        let file = media("2005035416.jpg", MediaKind::Image, ymd(2030, 1, 1));
        assert_eq!(resolver.resolve(&file).source, DateSource::Invalid);
    }

    #[test]
    fn no_timestamps_at_all_is_unknown() {
        let mut file = media("mystery.thm", MediaKind::Unknown, ymd(2020, 1, 1));
        file.modified = UNIX_EPOCH;
        let record = resolver(None).resolve(&file);
        assert_eq!(record.source, DateSource::Unknown);
    }

    #[test]
    fn disabled_validation_accepts_any_date() {
        let resolver = DateResolver::new(ValidityWindow::disabled(), Arc::new(FixedReader(None)));
        let file = media("old.jpg", MediaKind::Image, ymd(1995, 5, 5));
        assert_eq!(
            resolver.resolve(&file),
            DateRecord::new(ymd(1995, 5, 5), DateSource::Metadata)
        );
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let now = ymd(2024, 6, 1);
        let window = ValidityWindow::between(2004, now);
        let start = NaiveDate::from_ymd_opt(2004, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert!(window.contains(&start));
        assert!(window.contains(&now));
        assert!(!window.contains(&(start - chrono::Duration::seconds(1))));
        assert!(!window.contains(&(now + chrono::Duration::seconds(1))));
    }

    #[test]
    fn source_tags_roundtrip() {
        for source in [
            DateSource::Filename,
            DateSource::Exif,
            DateSource::Metadata,
            DateSource::Unknown,
            DateSource::Invalid,
        ] {
            assert_eq!(DateSource::from_tag(source.tag()), Some(source));
        }
        assert_eq!(DateSource::from_tag("bogus"), None);
    }
}
