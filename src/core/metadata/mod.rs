//! # Metadata Module
//!
//! Reads embedded capture timestamps from media files.
//!
//! ## Sources
//! - Images and RAW: EXIF `DateTimeOriginal`, then `DateTimeDigitized`,
//!   then `DateTime`
//! - Video and audio: no container parser is bundled, so the default reader
//!   reports nothing and the resolver falls back to the modification time
//!
//! Any read or parse failure simply yields `None`.

use crate::core::scanner::MediaFile;
use chrono::{NaiveDate, NaiveDateTime};
use exif::{In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Source of embedded capture timestamps
pub trait MetadataReader: Send + Sync {
    /// Capture time recorded inside the file, if any
    fn capture_time(&self, file: &MediaFile) -> Option<NaiveDateTime>;
}

/// Default reader backed by kamadak-exif
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifMetadataReader;

impl ExifMetadataReader {
    pub fn new() -> Self {
        Self
    }
}

impl MetadataReader for ExifMetadataReader {
    fn capture_time(&self, file: &MediaFile) -> Option<NaiveDateTime> {
        if file.kind.carries_exif() {
            read_exif_date(&file.path)
        } else {
            None
        }
    }
}

/// Tags consulted, most specific first
const DATE_TAGS: [Tag; 3] = [Tag::DateTimeOriginal, Tag::DateTimeDigitized, Tag::DateTime];

/// Extract the capture date from a file's EXIF block
pub fn read_exif_date(path: &Path) -> Option<NaiveDateTime> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    let exif = match Reader::new().read_from_container(&mut reader) {
        Ok(exif) => exif,
        Err(e) => {
            tracing::trace!(path = %path.display(), "No EXIF data: {}", e);
            return None;
        }
    };

    DATE_TAGS.iter().find_map(|tag| {
        let field = exif.get_field(*tag, In::PRIMARY)?;
        match field.value {
            Value::Ascii(ref values) => values
                .first()
                .and_then(|bytes| std::str::from_utf8(bytes).ok())
                .and_then(parse_exif_datetime),
            _ => parse_exif_datetime(&field.display_value().to_string()),
        }
    })
}

/// Parse an EXIF timestamp.
///
/// Accepts the standard `YYYY:MM:DD HH:MM:SS` form as well as the
/// dash-separated and quoted variants some writers emit. A date without a
/// usable time part is taken at midnight.
pub fn parse_exif_datetime(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim().trim_matches('"').trim_end_matches('\0').trim();

    for format in ["%Y:%m:%d %H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y:%m:%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }

    let date_part = s.split_whitespace().next()?.replace(':', "-");
    NaiveDate::parse_from_str(&date_part, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scanner::MediaKind;
    use std::path::PathBuf;
    use std::time::SystemTime;

    fn dt(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn parses_standard_exif_format() {
        assert_eq!(
            parse_exif_datetime("2024:01:15 14:30:00"),
            Some(dt(2024, 1, 15, 14, 30, 0))
        );
    }

    #[test]
    fn parses_display_variants() {
        assert_eq!(
            parse_exif_datetime("\"2024-01-15 14:30:00\""),
            Some(dt(2024, 1, 15, 14, 30, 0))
        );
        assert_eq!(
            parse_exif_datetime("2019:07:04 10:11:12\0"),
            Some(dt(2019, 7, 4, 10, 11, 12))
        );
    }

    #[test]
    fn date_only_is_midnight() {
        assert_eq!(
            parse_exif_datetime("2010:02:03"),
            Some(dt(2010, 2, 3, 0, 0, 0))
        );
    }

    #[test]
    fn rejects_blank_and_garbage() {
        assert_eq!(parse_exif_datetime("    :  :     :  :  "), None);
        assert_eq!(parse_exif_datetime("not a date"), None);
    }

    #[test]
    fn missing_file_has_no_date() {
        assert_eq!(read_exif_date(Path::new("/nonexistent/file.jpg")), None);
    }

    #[test]
    fn file_without_exif_has_no_date() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("plain.jpg");
        std::fs::write(&path, [0xFF, 0xD8, 0xFF, 0xD9]).unwrap();
        assert_eq!(read_exif_date(&path), None);
    }

    #[test]
    fn video_has_no_embedded_date() {
        let file = MediaFile {
            path: PathBuf::from("/nonexistent/clip.mp4"),
            extension: "mp4".into(),
            kind: MediaKind::Video,
            size: 0,
            modified: SystemTime::UNIX_EPOCH,
            created: None,
        };
        assert_eq!(ExifMetadataReader::new().capture_time(&file), None);
    }
}
