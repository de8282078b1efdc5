//! # Scanner Module
//!
//! Discovers media files under a source directory.
//!
//! ## Media kinds
//! - Images (JPEG, PNG, TIFF, HEIC, ...)
//! - Camera RAW (CR2, NEF, ARW, DNG, ...)
//! - Video (MP4, MOV, MKV, ...)
//! - Audio (MP3, FLAC, M4A, ...)
//!
//! Enumeration order is deterministic (sorted by file name at every level), so
//! the first file of a duplicate group is stable between runs.

mod filter;
mod walker;

pub use filter::{
    normalize_extension, MediaFilter, MediaSelection, AUDIO_EXTENSIONS, IMAGE_EXTENSIONS,
    RAW_EXTENSIONS, VIDEO_EXTENSIONS,
};
pub use walker::{ScanConfig, WalkDirScanner};

use crate::error::ScanError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Media category derived from a file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaKind {
    Image,
    Raw,
    Video,
    Audio,
    Unknown,
}

impl MediaKind {
    /// Classify an extension (case-insensitive, leading dot optional)
    pub fn from_extension(ext: &str) -> Self {
        let ext = normalize_extension(ext);
        let ext = ext.as_str();
        if IMAGE_EXTENSIONS.contains(&ext) {
            MediaKind::Image
        } else if RAW_EXTENSIONS.contains(&ext) {
            MediaKind::Raw
        } else if VIDEO_EXTENSIONS.contains(&ext) {
            MediaKind::Video
        } else if AUDIO_EXTENSIONS.contains(&ext) {
            MediaKind::Audio
        } else {
            MediaKind::Unknown
        }
    }

    /// Tag stored in the index `media_type` column
    pub fn index_tag(&self) -> &'static str {
        match self {
            MediaKind::Image | MediaKind::Raw => "IMAGE",
            MediaKind::Video => "VIDEO",
            MediaKind::Audio => "AUDIO",
            MediaKind::Unknown => "UNKNOWN",
        }
    }

    /// Whether capture dates come from EXIF for this kind
    pub fn carries_exif(&self) -> bool {
        matches!(self, MediaKind::Image | MediaKind::Raw)
    }
}

/// Snapshot of a media file taken at scan time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFile {
    /// Absolute path to the file
    pub path: PathBuf,
    /// Lowercase extension without the dot
    pub extension: String,
    /// Category derived from the extension
    pub kind: MediaKind,
    /// File size in bytes
    pub size: u64,
    /// Last modified time, `UNIX_EPOCH` when the platform cannot report it
    pub modified: SystemTime,
    /// Creation time, where the platform reports one
    pub created: Option<SystemTime>,
}

impl MediaFile {
    /// Stat a file and build its snapshot
    pub fn from_path(path: &Path) -> Result<Self, ScanError> {
        let metadata = fs::metadata(path).map_err(|source| ScanError::ReadEntry {
            path: path.to_path_buf(),
            source,
        })?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(normalize_extension)
            .unwrap_or_default();

        Ok(Self {
            path: path.to_path_buf(),
            kind: MediaKind::from_extension(&extension),
            extension,
            size: metadata.len(),
            modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            created: metadata.created().ok(),
        })
    }

    /// Modification time, if the platform reported one
    pub fn modified_time(&self) -> Option<SystemTime> {
        (self.modified != SystemTime::UNIX_EPOCH).then_some(self.modified)
    }

    /// File name component, lossily converted
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Result of a scan
#[derive(Debug)]
pub struct ScanResult {
    /// Discovered files, in enumeration order
    pub files: Vec<MediaFile>,
    /// Entries that could not be read (non-fatal)
    pub errors: Vec<ScanError>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_lowercase() {
        assert_eq!(MediaKind::from_extension("jpg"), MediaKind::Image);
        assert_eq!(MediaKind::from_extension("cr3"), MediaKind::Raw);
        assert_eq!(MediaKind::from_extension("mov"), MediaKind::Video);
        assert_eq!(MediaKind::from_extension("opus"), MediaKind::Audio);
    }

    #[test]
    fn classify_is_case_insensitive_and_accepts_dot() {
        assert_eq!(MediaKind::from_extension(".JPG"), MediaKind::Image);
        assert_eq!(MediaKind::from_extension("NEF"), MediaKind::Raw);
        assert_eq!(MediaKind::from_extension(".Mp4"), MediaKind::Video);
    }

    #[test]
    fn unknown_extension() {
        assert_eq!(MediaKind::from_extension("pdf"), MediaKind::Unknown);
        assert_eq!(MediaKind::from_extension(""), MediaKind::Unknown);
    }

    #[test]
    fn raw_is_indexed_as_image() {
        assert_eq!(MediaKind::Raw.index_tag(), "IMAGE");
        assert_eq!(MediaKind::Video.index_tag(), "VIDEO");
        assert!(MediaKind::Raw.carries_exif());
        assert!(!MediaKind::Audio.carries_exif());
    }

    #[test]
    fn media_file_snapshot() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("Clip.MOV");
        std::fs::write(&path, b"1234567").unwrap();

        let file = MediaFile::from_path(&path).unwrap();
        assert_eq!(file.extension, "mov");
        assert_eq!(file.kind, MediaKind::Video);
        assert_eq!(file.size, 7);
        assert_eq!(file.file_name(), "Clip.MOV");
    }

    #[test]
    fn media_file_missing_is_error() {
        assert!(MediaFile::from_path(Path::new("/nonexistent/x.jpg")).is_err());
    }
}
