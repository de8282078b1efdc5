//! Extension classification and file selection for the scanner.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Still image formats
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "tiff", "tif", "bmp", "gif", "webp", "heic", "heif",
];

/// Camera RAW formats
pub const RAW_EXTENSIONS: &[&str] = &[
    "cr2", "cr3", "crw", "nef", "arw", "dng", "raf", "orf", "rw2", "pef", "srw", "raw",
];

/// Video container formats
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "avi", "mov", "mkv", "wmv", "flv", "webm", "m4v", "3gp", "mpg", "mpeg",
];

/// Audio formats
pub const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "wav", "flac", "aac", "ogg", "m4a", "wma", "opus", "aiff", "alac",
];

/// Normalize a user-supplied extension: trimmed, lowercase, no leading dot.
pub fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}

/// Which media kinds a run should pick up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaSelection {
    pub images: bool,
    pub raw: bool,
    pub video: bool,
    pub audio: bool,
}

impl Default for MediaSelection {
    fn default() -> Self {
        Self {
            images: true,
            raw: false,
            video: false,
            audio: false,
        }
    }
}

impl MediaSelection {
    /// Every supported kind
    pub fn all() -> Self {
        Self {
            images: true,
            raw: true,
            video: true,
            audio: true,
        }
    }

    /// Human-readable list of the selected kinds
    pub fn describe(&self) -> String {
        let mut kinds = Vec::new();
        if self.images {
            kinds.push("images");
        }
        if self.raw {
            kinds.push("raw");
        }
        if self.video {
            kinds.push("video");
        }
        if self.audio {
            kinds.push("audio");
        }
        if kinds.is_empty() {
            "none".to_string()
        } else {
            kinds.join(", ")
        }
    }
}

/// Decides which files a run processes
#[derive(Debug, Clone)]
pub struct MediaFilter {
    /// Extensions to include (lowercase, no dot)
    extensions: HashSet<String>,
    /// Whether to include hidden files
    include_hidden: bool,
}

impl MediaFilter {
    /// Build a filter from the selected media kinds
    pub fn new(selection: MediaSelection) -> Self {
        let mut extensions = HashSet::new();
        let groups = [
            (selection.images, IMAGE_EXTENSIONS),
            (selection.raw, RAW_EXTENSIONS),
            (selection.video, VIDEO_EXTENSIONS),
            (selection.audio, AUDIO_EXTENSIONS),
        ];
        for (enabled, list) in groups {
            if enabled {
                extensions.extend(list.iter().map(|e| e.to_string()));
            }
        }

        Self {
            extensions,
            include_hidden: false,
        }
    }

    /// Build a filter from an explicit extension list such as `".crw, .thm"`
    /// or `"crw thm"`. The list replaces the kind selection entirely.
    pub fn from_custom_list(list: &str) -> Self {
        let extensions = list
            .replace(',', " ")
            .split_whitespace()
            .map(normalize_extension)
            .filter(|e| !e.is_empty())
            .collect();

        Self {
            extensions,
            include_hidden: false,
        }
    }

    /// Include hidden files (starting with .)
    pub fn with_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    /// Extensions accepted by this filter, sorted
    pub fn extensions(&self) -> Vec<&str> {
        let mut list: Vec<&str> = self.extensions.iter().map(String::as_str).collect();
        list.sort_unstable();
        list
    }

    /// Check if a file should be included
    pub fn should_include(&self, path: &Path) -> bool {
        if !self.include_hidden {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.starts_with('.') {
                    return false;
                }
            }
        }

        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => self.extensions.contains(&ext.to_lowercase()),
            None => false,
        }
    }
}

impl Default for MediaFilter {
    fn default() -> Self {
        Self::new(MediaSelection::default())
    }
}
