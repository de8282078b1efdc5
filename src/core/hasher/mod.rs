//! # Hasher Module
//!
//! Computes content identifiers for exact-duplicate detection.
//!
//! ## Modes
//! - **Full** - every byte streamed through XXH3-128 in 64 KiB chunks
//! - **Turbo** - size-tiered sampling, see [`SamplePlan`]
//!
//! The digest depends only on the bytes read, never on name, path or size, so
//! the same content always yields the same [`ContentHash`].
//!
//! ## Example
//! ```rust,ignore
//! use media_sorter::core::hasher::{ContentHasher, HashMode};
//!
//! let hasher = ContentHasher::new(HashMode::Turbo);
//! let hash = hasher.hash_file(&path)?;
//! println!("{}", hash);
//! ```

mod sampling;

pub use sampling::{SamplePlan, MEDIUM_THRESHOLD, PREFIX_LEN, SAMPLE_LEN, SMALL_THRESHOLD};

use crate::error::HashError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::str::FromStr;
use xxhash_rust::xxh3::Xxh3;

/// Read buffer size for streaming
const CHUNK_SIZE: usize = 64 * 1024;

/// 128-bit content identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    /// Build from the raw digest
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// 32 lowercase hex characters
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Returned when a string is not 32 hex characters
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Not a content hash (expected 32 hex characters): {0}")]
pub struct ParseHashError(String);

impl FromStr for ContentHash {
    type Err = ParseHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != 32 || !s.is_ascii() {
            return Err(ParseHashError(s.to_string()));
        }
        let mut bytes = [0u8; 16];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16)
                .map_err(|_| ParseHashError(s.to_string()))?;
        }
        Ok(Self(bytes))
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> Self {
        hash.to_hex()
    }
}

impl TryFrom<String> for ContentHash {
    type Error = ParseHashError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Hashing strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashMode {
    /// Read every byte
    #[default]
    Full,
    /// Size-tiered sampling
    Turbo,
}

impl HashMode {
    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            HashMode::Full => "full",
            HashMode::Turbo => "turbo",
        }
    }
}

/// Computes [`ContentHash`] values for files
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentHasher {
    mode: HashMode,
}

impl ContentHasher {
    pub fn new(mode: HashMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> HashMode {
        self.mode
    }

    /// Hash a file's content according to the configured mode
    pub fn hash_file(&self, path: &Path) -> Result<ContentHash, HashError> {
        let io_err = |source| HashError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut file = File::open(path).map_err(io_err)?;
        let plan = match self.mode {
            HashMode::Full => SamplePlan::Whole,
            HashMode::Turbo => {
                let size = file.metadata().map_err(io_err)?.len();
                SamplePlan::turbo(size)
            }
        };

        let mut digest = Xxh3::new();
        match plan {
            SamplePlan::Whole => stream_into(&mut file, &mut digest).map_err(io_err)?,
            SamplePlan::Ranges(ranges) => {
                for (offset, len) in ranges {
                    file.seek(SeekFrom::Start(offset)).map_err(io_err)?;
                    stream_into(&mut (&mut file).take(len), &mut digest).map_err(io_err)?;
                }
            }
        }

        Ok(ContentHash(digest.digest128().to_be_bytes()))
    }
}

/// Feed a reader into the digest until EOF
fn stream_into<R: Read>(reader: &mut R, digest: &mut Xxh3) -> std::io::Result<()> {
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        digest.update(&buffer[..read]);
    }
}
