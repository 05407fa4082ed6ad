//! File fingerprints used to detect drift of live files.
//!
//! A fingerprint pairs the modification time of a file with the SHA-256 of
//! its content. Two fingerprints differing in either field means the file
//! changed between the two captures.

use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;
use std::time::UNIX_EPOCH;

const HASH_BUFFER_SIZE: usize = 8192;

/// Modification time and content hash of a live file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    modified_at: u64,
    content_hash: String,
}

impl Fingerprint {
    /// Creates a fingerprint from raw parts.
    #[must_use]
    pub fn new(modified_at: u64, content_hash: impl Into<String>) -> Self {
        Self {
            modified_at,
            content_hash: content_hash.into(),
        }
    }

    /// The fingerprint of a file that does not exist: `(0, "")`.
    #[must_use]
    pub const fn absent() -> Self {
        Self {
            modified_at: 0,
            content_hash: String::new(),
        }
    }

    /// Captures the fingerprint of the file at `path`.
    ///
    /// A missing file yields [`Fingerprint::absent`].
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not a regular file or cannot be read.
    pub fn of_file(path: &Path) -> io::Result<Self> {
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::absent()),
            Err(err) => return Err(err),
        };
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a regular file: {}", path.display()),
            ));
        }

        let modified_at = metadata
            .modified()?
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX));

        match hash_file(path) {
            Ok(content_hash) => Ok(Self {
                modified_at,
                content_hash,
            }),
            // Removed between stat and open.
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::absent()),
            Err(err) => Err(err),
        }
    }

    /// Modification time in nanoseconds since the Unix epoch, 0 if absent.
    #[must_use]
    pub fn modified_at(&self) -> u64 {
        self.modified_at
    }

    /// Lowercase hex SHA-256 of the content, empty if absent.
    #[must_use]
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    /// Returns true if this is the fingerprint of a missing file.
    #[must_use]
    pub fn is_absent(&self) -> bool {
        self.modified_at == 0 && self.content_hash.is_empty()
    }
}

/// Computes the lowercase hex SHA-256 of a file, streaming its content.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; HASH_BUFFER_SIZE];
    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Computes the lowercase hex SHA-256 of a byte slice.
#[must_use]
pub fn hash_bytes(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}
