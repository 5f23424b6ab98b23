//! # Fingerprint Module
//!
//! Turns one photo into a deterministic content fingerprint.
//!
//! Two photos are exact duplicates if and only if their fingerprints are
//! equal. A photo that cannot be decoded has no fingerprint at all and is
//! left out of grouping.
//!
//! ## Example
//! ```rust,ignore
//! use photo_duplicate_manager::core::fingerprint::{Fingerprinter, PerceptualFingerprinter};
//!
//! let fingerprinter = PerceptualFingerprinter::new();
//! let fingerprint = fingerprinter.fingerprint(Path::new("IMG_0001.jpg"))?;
//! println!("{fingerprint}");
//! ```

mod perceptual;

pub use perceptual::PerceptualFingerprinter;

use crate::error::FingerprintError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// A content fingerprint in its fixed textual form (lowercase hex)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Build a fingerprint from raw digest bytes
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(bytes.iter().map(|b| format!("{:02x}", b)).collect())
    }

    /// The fingerprint as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Fingerprint {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Fingerprint {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One photo paired with its fingerprint, or `None` if it was unreadable.
///
/// Produced exactly once per candidate path and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintResult {
    path: PathBuf,
    fingerprint: Option<Fingerprint>,
}

impl FingerprintResult {
    /// Pair a path with its fingerprint (or absence marker)
    pub fn new(path: PathBuf, fingerprint: Option<Fingerprint>) -> Self {
        Self { path, fingerprint }
    }

    /// Result for a photo that could not be fingerprinted
    pub fn unreadable(path: PathBuf) -> Self {
        Self::new(path, None)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn fingerprint(&self) -> Option<&Fingerprint> {
        self.fingerprint.as_ref()
    }

    pub fn is_unreadable(&self) -> bool {
        self.fingerprint.is_none()
    }

    pub fn into_parts(self) -> (PathBuf, Option<Fingerprint>) {
        (self.path, self.fingerprint)
    }
}

/// Computes a fingerprint for a single photo.
///
/// Implementations must be pure: same file contents, same fingerprint, and no
/// state shared between calls, since the scheduler runs them concurrently.
pub trait Fingerprinter: Send + Sync {
    /// Fingerprint the photo at `path` without modifying it
    fn fingerprint(&self, path: &Path) -> Result<Fingerprint, FingerprintError>;
}
