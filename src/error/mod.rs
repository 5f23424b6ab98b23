//! # Error Module
//!
//! User-friendly error types for the duplicate photo manager.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, file names, what went wrong
//! - **Absorb per-file failures** - an unreadable photo or a failed move is
//!   recorded where it happens; only structural failures reach the top level

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
///
/// Everything that ends up here aborts the run.
#[derive(Error, Debug)]
pub enum DuplicateFinderError {
    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Relocation error: {0}")]
    Relocation(#[from] RelocationError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Run was cancelled")]
    Cancelled,
}

/// Errors that occur while enumerating candidate photos
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("Permission denied accessing: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read directory {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Reasons a single photo could not be fingerprinted.
///
/// These never abort a run: the scheduler turns them into an absent
/// fingerprint for the offending path.
#[derive(Error, Debug)]
pub enum FingerprintError {
    #[error("Failed to decode image {path}: {reason}")]
    DecodeError { path: PathBuf, reason: String },

    #[error("Failed to open image file {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Fingerprint worker crashed on {path}")]
    WorkerPanicked { path: PathBuf },
}

/// Errors that occur while moving duplicates aside
#[derive(Error, Debug)]
pub enum RelocationError {
    #[error("Failed to create destination directory {path}: {source}")]
    CreateDestination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Destination exists but is not a directory: {path}")]
    DestinationNotADirectory { path: PathBuf },

    #[error("Source has no file name: {path}")]
    MissingFileName { path: PathBuf },

    #[error("Failed to move {from} to {to}: {source}")]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Copy of {from} to {to} is incomplete: expected {expected} bytes, wrote {actual}")]
    CopyVerification {
        from: PathBuf,
        to: PathBuf,
        expected: u64,
        actual: u64,
    },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, DuplicateFinderError>;
