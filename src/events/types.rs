//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// All events emitted by the duplicate finder pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Enumeration phase events
    Scan(ScanEvent),
    /// Fingerprinting phase events
    Fingerprint(FingerprintEvent),
    /// Grouping phase events
    Group(GroupEvent),
    /// Relocation phase events
    Relocate(RelocateEvent),
    /// Pipeline-level events
    Pipeline(PipelineEvent),
}

/// Events during the enumeration phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScanEvent {
    /// Scanning has started
    Started { root: PathBuf },
    /// A candidate photo was found
    PhotoFound { path: PathBuf },
    /// An entry could not be read but scanning continues
    Error { path: PathBuf, message: String },
    /// Scanning completed
    Completed { total_photos: usize },
}

/// Events during the fingerprinting phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FingerprintEvent {
    /// Fingerprinting has started
    Started { total_photos: usize, workers: usize },
    /// One more photo finished, in whatever order the workers complete
    Progress(FingerprintProgress),
    /// A photo could not be fingerprinted and is left out of grouping
    Unreadable { path: PathBuf, message: String },
    /// All photos have been fingerprinted
    Completed {
        fingerprinted: usize,
        unreadable: usize,
    },
}

/// Progress snapshot delivered after every completed fingerprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintProgress {
    /// Number of photos finished so far
    pub completed: usize,
    /// Total number of photos to fingerprint
    pub total: usize,
    /// Time since fingerprinting started, in milliseconds
    pub elapsed_ms: u64,
    /// The photo that just finished
    pub current_path: PathBuf,
}

impl FingerprintProgress {
    /// Estimated time remaining, extrapolated from the average time per photo.
    ///
    /// Returns `None` before the first photo completes.
    pub fn eta(&self) -> Option<Duration> {
        if self.completed == 0 {
            return None;
        }
        let remaining = self.total.saturating_sub(self.completed) as u64;
        let per_photo = self.elapsed_ms as f64 / self.completed as f64;
        Some(Duration::from_millis((per_photo * remaining as f64) as u64))
    }

    /// Fraction done in the range 0.0..=1.0
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.completed as f64 / self.total as f64
    }
}

/// Events during the grouping phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GroupEvent {
    /// Grouping completed
    Completed {
        total_groups: usize,
        total_duplicates: usize,
    },
}

/// Events during the relocation phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RelocateEvent {
    /// Relocation has started
    Started { destination: PathBuf, groups: usize },
    /// A duplicate was moved aside
    Moved { from: PathBuf, to: PathBuf },
    /// A duplicate could not be moved; relocation continues
    Failed { path: PathBuf, message: String },
    /// Relocation completed
    Completed { moved: usize, failed: usize },
}

/// Pipeline-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// Pipeline has started
    Started,
    /// Moving to a new phase
    PhaseChanged { phase: PipelinePhase },
    /// Pipeline completed successfully
    Completed { summary: PipelineSummary },
    /// Pipeline was cancelled
    Cancelled,
    /// Pipeline encountered a fatal error
    Error { message: String },
}

/// Phases of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelinePhase {
    Scanning,
    Fingerprinting,
    Grouping,
    Relocating,
}

/// Summary of pipeline results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Total candidate photos found
    pub total_photos: usize,
    /// Number of duplicate groups found
    pub duplicate_groups: usize,
    /// Total number of duplicate photos (excluding the retained ones)
    pub duplicate_count: usize,
    /// Number of photos actually moved aside
    pub moved_count: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl std::fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelinePhase::Scanning => write!(f, "Scanning"),
            PipelinePhase::Fingerprinting => write!(f, "Fingerprinting"),
            PipelinePhase::Grouping => write!(f, "Grouping"),
            PipelinePhase::Relocating => write!(f, "Relocating"),
        }
    }
}
