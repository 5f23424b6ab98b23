//! Pipeline execution implementation.

use crate::core::fingerprint::{Fingerprinter, PerceptualFingerprinter};
use crate::core::grouper::{into_stable_order, DuplicateGroup, DuplicateGrouper};
use crate::core::resolver::{DuplicateResolver, KeepPolicy, RelocationFailure, Resolution};
use crate::core::scanner::{PhotoScanner, ScanConfig, WalkDirScanner};
use crate::core::scheduler::{CancellationToken, FingerprintScheduler};
use crate::error::DuplicateFinderError;
use crate::events::{
    Event, EventSender, GroupEvent, PipelineEvent, PipelinePhase, PipelineSummary, null_sender,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Result of pipeline execution
#[derive(Debug)]
pub struct PipelineResult {
    /// All duplicate groups found
    pub groups: Vec<DuplicateGroup>,
    /// Total candidate photos found
    pub total_photos: usize,
    /// Combined size of the candidate photos at scan time
    pub scanned_bytes: u64,
    /// Photos that produced a fingerprint
    pub fingerprinted: usize,
    /// Photos that could not be fingerprinted (only filled when requested)
    pub unreadable: Vec<PathBuf>,
    /// Per-group relocation outcomes (empty in report-only mode)
    pub resolutions: Vec<Resolution>,
    /// Entries the scanner could not read (non-fatal)
    pub scan_errors: Vec<String>,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl PipelineResult {
    /// Number of redundant copies across all groups
    pub fn duplicate_count(&self) -> usize {
        self.groups.iter().map(|g| g.duplicate_count()).sum()
    }

    /// Number of photos actually moved aside
    pub fn moved_count(&self) -> usize {
        self.resolutions.iter().map(|r| r.relocated.len()).sum()
    }

    /// Bytes moved out of the source tree
    pub fn reclaimed_bytes(&self) -> u64 {
        self.resolutions
            .iter()
            .flat_map(|r| &r.relocated)
            .map(|m| m.size_bytes)
            .sum()
    }

    /// Every move that failed, across all groups
    pub fn relocation_failures(&self) -> impl Iterator<Item = &RelocationFailure> {
        self.resolutions.iter().flat_map(|r| &r.failures)
    }
}

/// Configuration for the pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory to scan
    pub source: PathBuf,
    /// Destination root; `None` means report only
    pub destination: Option<PathBuf>,
    /// Worker threads for fingerprinting (0 = one per CPU)
    pub workers: usize,
    /// Which member of a group stays in place
    pub keep_policy: KeepPolicy,
    /// Collect the paths of photos that could not be fingerprinted
    pub report_unreadable: bool,
    /// Present groups sorted by path instead of completion order
    pub stable_order: bool,
    /// Scanner configuration
    pub scan_config: ScanConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            destination: None,
            workers: 0,
            keep_policy: KeepPolicy::Largest,
            report_unreadable: false,
            stable_order: true,
            scan_config: ScanConfig::default(),
        }
    }
}

/// Builder for pipeline configuration
pub struct PipelineBuilder {
    config: PipelineConfig,
    fingerprinter: Option<Arc<dyn Fingerprinter>>,
    cancellation: CancellationToken,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            fingerprinter: None,
            cancellation: CancellationToken::new(),
        }
    }

    /// Set the directory to scan
    pub fn source(mut self, source: impl Into<PathBuf>) -> Self {
        self.config.source = source.into();
        self
    }

    /// Move duplicates under this root (into its `duplicates` folder)
    pub fn destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.config.destination = Some(destination.into());
        self
    }

    /// Set the number of fingerprint workers (0 = one per CPU)
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    /// Set the retention policy
    pub fn keep_policy(mut self, policy: KeepPolicy) -> Self {
        self.config.keep_policy = policy;
        self
    }

    /// List photos that could not be fingerprinted in the result
    pub fn report_unreadable(mut self, report: bool) -> Self {
        self.config.report_unreadable = report;
        self
    }

    /// Sort groups by path before returning them
    pub fn stable_order(mut self, stable: bool) -> Self {
        self.config.stable_order = stable;
        self
    }

    /// Skip dot-files and dot-directories
    pub fn skip_hidden(mut self, skip: bool) -> Self {
        self.config.scan_config.skip_hidden = skip;
        self
    }

    /// Set scanner configuration
    pub fn scan_config(mut self, config: ScanConfig) -> Self {
        self.config.scan_config = config;
        self
    }

    /// Replace the default perceptual fingerprinter
    pub fn fingerprinter(mut self, fingerprinter: Arc<dyn Fingerprinter>) -> Self {
        self.fingerprinter = Some(fingerprinter);
        self
    }

    /// Abort the run when this token is cancelled
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Build the pipeline
    pub fn build(self) -> Pipeline {
        Pipeline {
            config: self.config,
            fingerprinter: self
                .fingerprinter
                .unwrap_or_else(|| Arc::new(PerceptualFingerprinter::new())),
            cancellation: self.cancellation,
        }
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The duplicate detection pipeline
pub struct Pipeline {
    config: PipelineConfig,
    fingerprinter: Arc<dyn Fingerprinter>,
    cancellation: CancellationToken,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// The configuration this pipeline runs with
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the pipeline without events
    pub fn run(&self) -> Result<PipelineResult, DuplicateFinderError> {
        self.run_with_events(&null_sender())
    }

    /// Run the pipeline with event reporting
    pub fn run_with_events(
        &self,
        events: &EventSender,
    ) -> Result<PipelineResult, DuplicateFinderError> {
        events.send(Event::Pipeline(PipelineEvent::Started));

        let outcome = self.execute(events);

        match &outcome {
            Ok(result) => {
                events.send(Event::Pipeline(PipelineEvent::Completed {
                    summary: PipelineSummary {
                        total_photos: result.total_photos,
                        duplicate_groups: result.groups.len(),
                        duplicate_count: result.duplicate_count(),
                        moved_count: result.moved_count(),
                        duration_ms: result.duration_ms,
                    },
                }));
            }
            Err(DuplicateFinderError::Cancelled) => {
                events.send(Event::Pipeline(PipelineEvent::Cancelled));
            }
            Err(e) => {
                events.send(Event::Pipeline(PipelineEvent::Error {
                    message: e.to_string(),
                }));
            }
        }

        outcome
    }

    fn execute(&self, events: &EventSender) -> Result<PipelineResult, DuplicateFinderError> {
        let start_time = Instant::now();

        // Phase 1: Scanning
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Scanning,
        }));

        let scanner = WalkDirScanner::new(self.config.scan_config.clone())
            .with_cancellation(self.cancellation.clone());
        let scan_result = scanner.scan_with_events(&self.config.source, events)?;

        if self.cancellation.is_cancelled() {
            return Err(DuplicateFinderError::Cancelled);
        }

        let scan_errors: Vec<String> = scan_result.errors.iter().map(|e| e.to_string()).collect();
        let scanned_bytes: u64 = scan_result.photos.iter().map(|p| p.size).sum();
        let paths: Vec<PathBuf> = scan_result.photos.into_iter().map(|p| p.path).collect();
        let total_photos = paths.len();
        info!(total_photos, scanned_bytes, source = %self.config.source.display(), "scan complete");

        // The destination is created up front so an unusable one fails fast
        let resolver = match &self.config.destination {
            Some(root) => Some(self.resolver_for(root)?),
            None => None,
        };

        // Phase 2: Fingerprinting
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Fingerprinting,
        }));

        let scheduler =
            FingerprintScheduler::new(Arc::clone(&self.fingerprinter), self.config.workers)?
                .with_cancellation(self.cancellation.clone());
        let results = scheduler.run_with_events(&paths, events)?;

        let unreadable: Vec<PathBuf> = if self.config.report_unreadable {
            let mut unreadable: Vec<PathBuf> = results
                .iter()
                .filter(|r| r.is_unreadable())
                .map(|r| r.path().to_path_buf())
                .collect();
            unreadable.sort();
            unreadable
        } else {
            Vec::new()
        };
        let fingerprinted = results.iter().filter(|r| !r.is_unreadable()).count();

        // Phase 3: Grouping
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Grouping,
        }));

        let mut groups = DuplicateGrouper::new().group(results);
        if self.config.stable_order {
            groups = into_stable_order(groups);
        }

        events.send(Event::Group(GroupEvent::Completed {
            total_groups: groups.len(),
            total_duplicates: groups.iter().map(|g| g.duplicate_count()).sum(),
        }));
        info!(groups = groups.len(), "grouping complete");

        // Phase 4: Relocating (only when a destination was given)
        let resolutions = match resolver {
            Some(resolver) if !groups.is_empty() => {
                events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
                    phase: PipelinePhase::Relocating,
                }));
                resolver.resolve_all(&groups, events)
            }
            _ => Vec::new(),
        };

        if self.cancellation.is_cancelled() {
            let moved: usize = resolutions.iter().map(|r| r.relocated.len()).sum();
            warn!(moved, "cancelled during relocation, moved files stay in the duplicates folder");
            return Err(DuplicateFinderError::Cancelled);
        }

        Ok(PipelineResult {
            groups,
            total_photos,
            scanned_bytes,
            fingerprinted,
            unreadable,
            resolutions,
            scan_errors,
            duration_ms: start_time.elapsed().as_millis() as u64,
        })
    }

    fn resolver_for(&self, root: &Path) -> Result<DuplicateResolver, DuplicateFinderError> {
        Ok(DuplicateResolver::new(root)?
            .with_policy(self.config.keep_policy)
            .with_cancellation(self.cancellation.clone()))
    }
}
