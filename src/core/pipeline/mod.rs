//! # Pipeline Module
//!
//! Orchestrates the full duplicate detection workflow.
//!
//! ## Pipeline Stages
//! 1. **Scan** - Find candidate photos under the source directory
//! 2. **Fingerprint** - Compute fingerprints on a bounded worker pool
//! 3. **Group** - Collect photos with identical fingerprints
//! 4. **Relocate** - Move all but the retained photo aside (only when a
//!    destination is configured)
//!
//! Grouping waits for every fingerprint, so memory grows with the number of
//! photos rather than with the number of duplicates.

mod executor;

pub use executor::{Pipeline, PipelineBuilder, PipelineConfig, PipelineResult};
pub use crate::core::scheduler::CancellationToken;
