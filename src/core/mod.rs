//! # Core Module
//!
//! The UI-agnostic duplicate detection engine.
//!
//! ## Modules
//! - `scanner` - Discovers candidate photos in a directory tree
//! - `fingerprint` - Computes a content fingerprint for one photo
//! - `scheduler` - Runs fingerprinting on a bounded worker pool
//! - `grouper` - Groups photos with identical fingerprints
//! - `resolver` - Keeps one photo per group and moves the rest aside
//! - `pipeline` - Orchestrates the full workflow

pub mod fingerprint;
pub mod grouper;
pub mod pipeline;
pub mod resolver;
pub mod scanner;
pub mod scheduler;

// Re-export commonly used types
pub use fingerprint::{Fingerprint, FingerprintResult, Fingerprinter};
pub use grouper::DuplicateGroup;
pub use resolver::{KeepPolicy, Resolution};
pub use scanner::PhotoFile;
