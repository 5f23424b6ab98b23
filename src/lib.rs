//! # Photo Duplicate Manager
//!
//! Finds photos that are exact duplicates of each other and, on request,
//! moves the redundant copies into a separate folder while the largest copy
//! stays where it is.
//!
//! ## Guarantees
//! - **Nothing is deleted** - duplicates are moved, never removed
//! - **Nothing is overwritten** - clashing names get a numeric suffix
//! - **One bad photo never stops a scan** - unreadable files are skipped
//!
//! ## Architecture
//! - `core` - The duplicate detection engine
//! - `events` - Event-driven progress reporting
//! - `error` - User-friendly error types

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{DuplicateFinderError, Result};

/// Initialize tracing for the library
///
/// This should be called once by the application entry point. Log output
/// goes to stderr and is filtered through `RUST_LOG`.
pub fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set global default tracing subscriber");
}
