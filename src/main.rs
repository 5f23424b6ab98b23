//! # photo-dupes CLI
//!
//! Command-line interface for the duplicate photo manager.
//!
//! ## Usage
//! ```bash
//! photo-dupes ~/Pictures
//! photo-dupes ~/Pictures -m ~/Sorted
//! ```

mod cli;

use std::process::ExitCode;

fn main() -> ExitCode {
    photo_duplicate_manager::init_tracing();
    cli::run()
}
