//! # CLI Module
//!
//! Command-line interface for the duplicate photo manager.
//!
//! ## Usage
//! ```bash
//! # Report duplicates only
//! photo-dupes ~/Pictures
//!
//! # Move lower-byte-size duplicates into ~/Sorted/duplicates/
//! photo-dupes ~/Pictures -m ~/Sorted
//!
//! # JSON output, 4 workers
//! photo-dupes ~/Pictures --output json --jobs 4
//! ```

use clap::{Parser, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use photo_duplicate_manager::core::grouper::DuplicateGroup;
use photo_duplicate_manager::core::pipeline::{CancellationToken, Pipeline, PipelineResult};
use photo_duplicate_manager::core::resolver::KeepPolicy;
use photo_duplicate_manager::error::DuplicateFinderError;
use photo_duplicate_manager::events::{Event, EventChannel, FingerprintEvent, PipelineEvent};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;
use tracing::warn;

/// Exit code after Ctrl+C (128 + SIGINT)
const EXIT_CODE_INTERRUPTED: u8 = 130;

/// Photo Duplicate Manager - find exact duplicate photos and move the extras aside
#[derive(Parser, Debug)]
#[command(name = "photo-dupes")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory to scan (recursively)
    source: PathBuf,

    /// Move lower-byte-size duplicates into <DEST>/duplicates/
    #[arg(short = 'm', long = "move-to", value_name = "DEST")]
    move_to: Option<PathBuf>,

    /// Number of fingerprint workers (default: one per CPU)
    #[arg(short = 'j', long, default_value = "0")]
    jobs: usize,

    /// Which copy of a duplicate set stays in place
    #[arg(long, default_value = "largest")]
    keep: Keep,

    /// Output format
    #[arg(short, long, default_value = "pretty")]
    output: OutputFormat,

    /// List photos that could not be read
    #[arg(long)]
    show_unreadable: bool,

    /// Show groups in discovery order instead of sorted by path
    #[arg(long)]
    unordered: bool,

    /// Skip dot-files and dot-directories
    #[arg(long)]
    skip_hidden: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Keep {
    /// Keep the largest file (first one on ties)
    Largest,
    /// Keep the first file of each group
    First,
}

impl From<Keep> for KeepPolicy {
    fn from(keep: Keep) -> Self {
        match keep {
            Keep::Largest => KeepPolicy::Largest,
            Keep::First => KeepPolicy::First,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
    /// Minimal output (one redundant path per line)
    Minimal,
}

/// Run the CLI
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let term = Term::stderr();

    match run_scan(&cli, &term) {
        Ok(()) => ExitCode::SUCCESS,
        Err(DuplicateFinderError::Cancelled) => {
            term.write_line(&format!("{}", style("Interrupted.").yellow())).ok();
            ExitCode::from(EXIT_CODE_INTERRUPTED)
        }
        Err(e) => {
            term.write_line(&format!("{} {}", style("error:").red().bold(), e)).ok();
            ExitCode::FAILURE
        }
    }
}

fn run_scan(cli: &Cli, term: &Term) -> Result<(), DuplicateFinderError> {
    let pretty = matches!(cli.output, OutputFormat::Pretty);
    let keep_policy = KeepPolicy::from(cli.keep);

    if pretty {
        term.write_line(&format!(
            "{} {}",
            style("Photo Duplicate Manager").bold().cyan(),
            style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
        ))
        .ok();
        term.write_line("").ok();
    }

    let cancellation = CancellationToken::new();
    let handler_token = cancellation.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_token.cancel()) {
        warn!(error = %e, "could not install Ctrl+C handler");
    }

    let mut builder = Pipeline::builder()
        .source(cli.source.clone())
        .workers(cli.jobs)
        .keep_policy(keep_policy)
        .report_unreadable(cli.show_unreadable)
        .stable_order(!cli.unordered)
        .skip_hidden(cli.skip_hidden)
        .cancellation(cancellation);

    if let Some(dest) = &cli.move_to {
        builder = builder.destination(dest.clone());
    }

    let pipeline = builder.build();

    let (sender, receiver) = EventChannel::new();

    let progress = if pretty {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();

    // Render progress on its own thread so the workers never wait on the terminal
    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            let Some(ref pb) = progress_clone else {
                continue;
            };
            match event {
                Event::Pipeline(PipelineEvent::PhaseChanged { phase }) => {
                    pb.set_message(format!("{}", phase));
                }
                Event::Fingerprint(FingerprintEvent::Started { total_photos, .. }) => {
                    pb.set_length(total_photos as u64);
                }
                Event::Fingerprint(FingerprintEvent::Progress(p)) => {
                    pb.set_position(p.completed as u64);
                    if let Some(eta) = p.eta() {
                        pb.set_message(format!("ETA: {:.1}s", eta.as_secs_f64()));
                    }
                }
                Event::Pipeline(
                    PipelineEvent::Completed { .. }
                    | PipelineEvent::Cancelled
                    | PipelineEvent::Error { .. },
                ) => {
                    pb.finish_and_clear();
                }
                _ => {}
            }
        }
    });

    let result = pipeline.run_with_events(&sender);

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();

    let result = result?;

    match cli.output {
        OutputFormat::Pretty => print_pretty_results(term, cli, keep_policy, &result),
        OutputFormat::Json => print_json_results(&cli.source, &result),
        OutputFormat::Minimal => print_minimal_results(keep_policy, &result),
    }

    Ok(())
}

/// The member that stays in place: the one actually retained when files were
/// moved, otherwise the one the policy would keep.
fn retained_member<'a>(
    group: &'a DuplicateGroup,
    index: usize,
    result: &'a PipelineResult,
    policy: KeepPolicy,
) -> Option<&'a PathBuf> {
    if let Some(resolution) = result.resolutions.get(index) {
        return Some(&resolution.retained);
    }
    let sizes: Vec<u64> = group
        .photos
        .iter()
        .map(|p| std::fs::metadata(p).map(|m| m.len()).unwrap_or(0))
        .collect();
    policy.select(&sizes).map(|i| &group.photos[i])
}

fn print_pretty_results(term: &Term, cli: &Cli, policy: KeepPolicy, result: &PipelineResult) {
    term.write_line(&format!(
        "{} Comparison results in '{}':",
        style("✓").green().bold(),
        cli.source.display()
    ))
    .ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} photos ({}) scanned in {:.2}s",
        style(result.total_photos).cyan(),
        format_bytes(result.scanned_bytes),
        result.duration_ms as f64 / 1000.0
    ))
    .ok();
    term.write_line(&format!(
        "  {} duplicate groups, {} redundant copies",
        style(result.groups.len()).cyan(),
        style(result.duplicate_count()).cyan()
    ))
    .ok();

    let unreadable = result.total_photos - result.fingerprinted;
    if unreadable > 0 {
        term.write_line(&format!(
            "  {} photos could not be read",
            style(unreadable).dim()
        ))
        .ok();
    }
    term.write_line("").ok();

    if result.groups.is_empty() {
        term.write_line("  No exact duplicates found.").ok();
    } else {
        for (i, group) in result.groups.iter().enumerate() {
            let keep = retained_member(group, i, result, policy);

            term.write_line(&format!(
                "  {} ({} photos)",
                style(format!("Group {}:", i + 1)).bold(),
                group.photos.len()
            ))
            .ok();

            for photo in &group.photos {
                let marker = if Some(photo) == keep {
                    style("★").green().to_string()
                } else {
                    style("○").dim().to_string()
                };
                term.write_line(&format!("    {} {}", marker, display_path(photo))).ok();
            }

            if cli.verbose {
                term.write_line(&format!(
                    "    {} {}",
                    style("Fingerprint:").dim(),
                    style(&group.fingerprint).dim()
                ))
                .ok();
            }
            term.write_line("").ok();
        }
    }

    if cli.show_unreadable && !result.unreadable.is_empty() {
        term.write_line(&format!("{}", style("Unreadable photos:").bold())).ok();
        for path in &result.unreadable {
            term.write_line(&format!("    {}", display_path(path))).ok();
        }
        term.write_line("").ok();
    }

    if cli.verbose && !result.scan_errors.is_empty() {
        term.write_line(&format!("{}", style("Skipped entries:").bold())).ok();
        for error in &result.scan_errors {
            term.write_line(&format!("    {}", error)).ok();
        }
        term.write_line("").ok();
    }

    match &cli.move_to {
        Some(dest) => {
            term.write_line(&format!(
                "{} {} lower-byte-size duplicates moved to {} ({})",
                style("✓").green().bold(),
                result.moved_count(),
                display_path(&dest.join("duplicates")),
                format_bytes(result.reclaimed_bytes())
            ))
            .ok();

            let failures: Vec<_> = result.relocation_failures().collect();
            if !failures.is_empty() {
                term.write_line(&format!(
                    "{} {} duplicates could not be moved:",
                    style("!").red().bold(),
                    failures.len()
                ))
                .ok();
                for failure in failures {
                    term.write_line(&format!(
                        "    {} {}",
                        display_path(&failure.path),
                        style(&failure.reason).dim()
                    ))
                    .ok();
                }
            }
        }
        None => {
            term.write_line(&format!(
                "{}",
                style("No files were moved. Pass -m <DEST> to move duplicates aside.").dim()
            ))
            .ok();
        }
    }
}

fn print_json_results(source: &Path, result: &PipelineResult) {
    let output = serde_json::json!({
        "source": source,
        "total_photos": result.total_photos,
        "scanned_bytes": result.scanned_bytes,
        "fingerprinted": result.fingerprinted,
        "duplicate_groups": result.groups.len(),
        "duplicate_count": result.duplicate_count(),
        "duration_ms": result.duration_ms,
        "groups": result.groups,
        "unreadable": result.unreadable,
        "resolutions": result.resolutions,
        "moved_count": result.moved_count(),
        "reclaimed_bytes": result.reclaimed_bytes(),
    });

    match serde_json::to_string_pretty(&output) {
        Ok(json) => println!("{}", json),
        Err(e) => warn!(error = %e, "could not serialize results"),
    }
}

fn print_minimal_results(policy: KeepPolicy, result: &PipelineResult) {
    for (i, group) in result.groups.iter().enumerate() {
        let keep = retained_member(group, i, result, policy);
        for photo in &group.photos {
            if Some(photo) != keep {
                println!("{}", photo.display());
            }
        }
    }
}

fn display_path(path: &Path) -> String {
    let home = dirs::home_dir().unwrap_or_default();
    match path.strip_prefix(&home) {
        Ok(rest) if !home.as_os_str().is_empty() => format!("~/{}", rest.display()),
        _ => path.display().to_string(),
    }
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn move_flag_is_optional() {
        let cli = Cli::try_parse_from(["photo-dupes", "/photos"]).unwrap();
        assert_eq!(cli.source, PathBuf::from("/photos"));
        assert!(cli.move_to.is_none());
        assert_eq!(cli.jobs, 0);

        let cli = Cli::try_parse_from(["photo-dupes", "/photos", "-m", "/sorted"]).unwrap();
        assert_eq!(cli.move_to, Some(PathBuf::from("/sorted")));
    }

    #[test]
    fn source_is_required() {
        assert!(Cli::try_parse_from(["photo-dupes"]).is_err());
    }

    #[test]
    fn keep_flag_maps_to_policy() {
        let cli = Cli::try_parse_from(["photo-dupes", "/p", "--keep", "first"]).unwrap();
        assert_eq!(KeepPolicy::from(cli.keep), KeepPolicy::First);
    }

    #[test]
    fn hidden_files_are_scanned_unless_skipped() {
        let cli = Cli::try_parse_from(["photo-dupes", "/p"]).unwrap();
        assert!(!cli.skip_hidden);

        let cli = Cli::try_parse_from(["photo-dupes", "/p", "--skip-hidden"]).unwrap();
        assert!(cli.skip_hidden);
    }

    #[test]
    fn format_bytes_picks_unit() {
        assert_eq!(format_bytes(512), "512 bytes");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }
}
