//! # Scheduler Module
//!
//! Fans fingerprint work out over a bounded worker pool.
//!
//! ## How It Works
//! 1. Every candidate path becomes one independent job on a `rayon` pool
//! 2. Workers send their finished [`FingerprintResult`] back over a channel,
//!    in whatever order they complete
//! 3. The calling thread drains the channel, counts completions and emits a
//!    progress event for each one
//!
//! Workers share nothing mutable. A worker that fails or panics on one photo
//! only costs that photo its fingerprint.

mod cancel;

pub use cancel::CancellationToken;

use crate::core::fingerprint::{FingerprintResult, Fingerprinter};
use crate::error::{DuplicateFinderError, FingerprintError};
use crate::events::{Event, EventSender, FingerprintEvent, FingerprintProgress};
use crossbeam_channel::unbounded;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// What a worker reports back for one job
enum Completion {
    /// The photo was processed, successfully or not
    Done {
        index: usize,
        result: FingerprintResult,
        failure: Option<FingerprintError>,
    },
    /// Cancellation was requested before the job started
    Skipped,
}

/// Dispatches fingerprinting across a bounded worker pool
pub struct FingerprintScheduler {
    fingerprinter: Arc<dyn Fingerprinter>,
    pool: ThreadPool,
    cancellation: CancellationToken,
}

impl FingerprintScheduler {
    /// Create a scheduler with `workers` threads.
    ///
    /// `0` means one worker per available CPU.
    pub fn new(
        fingerprinter: Arc<dyn Fingerprinter>,
        workers: usize,
    ) -> Result<Self, DuplicateFinderError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("fingerprint-{i}"))
            .build()
            .map_err(|e| {
                DuplicateFinderError::Config(format!("failed to start worker pool: {e}"))
            })?;

        Ok(Self {
            fingerprinter,
            pool,
            cancellation: CancellationToken::new(),
        })
    }

    /// Use a caller-owned cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Number of worker threads in the pool
    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Fingerprint every path without progress reporting
    pub fn run(&self, paths: &[PathBuf]) -> Result<Vec<FingerprintResult>, DuplicateFinderError> {
        self.run_with_events(paths, &crate::events::null_sender())
    }

    /// Fingerprint every path, emitting one progress event per completion.
    ///
    /// Returns exactly one result per input path, in completion order.
    /// If the run is cancelled before every job started, returns
    /// [`DuplicateFinderError::Cancelled`] once the in-flight jobs are done.
    pub fn run_with_events(
        &self,
        paths: &[PathBuf],
        events: &EventSender,
    ) -> Result<Vec<FingerprintResult>, DuplicateFinderError> {
        let total = paths.len();
        let start = Instant::now();

        events.send(Event::Fingerprint(FingerprintEvent::Started {
            total_photos: total,
            workers: self.workers(),
        }));
        info!(total, workers = self.workers(), "fingerprinting photos");

        let (sender, receiver) = unbounded::<Completion>();

        for (index, path) in paths.iter().enumerate() {
            let sender = sender.clone();
            let fingerprinter = Arc::clone(&self.fingerprinter);
            let cancellation = self.cancellation.clone();
            let path = path.clone();

            self.pool.spawn(move || {
                let completion = if cancellation.is_cancelled() {
                    Completion::Skipped
                } else {
                    let (result, failure) = fingerprint_one(fingerprinter.as_ref(), path);
                    Completion::Done {
                        index,
                        result,
                        failure,
                    }
                };
                let _ = sender.send(completion);
            });
        }

        // Only the workers hold senders now, so the loop below ends when the
        // last job finishes.
        drop(sender);

        let mut results = Vec::with_capacity(total);
        let mut seen = vec![false; total];
        let mut skipped = 0usize;
        let mut unreadable = 0usize;

        for completion in receiver.iter() {
            let (index, result, failure) = match completion {
                Completion::Skipped => {
                    skipped += 1;
                    continue;
                }
                Completion::Done {
                    index,
                    result,
                    failure,
                } => (index, result, failure),
            };

            seen[index] = true;

            if let Some(error) = failure {
                unreadable += 1;
                debug!(path = %result.path().display(), %error, "photo could not be fingerprinted");
                events.send(Event::Fingerprint(FingerprintEvent::Unreadable {
                    path: result.path().to_path_buf(),
                    message: error.to_string(),
                }));
            }

            events.send(Event::Fingerprint(FingerprintEvent::Progress(
                FingerprintProgress {
                    completed: results.len() + 1,
                    total,
                    elapsed_ms: start.elapsed().as_millis() as u64,
                    current_path: result.path().to_path_buf(),
                },
            )));

            results.push(result);
        }

        if skipped > 0 {
            info!(skipped, "fingerprinting cancelled");
            return Err(DuplicateFinderError::Cancelled);
        }

        // A job that vanished without reporting still gets its one result
        for (index, path) in paths.iter().enumerate() {
            if !seen[index] {
                unreadable += 1;
                results.push(FingerprintResult::unreadable(path.clone()));
            }
        }

        events.send(Event::Fingerprint(FingerprintEvent::Completed {
            fingerprinted: results.len() - unreadable,
            unreadable,
        }));

        Ok(results)
    }
}

/// Run the fingerprinter on one path, absorbing errors and panics
fn fingerprint_one(
    fingerprinter: &dyn Fingerprinter,
    path: PathBuf,
) -> (FingerprintResult, Option<FingerprintError>) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| fingerprinter.fingerprint(&path)));

    match outcome {
        Ok(Ok(fingerprint)) => (FingerprintResult::new(path, Some(fingerprint)), None),
        Ok(Err(error)) => (FingerprintResult::unreadable(path), Some(error)),
        Err(_) => {
            let error = FingerprintError::WorkerPanicked { path: path.clone() };
            (FingerprintResult::unreadable(path), Some(error))
        }
    }
}
