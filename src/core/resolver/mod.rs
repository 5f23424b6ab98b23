//! # Resolver Module
//!
//! Keeps one photo per duplicate group and moves the others aside.
//!
//! ## Layout
//! Redundant copies land in `<destination>/duplicates/`, keeping their file
//! name. A name that is already taken becomes `name_1.ext`, `name_2.ext`, ...
//! Nothing already in the destination is ever overwritten.
//!
//! ## Failure Handling
//! A move that fails is recorded against that one file and the resolver
//! carries on with the rest of the group and the remaining groups.
//!
//! ## Concurrency
//! All name probing and moving goes through one lock per resolver, so share
//! a single resolver between threads that target the same destination.

mod naming;

pub use naming::unique_destination;

use crate::core::grouper::DuplicateGroup;
use crate::core::scheduler::CancellationToken;
use crate::error::RelocationError;
use crate::events::{Event, EventSender, RelocateEvent};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Sub-folder of the destination root that receives duplicates
pub const DUPLICATES_DIR: &str = "duplicates";

/// Which group member stays in place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeepPolicy {
    /// Largest file by bytes; ties go to the earliest member
    #[default]
    Largest,
    /// The first member of the group
    First,
}

impl KeepPolicy {
    /// Index of the member to keep, given member sizes in group order.
    ///
    /// Returns `None` for an empty slice.
    pub fn select(&self, sizes: &[u64]) -> Option<usize> {
        if sizes.is_empty() {
            return None;
        }
        match self {
            KeepPolicy::First => Some(0),
            KeepPolicy::Largest => {
                let mut best = 0;
                for (i, &size) in sizes.iter().enumerate().skip(1) {
                    // Strictly greater, so the first of several equal maxima wins
                    if size > sizes[best] {
                        best = i;
                    }
                }
                Some(best)
            }
        }
    }
}

/// One duplicate moved aside
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relocation {
    pub from: PathBuf,
    pub to: PathBuf,
    pub size_bytes: u64,
}

/// A duplicate that could not be moved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelocationFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of resolving one group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    /// The member left in place
    pub retained: PathBuf,
    /// Members successfully moved
    pub relocated: Vec<Relocation>,
    /// Members that stayed behind because their move failed
    pub failures: Vec<RelocationFailure>,
}

/// Moves non-retained group members into the duplicates folder
pub struct DuplicateResolver {
    target_dir: PathBuf,
    policy: KeepPolicy,
    lock: Mutex<()>,
    cancellation: CancellationToken,
}

impl DuplicateResolver {
    /// Prepare `<destination_root>/duplicates`, creating it if needed.
    ///
    /// Failing to create it is fatal for the run.
    pub fn new(destination_root: &Path) -> Result<Self, RelocationError> {
        let target_dir = destination_root.join(DUPLICATES_DIR);

        fs::create_dir_all(&target_dir).map_err(|source| RelocationError::CreateDestination {
            path: target_dir.clone(),
            source,
        })?;

        if !target_dir.is_dir() {
            return Err(RelocationError::DestinationNotADirectory { path: target_dir });
        }

        Ok(Self {
            target_dir,
            policy: KeepPolicy::default(),
            lock: Mutex::new(()),
            cancellation: CancellationToken::new(),
        })
    }

    /// Change the retention policy
    pub fn with_policy(mut self, policy: KeepPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Stop `resolve_all` between groups once this token is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// The folder duplicates are moved into
    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    /// Keep one member of `group` and move the rest aside
    pub fn resolve(&self, group: &DuplicateGroup) -> Resolution {
        self.resolve_with_events(group, &crate::events::null_sender())
    }

    fn resolve_with_events(&self, group: &DuplicateGroup, events: &EventSender) -> Resolution {
        let sizes: Vec<u64> = group.photos.iter().map(|p| file_size(p)).collect();
        let keep = self.policy.select(&sizes).unwrap_or(0);

        let mut relocated = Vec::new();
        let mut failures = Vec::new();

        for (i, photo) in group.photos.iter().enumerate() {
            if i == keep {
                continue;
            }

            match self.relocate(photo) {
                Ok(to) => {
                    events.send(Event::Relocate(RelocateEvent::Moved {
                        from: photo.clone(),
                        to: to.clone(),
                    }));
                    relocated.push(Relocation {
                        from: photo.clone(),
                        to,
                        size_bytes: sizes[i],
                    });
                }
                Err(error) => {
                    warn!(path = %photo.display(), %error, "could not move duplicate");
                    events.send(Event::Relocate(RelocateEvent::Failed {
                        path: photo.clone(),
                        message: error.to_string(),
                    }));
                    failures.push(RelocationFailure {
                        path: photo.clone(),
                        reason: error.to_string(),
                    });
                }
            }
        }

        Resolution {
            retained: group.photos[keep].clone(),
            relocated,
            failures,
        }
    }

    /// Resolve every group in order, reporting each move as an event.
    ///
    /// Once cancelled, the group in progress is finished and the remaining
    /// groups are left untouched, so fewer resolutions than groups come back.
    pub fn resolve_all(&self, groups: &[DuplicateGroup], events: &EventSender) -> Vec<Resolution> {
        events.send(Event::Relocate(RelocateEvent::Started {
            destination: self.target_dir.clone(),
            groups: groups.len(),
        }));

        let mut resolutions: Vec<Resolution> = Vec::with_capacity(groups.len());
        for group in groups.iter().filter(|group| !group.photos.is_empty()) {
            if self.cancellation.is_cancelled() {
                info!(remaining = groups.len() - resolutions.len(), "relocation cancelled");
                break;
            }
            resolutions.push(self.resolve_with_events(group, events));
        }

        let moved = resolutions.iter().map(|r| r.relocated.len()).sum();
        let failed = resolutions.iter().map(|r| r.failures.len()).sum();
        info!(moved, failed, destination = %self.target_dir.display(), "relocation finished");

        events.send(Event::Relocate(RelocateEvent::Completed { moved, failed }));

        resolutions
    }

    /// Move one file into the target folder under a free name.
    fn relocate(&self, from: &Path) -> Result<PathBuf, RelocationError> {
        let file_name = from
            .file_name()
            .ok_or_else(|| RelocationError::MissingFileName {
                path: from.to_path_buf(),
            })?;

        // A poisoned lock only means another move panicked; the guarded
        // state is the directory itself, which is still consistent.
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let to = unique_destination(&self.target_dir, file_name);
        move_file(from, &to)?;
        Ok(to)
    }
}

/// Size in bytes, or 0 if the file cannot be inspected
fn file_size(path: &Path) -> u64 {
    match fs::metadata(path) {
        Ok(metadata) => metadata.len(),
        Err(error) => {
            warn!(path = %path.display(), %error, "could not read file size");
            0
        }
    }
}

/// Rename, falling back to copy + delete (e.g. across filesystems).
fn move_file(from: &Path, to: &Path) -> Result<(), RelocationError> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(RelocationError::MoveFailed {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source: e,
        }),
        Err(e) => {
            debug!(from = %from.display(), error = %e, "rename failed, copying instead");
            copy_then_remove(from, to)
        }
    }
}

/// Copy `from` to a new file at `to`, verify it, then delete `from`.
///
/// `to` must not exist. On any failure the copy is removed again, so the
/// photo ends up in exactly one place.
fn copy_then_remove(from: &Path, to: &Path) -> Result<(), RelocationError> {
    copy_then_remove_with(from, to, |path| fs::remove_file(path))
}

fn copy_then_remove_with<F>(
    from: &Path,
    to: &Path,
    remove_source: F,
) -> Result<(), RelocationError>
where
    F: FnOnce(&Path) -> io::Result<()>,
{
    let move_failed = |source: io::Error| RelocationError::MoveFailed {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };

    let metadata = fs::metadata(from).map_err(move_failed)?;
    let expected = metadata.len();
    let mut source = File::open(from).map_err(move_failed)?;
    // create_new refuses to clobber anything that appeared meanwhile
    let mut dest = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(to)
        .map_err(move_failed)?;

    let copied = io::copy(&mut source, &mut dest).and_then(|n| dest.sync_all().map(|_| n));
    drop(dest);
    let actual = match copied {
        Ok(n) => n,
        Err(e) => {
            let _ = fs::remove_file(to);
            return Err(move_failed(e));
        }
    };

    if actual != expected {
        let _ = fs::remove_file(to);
        return Err(RelocationError::CopyVerification {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            expected,
            actual,
        });
    }

    if let Err(e) = fs::set_permissions(to, metadata.permissions()) {
        warn!(path = %to.display(), error = %e, "could not copy permissions");
    }

    // Never leave the photo in both places
    if let Err(e) = remove_source(from) {
        let _ = fs::remove_file(to);
        return Err(move_failed(e));
    }

    Ok(())
}
