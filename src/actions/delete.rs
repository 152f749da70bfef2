//! Deletion of resolved duplicate sets.
//!
//! # Overview
//!
//! [`Deleter::delete_set`] removes the copies a [`DuplicateSet`] marks for
//! removal. The kept file is never touched. Each removal is independent: a
//! failure is recorded against that path and the remaining removals go
//! ahead. Reclaimed space grows only on confirmed success.
//!
//! Removal goes through a [`RemovalBackend`]: permanent unlinking (default)
//! or the platform trash.
//!
//! # Caveats
//!
//! Deletion is not transactional. Cancellation or a crash part-way through a
//! set leaves some copies removed and others in place. Files are not
//! re-checked against the scan snapshot before removal, so a file modified
//! after the scan is still removed.
//!
//! # Example
//!
//! ```no_run
//! use dedupinator::actions::{Deleter, DeleteMode};
//! # fn demo(set: &dedupinator::duplicates::DuplicateSet) {
//! let deleter = Deleter::new(DeleteMode::Permanent.backend());
//! let outcome = deleter.delete_set(set, false);
//! println!("{} removed, {} failed", outcome.deleted_paths.len(), outcome.failures.len());
//! # }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::confirm::{AlwaysDecline, ConfirmMode, ConfirmPrompt};
use crate::duplicates::{DuplicateSet, ScanStatistics};
use crate::signal::CancellationToken;

/// Error type for a single removal.
#[derive(Debug, Error)]
pub enum DeletionError {
    /// File was not found (already gone or moved).
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied when attempting to delete.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The path resolves to the kept copy, usually through a symlink.
    #[error("same file as kept copy: {0}")]
    SameFileAsKept(PathBuf),

    /// Trash operation failed.
    #[error("trash operation failed for {path}: {message}")]
    TrashFailed {
        /// File that could not be trashed
        path: PathBuf,
        /// Platform message
        message: String,
    },

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// File that could not be removed
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl DeletionError {
    /// Classify an I/O error raised while removing `path`.
    #[must_use]
    pub fn from_io(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    /// Get the path associated with this error.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p)
            | Self::PermissionDenied(p)
            | Self::SameFileAsKept(p)
            | Self::TrashFailed { path: p, .. }
            | Self::Io { path: p, .. } => p,
        }
    }
}

/// How files are removed.
pub trait RemovalBackend: Send + Sync {
    /// Remove one file.
    ///
    /// # Errors
    ///
    /// Returns a [`DeletionError`] describing why the file remains.
    fn remove(&self, path: &Path) -> Result<(), DeletionError>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Unlink the file. Cannot be undone.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermanentRemoval;

impl RemovalBackend for PermanentRemoval {
    fn remove(&self, path: &Path) -> Result<(), DeletionError> {
        fs::remove_file(path).map_err(|e| DeletionError::from_io(path, e))
    }

    fn name(&self) -> &'static str {
        "permanent"
    }
}

/// Move the file to the platform trash.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrashRemoval;

impl RemovalBackend for TrashRemoval {
    fn remove(&self, path: &Path) -> Result<(), DeletionError> {
        // The trash crate reports a missing file as a generic error.
        if let Err(e) = fs::symlink_metadata(path) {
            return Err(DeletionError::from_io(path, e));
        }
        trash::delete(path).map_err(|e| DeletionError::TrashFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "trash"
    }
}

/// Built-in removal backends, selectable from configuration.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DeleteMode {
    /// Unlink files
    #[default]
    Permanent,
    /// Move files to the trash
    Trash,
}

impl DeleteMode {
    /// The backend implementing this mode.
    #[must_use]
    pub fn backend(self) -> Box<dyn RemovalBackend> {
        match self {
            Self::Permanent => Box::new(PermanentRemoval),
            Self::Trash => Box::new(TrashRemoval),
        }
    }
}

/// Result of deleting one duplicate set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeletionOutcome {
    /// Files confirmed removed
    pub deleted_paths: Vec<PathBuf>,
    /// Files that could not be removed, with the reason
    pub failures: BTreeMap<PathBuf, String>,
    /// Space freed by confirmed removals
    pub bytes_reclaimed: u64,
    /// The prompt declined the set; nothing was attempted
    pub declined: bool,
    /// Cancellation stopped the set before every removal was attempted
    pub cancelled: bool,
}

impl DeletionOutcome {
    /// True if every attempted removal succeeded.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Aggregate over every set a deletion pass handled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeletionSummary {
    /// Per-set outcomes, in the order the sets were given
    pub outcomes: Vec<DeletionOutcome>,
}

impl DeletionSummary {
    /// Files removed across all sets.
    #[must_use]
    pub fn deleted(&self) -> usize {
        self.outcomes.iter().map(|o| o.deleted_paths.len()).sum()
    }

    /// Removals that failed across all sets.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.iter().map(|o| o.failures.len()).sum()
    }

    /// Sets the prompt declined.
    #[must_use]
    pub fn declined(&self) -> usize {
        self.outcomes.iter().filter(|o| o.declined).count()
    }

    /// Space freed across all sets.
    #[must_use]
    pub fn bytes_reclaimed(&self) -> u64 {
        self.outcomes.iter().map(|o| o.bytes_reclaimed).sum()
    }

    /// Whether cancellation cut the pass short.
    #[must_use]
    pub fn cancelled(&self) -> bool {
        self.outcomes.iter().any(|o| o.cancelled)
    }

    /// Every failure, in set order.
    pub fn failures(&self) -> impl Iterator<Item = (&PathBuf, &String)> {
        self.outcomes.iter().flat_map(|o| o.failures.iter())
    }
}

/// True if both paths resolve to the same file on disk.
///
/// A path that cannot be resolved is treated as distinct; the removal
/// itself then reports why.
fn resolves_to(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Applies deletion decisions to the filesystem.
pub struct Deleter {
    backend: Box<dyn RemovalBackend>,
    prompt: Box<dyn ConfirmPrompt>,
    stats: Option<Arc<ScanStatistics>>,
    cancel: Option<CancellationToken>,
}

impl std::fmt::Debug for Deleter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deleter")
            .field("backend", &self.backend.name())
            .field("prompt", &"<prompt>")
            .field("stats", &self.stats.is_some())
            .field("cancel", &self.cancel)
            .finish()
    }
}

impl Deleter {
    /// Create a deleter. Confirmation requests are declined until a prompt
    /// is set with [`Deleter::with_prompt`].
    #[must_use]
    pub fn new(backend: Box<dyn RemovalBackend>) -> Self {
        Self {
            backend,
            prompt: Box::new(AlwaysDecline),
            stats: None,
            cancel: None,
        }
    }

    /// Use `prompt` for confirmation.
    #[must_use]
    pub fn with_prompt(mut self, prompt: Box<dyn ConfirmPrompt>) -> Self {
        self.prompt = prompt;
        self
    }

    /// Record deletions and reclaimed bytes into `stats`.
    #[must_use]
    pub fn with_statistics(mut self, stats: Arc<ScanStatistics>) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Stop starting new removals once `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    /// Delete the copies `set` marks for removal.
    ///
    /// With `confirm` the prompt must approve the set first; a declined set
    /// is reported with `declined` and nothing removed.
    pub fn delete_set(&self, set: &DuplicateSet, confirm: bool) -> DeletionOutcome {
        let mut outcome = DeletionOutcome::default();

        if confirm && !self.prompt.confirm_set(set) {
            log::info!("Deletion declined for set kept at {}", set.keep.path.display());
            outcome.declined = true;
            return outcome;
        }

        for file in &set.remove {
            if self.is_cancelled() {
                log::info!("Deletion cancelled; remaining copies left in place");
                outcome.cancelled = true;
                break;
            }
            if file.path == set.keep.path {
                continue;
            }

            let removal = if resolves_to(&file.path, &set.keep.path) {
                Err(DeletionError::SameFileAsKept(file.path.clone()))
            } else {
                self.backend.remove(&file.path)
            };
            match removal {
                Ok(()) => {
                    log::info!("Removed ({}): {}", self.backend.name(), file.path.display());
                    outcome.deleted_paths.push(file.path.clone());
                    outcome.bytes_reclaimed += set.size;
                    if let Some(stats) = &self.stats {
                        stats.inc_deleted();
                        stats.add_bytes_reclaimed(set.size);
                    }
                }
                Err(e) => {
                    log::warn!("Failed to remove {}: {}", file.path.display(), e);
                    outcome.failures.insert(file.path.clone(), e.to_string());
                    if let Some(stats) = &self.stats {
                        stats.inc_deletion_failures();
                    }
                }
            }
        }

        outcome
    }

    /// Delete every set under one confirmation policy.
    ///
    /// `auto_delete` removes without asking. Otherwise `mode` decides
    /// between a prompt per set and a single prompt for all sets.
    pub fn delete_all(
        &self,
        sets: &[DuplicateSet],
        mode: ConfirmMode,
        auto_delete: bool,
    ) -> DeletionSummary {
        let mut summary = DeletionSummary::default();
        if sets.is_empty() {
            return summary;
        }

        let per_set_confirm = match (auto_delete, mode) {
            (true, _) => false,
            (false, ConfirmMode::PerGroup) => true,
            (false, ConfirmMode::WholeScan) => {
                if !self.prompt.confirm_scan(sets) {
                    log::info!("Deletion declined for all {} sets", sets.len());
                    summary.outcomes = sets
                        .iter()
                        .map(|_| DeletionOutcome {
                            declined: true,
                            ..DeletionOutcome::default()
                        })
                        .collect();
                    return summary;
                }
                false
            }
        };

        for set in sets {
            if self.is_cancelled() {
                summary.outcomes.push(DeletionOutcome {
                    cancelled: true,
                    ..DeletionOutcome::default()
                });
                break;
            }
            summary.outcomes.push(self.delete_set(set, per_set_confirm));
        }

        summary
    }
}
