//! Directory walker implementation using jwalk for parallel traversal.
//!
//! # Overview
//!
//! [`Walker`] performs a recursive walk of a directory tree and yields a
//! [`FileDescriptor`] for every regular file that passes the
//! [`SizeExtensionFilter`]. Directory entries are read in parallel by jwalk
//! and streamed back in sorted order, so output is deterministic.
//!
//! # Behavior
//!
//! - Symbolic links are never followed into directories.
//! - A symlink that resolves to a file is reported at the target's size.
//! - A broken symlink or an unreadable directory yields a
//!   [`TraversalError`] and the walk continues.
//! - Cancellation stops the walk at the next entry.
//!
//! # Example
//!
//! ```no_run
//! use dedupinator::scanner::{SizeExtensionFilter, Walker};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("."), SizeExtensionFilter::default());
//! for batch in walker.batches(1000) {
//!     println!("{} candidates, {} errors", batch.files.len(), batch.errors.len());
//! }
//! ```

use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use jwalk::WalkDir;

use super::{FileDescriptor, SizeExtensionFilter, TraversalError};
use crate::duplicates::ScanStatistics;
use crate::signal::CancellationToken;

/// Default number of descriptors per traversal batch.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// A bounded slice of traversal output.
#[derive(Debug, Default)]
pub struct WalkBatch {
    /// Candidates that passed the filter
    pub files: Vec<FileDescriptor>,
    /// Entries that could not be read
    pub errors: Vec<TraversalError>,
    /// Regular files the filter rejected while this batch was filling
    pub filtered: usize,
}

impl WalkBatch {
    /// True if the batch carries neither files nor errors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.errors.is_empty()
    }

    /// Regular files examined for this batch, accepted or not.
    #[must_use]
    pub fn visited(&self) -> usize {
        self.files.len() + self.filtered
    }
}

/// What the walker made of one directory entry.
enum Visit {
    Candidate(FileDescriptor),
    Filtered,
    Failed(TraversalError),
}

/// Directory walker for candidate discovery.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Size and extension filter
    filter: SizeExtensionFilter,
    /// Checked before every entry
    cancel: Option<CancellationToken>,
    /// Receives seen/skipped/error counts
    stats: Option<Arc<ScanStatistics>>,
}

impl Walker {
    /// Create a new walker for the given path.
    ///
    /// # Arguments
    ///
    /// * `path` - Root directory to scan
    /// * `filter` - Size and extension filter applied to every file
    #[must_use]
    pub fn new(path: &Path, filter: SizeExtensionFilter) -> Self {
        Self {
            root: path.to_path_buf(),
            filter,
            cancel: None,
            stats: None,
        }
    }

    /// Stop the walk once `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Record seen, skipped and error counts into `stats`.
    #[must_use]
    pub fn with_statistics(mut self, stats: Arc<ScanStatistics>) -> Self {
        self.stats = Some(stats);
        self
    }

    /// The root being walked.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    /// Walk the directory tree, yielding candidates and traversal errors.
    ///
    /// The iterator is lazy, finite and not restartable. Errors are yielded
    /// in place rather than stopping iteration.
    pub fn walk(&self) -> impl Iterator<Item = Result<FileDescriptor, TraversalError>> + '_ {
        self.visits().filter_map(|visit| match visit {
            Visit::Candidate(file) => Some(Ok(file)),
            Visit::Failed(e) => Some(Err(e)),
            Visit::Filtered => None,
        })
    }

    /// Walk the tree in batches.
    ///
    /// A batch closes once `batch_size` regular files have been examined,
    /// whether the filter accepted them or not, so a tree the filter mostly
    /// rejects still produces batches at a steady pace. Errors ride along
    /// with the batch in which they were encountered. A batch size of zero
    /// is treated as one.
    pub fn batches(&self, batch_size: usize) -> impl Iterator<Item = WalkBatch> + '_ {
        let batch_size = batch_size.max(1);
        let mut visits = self.visits();

        std::iter::from_fn(move || {
            let mut batch = WalkBatch::default();
            for visit in visits.by_ref() {
                match visit {
                    Visit::Candidate(file) => batch.files.push(file),
                    Visit::Filtered => batch.filtered += 1,
                    Visit::Failed(e) => batch.errors.push(e),
                }
                if batch.visited() >= batch_size {
                    return Some(batch);
                }
            }
            (!batch.is_empty() || batch.filtered > 0).then_some(batch)
        })
    }

    fn visits(&self) -> impl Iterator<Item = Visit> + '_ {
        let walk_dir = WalkDir::new(&self.root)
            .follow_links(false)
            .skip_hidden(false)
            .sort(true);

        walk_dir
            .into_iter()
            .map_while(move |entry_result| {
                if self.is_cancelled() {
                    log::debug!("Walker: cancellation requested, stopping traversal");
                    return None;
                }
                Some(self.process_entry(entry_result))
            })
            .flatten()
    }

    fn process_entry(
        &self,
        entry_result: Result<jwalk::DirEntry<((), ())>, jwalk::Error>,
    ) -> Option<Visit> {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(e) => {
                let converted = self.convert_jwalk_error(e);
                return Some(Visit::Failed(self.record_error(converted)));
            }
        };

        let path = entry.path();
        let file_type = entry.file_type();

        if file_type.is_dir() {
            if let Some(err) = &entry.read_children_error {
                let converted = self.convert_jwalk_error_ref(&path, err);
                return Some(Visit::Failed(self.record_error(converted)));
            }
            return None;
        }

        let metadata = if file_type.is_symlink() {
            match std::fs::metadata(&path) {
                Ok(m) if m.is_dir() => {
                    log::trace!("Not following directory symlink: {}", path.display());
                    return None;
                }
                Ok(m) => m,
                Err(e) => {
                    log::warn!("Broken symlink {}: {}", path.display(), e);
                    let error = TraversalError::from_io(&path, e);
                    return Some(Visit::Failed(self.record_error(error)));
                }
            }
        } else {
            match std::fs::symlink_metadata(&path) {
                Ok(m) => m,
                Err(e) => {
                    log::warn!("Cannot stat {}: {}", path.display(), e);
                    let error = TraversalError::from_io(&path, e);
                    return Some(Visit::Failed(self.record_error(error)));
                }
            }
        };

        if !metadata.is_file() {
            log::trace!("Skipping non-regular file: {}", path.display());
            return None;
        }

        Some(self.process_file(path, &metadata))
    }

    fn process_file(&self, path: PathBuf, metadata: &Metadata) -> Visit {
        let size = metadata.len();
        if let Some(stats) = &self.stats {
            stats.inc_seen();
        }

        if !self.filter.accepts(&path, size) {
            log::trace!("Filtered out ({} bytes): {}", size, path.display());
            if let Some(stats) = &self.stats {
                stats.inc_skipped();
            }
            return Visit::Filtered;
        }

        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        Visit::Candidate(FileDescriptor::new(path, size, modified))
    }

    fn record_error(&self, error: TraversalError) -> TraversalError {
        if let Some(stats) = &self.stats {
            stats.inc_traversal_errors();
        }
        error
    }

    fn convert_jwalk_error(&self, error: jwalk::Error) -> TraversalError {
        let path = error
            .path()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);
        self.convert_jwalk_error_ref(&path, &error)
    }

    fn convert_jwalk_error_ref(&self, path: &Path, error: &jwalk::Error) -> TraversalError {
        log::warn!("Skipping unreadable entry {}: {}", path.display(), error);
        let kind = error
            .io_error()
            .map_or(std::io::ErrorKind::Other, std::io::Error::kind);
        TraversalError::from_io(path, std::io::Error::new(kind, error.to_string()))
    }
}
