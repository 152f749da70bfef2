//! Scanner module for directory traversal and file hashing.
//!
//! This module provides functionality for:
//! - Directory walking using jwalk, with size/extension filtering
//! - Bounded-memory content hashing (SHA-256 or BLAKE3)
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and candidate discovery
//! - [`hasher`]: Chunked file hashing
//!
//! # Example
//!
//! ```no_run
//! use dedupinator::scanner::{SizeExtensionFilter, Walker};
//! use std::path::Path;
//!
//! let filter = SizeExtensionFilter::new(1024, u64::MAX, [".tmp", ".log"]);
//!
//! let walker = Walker::new(Path::new("."), filter);
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(file) => println!("{}: {} bytes", file.path.display(), file.size),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

pub mod hasher;
pub mod walker;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

// Re-export main types
pub use hasher::{Digest, HashAlgorithm, Hasher, DEFAULT_CHUNK_SIZE};
pub use walker::{WalkBatch, Walker, DEFAULT_BATCH_SIZE};

/// Snapshot of a candidate file taken at traversal time.
///
/// The snapshot is never refreshed: if the file changes between traversal
/// and deletion the engine does not notice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileDescriptor {
    /// Path to the file as discovered under the scan root
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Last modification time
    pub modified: SystemTime,
}

impl FileDescriptor {
    /// Create a new FileDescriptor.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the file
    /// * `size` - File size in bytes
    /// * `modified` - Last modification time
    #[must_use]
    pub fn new(path: PathBuf, size: u64, modified: SystemTime) -> Self {
        Self {
            path,
            size,
            modified,
        }
    }
}

/// Size and extension filter applied to every regular file.
///
/// A file passes iff `min_size <= size <= max_size` and its lowercased
/// name does not end with any of the skip extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeExtensionFilter {
    /// Minimum file size to include (inclusive).
    pub min_size: u64,

    /// Maximum file size to include (inclusive).
    pub max_size: u64,

    /// Lowercased suffixes, each starting with a dot.
    skip_extensions: BTreeSet<String>,
}

impl Default for SizeExtensionFilter {
    fn default() -> Self {
        Self {
            min_size: 0,
            max_size: u64::MAX,
            skip_extensions: BTreeSet::new(),
        }
    }
}

impl SizeExtensionFilter {
    /// Create a new filter.
    ///
    /// Extensions are normalized: trimmed, lowercased, and given a leading
    /// dot if it is missing. Blank entries are dropped.
    #[must_use]
    pub fn new<I, S>(min_size: u64, max_size: u64, skip_extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            min_size,
            max_size,
            skip_extensions: skip_extensions
                .into_iter()
                .filter_map(|ext| normalize_extension(ext.as_ref()))
                .collect(),
        }
    }

    /// The normalized skip extensions.
    pub fn skip_extensions(&self) -> impl Iterator<Item = &str> {
        self.skip_extensions.iter().map(String::as_str)
    }

    /// Check if a size lies within the configured bounds.
    #[must_use]
    pub fn passes_size(&self, size: u64) -> bool {
        self.min_size <= size && size <= self.max_size
    }

    /// Check if a path carries one of the skipped extensions.
    #[must_use]
    pub fn is_skipped_extension(&self, path: &Path) -> bool {
        if self.skip_extensions.is_empty() {
            return false;
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        self.skip_extensions.iter().any(|ext| name.ends_with(ext))
    }

    /// Apply the full filter to a file.
    #[must_use]
    pub fn accepts(&self, path: &Path, size: u64) -> bool {
        self.passes_size(size) && !self.is_skipped_extension(path)
    }
}

fn normalize_extension(ext: &str) -> Option<String> {
    let ext = ext.trim().to_lowercase();
    if ext.is_empty() || ext == "." {
        None
    } else if ext.starts_with('.') {
        Some(ext)
    } else {
        Some(format!(".{ext}"))
    }
}

/// Errors that can occur during directory traversal.
///
/// These are never fatal: the entry or subtree is skipped and the walk
/// continues.
#[derive(thiserror::Error, Debug)]
pub enum TraversalError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The entry disappeared or a symlink points nowhere.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl TraversalError {
    /// Classify an I/O error raised while accessing `path`.
    #[must_use]
    pub fn from_io(path: &Path, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    /// Path the error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::PermissionDenied(p) | Self::NotFound(p) | Self::Io { path: p, .. } => p,
        }
    }
}

/// A file could not be hashed.
///
/// The file is dropped from its size bucket; siblings are unaffected.
#[derive(thiserror::Error, Debug)]
#[error("Failed to read {path}: {source}")]
pub struct ReadError {
    /// File that failed
    pub path: PathBuf,
    /// The underlying I/O error
    #[source]
    pub source: std::io::Error,
}

impl ReadError {
    /// Create a new read error.
    #[must_use]
    pub fn new(path: &Path, source: std::io::Error) -> Self {
        Self {
            path: path.to_path_buf(),
            source,
        }
    }
}
