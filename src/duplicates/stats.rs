//! Scan-wide counters.
//!
//! [`ScanStatistics`] is shared by the traversal, the hashing workers and the
//! deleter. Every counter is an atomic that only ever grows during a scan;
//! [`ScanStatistics::reset`] zeroes them at scan start. Readers take a
//! [`StatisticsSnapshot`].

use std::sync::atomic::{AtomicU64, Ordering};

use bytesize::ByteSize;
use serde::Serialize;

/// Monotonic counters for a single scan.
#[derive(Debug, Default)]
pub struct ScanStatistics {
    files_seen: AtomicU64,
    files_skipped: AtomicU64,
    files_processed: AtomicU64,
    files_hashed: AtomicU64,
    files_unhashable: AtomicU64,
    traversal_errors: AtomicU64,
    duplicate_sets: AtomicU64,
    files_deleted: AtomicU64,
    deletion_failures: AtomicU64,
    bytes_processed: AtomicU64,
    bytes_hashed: AtomicU64,
    bytes_reclaimed: AtomicU64,
}

macro_rules! counter {
    ($(#[$doc:meta])* $inc:ident, $add:ident => $field:ident) => {
        $(#[$doc])*
        pub fn $inc(&self) {
            self.$field.fetch_add(1, Ordering::Relaxed);
        }

        #[allow(missing_docs)]
        pub fn $add(&self, n: u64) {
            self.$field.fetch_add(n, Ordering::Relaxed);
        }
    };
}

impl ScanStatistics {
    /// Create zeroed statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero every counter.
    pub fn reset(&self) {
        for counter in [
            &self.files_seen,
            &self.files_skipped,
            &self.files_processed,
            &self.files_hashed,
            &self.files_unhashable,
            &self.traversal_errors,
            &self.duplicate_sets,
            &self.files_deleted,
            &self.deletion_failures,
            &self.bytes_processed,
            &self.bytes_hashed,
            &self.bytes_reclaimed,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    counter!(
        /// A regular file was encountered by the traversal.
        inc_seen, add_seen => files_seen
    );
    counter!(
        /// A file failed the size/extension filter.
        inc_skipped, add_skipped => files_skipped
    );
    counter!(
        /// A candidate was received by the size index.
        inc_processed, add_processed => files_processed
    );
    counter!(
        /// A file was hashed successfully.
        inc_hashed, add_hashed => files_hashed
    );
    counter!(
        /// A file could not be hashed.
        inc_unhashable, add_unhashable => files_unhashable
    );
    counter!(
        /// The traversal hit an unreadable entry.
        inc_traversal_errors, add_traversal_errors => traversal_errors
    );
    counter!(
        /// A hash group reached two members.
        inc_duplicate_sets, add_duplicate_sets => duplicate_sets
    );
    counter!(
        /// A duplicate was removed.
        inc_deleted, add_deleted => files_deleted
    );
    counter!(
        /// Removing a duplicate failed.
        inc_deletion_failures, add_deletion_failures => deletion_failures
    );

    /// Account bytes of a candidate received by the size index.
    pub fn add_bytes_processed(&self, bytes: u64) {
        self.bytes_processed.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Account bytes read by a successful hash.
    pub fn add_bytes_hashed(&self, bytes: u64) {
        self.bytes_hashed.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Account bytes freed by a confirmed removal.
    pub fn add_bytes_reclaimed(&self, bytes: u64) {
        self.bytes_reclaimed.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Read-only copy of the current values.
    #[must_use]
    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            files_seen: self.files_seen.load(Ordering::Relaxed),
            files_skipped: self.files_skipped.load(Ordering::Relaxed),
            files_processed: self.files_processed.load(Ordering::Relaxed),
            files_hashed: self.files_hashed.load(Ordering::Relaxed),
            files_unhashable: self.files_unhashable.load(Ordering::Relaxed),
            traversal_errors: self.traversal_errors.load(Ordering::Relaxed),
            duplicate_sets: self.duplicate_sets.load(Ordering::Relaxed),
            files_deleted: self.files_deleted.load(Ordering::Relaxed),
            deletion_failures: self.deletion_failures.load(Ordering::Relaxed),
            bytes_processed: self.bytes_processed.load(Ordering::Relaxed),
            bytes_hashed: self.bytes_hashed.load(Ordering::Relaxed),
            bytes_reclaimed: self.bytes_reclaimed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`ScanStatistics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatisticsSnapshot {
    /// Regular files encountered by the traversal
    pub files_seen: u64,
    /// Files rejected by the size/extension filter
    pub files_skipped: u64,
    /// Candidates that entered the size index
    pub files_processed: u64,
    /// Files hashed successfully
    pub files_hashed: u64,
    /// Files whose hash failed with a read error
    pub files_unhashable: u64,
    /// Unreadable directory entries
    pub traversal_errors: u64,
    /// Duplicate sets found
    pub duplicate_sets: u64,
    /// Duplicates removed
    pub files_deleted: u64,
    /// Removals that failed
    pub deletion_failures: u64,
    /// Total size of candidates
    pub bytes_processed: u64,
    /// Total size of hashed files
    pub bytes_hashed: u64,
    /// Space freed by confirmed removals
    pub bytes_reclaimed: u64,
}

impl StatisticsSnapshot {
    /// Human-readable reclaimed space.
    #[must_use]
    pub fn reclaimed_display(&self) -> String {
        ByteSize(self.bytes_reclaimed).to_string()
    }

    /// Human-readable candidate volume.
    #[must_use]
    pub fn processed_display(&self) -> String {
        ByteSize(self.bytes_processed).to_string()
    }
}
