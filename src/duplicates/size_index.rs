//! Size bucketing (the cheap pre-filter).
//!
//! Files are grouped by exact byte size before any content is read. A size
//! seen once is held as a singleton; the second arrival promotes it to a
//! bucket. Singletons are only discarded in [`SizeIndex::finalize`], because
//! a later batch may still deliver a file of the same size.
//!
//! Memory is O(number of candidates): every size must be seen before a
//! bucket can be judged complete.

use std::collections::HashMap;

use crate::scanner::FileDescriptor;

/// A size with at least two candidates, in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeBucket {
    /// Shared byte size
    pub size: u64,
    /// Members in the order the traversal produced them
    pub files: Vec<FileDescriptor>,
}

impl SizeBucket {
    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// True if the bucket has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Result of [`SizeIndex::finalize`].
#[derive(Debug, Default)]
pub struct SizePartition {
    /// Buckets with two or more members, in order of first appearance
    pub buckets: Vec<SizeBucket>,
    /// Candidates dropped because their size is unique
    pub unique: usize,
}

impl SizePartition {
    /// Total candidates that still need hashing.
    #[must_use]
    pub fn candidate_count(&self) -> usize {
        self.buckets.iter().map(SizeBucket::len).sum()
    }
}

/// Incrementally built `size -> files` index.
///
/// Owned by the coordinating thread only.
#[derive(Debug, Default)]
pub struct SizeIndex {
    singletons: HashMap<u64, FileDescriptor>,
    buckets: HashMap<u64, Vec<FileDescriptor>>,
    order: Vec<u64>,
    total: usize,
}

impl SizeIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one candidate.
    pub fn insert(&mut self, file: FileDescriptor) {
        self.total += 1;
        let size = file.size;

        if let Some(bucket) = self.buckets.get_mut(&size) {
            bucket.push(file);
        } else if let Some(first) = self.singletons.remove(&size) {
            self.buckets.insert(size, vec![first, file]);
        } else {
            self.order.push(size);
            self.singletons.insert(size, file);
        }
    }

    /// Merge a traversal batch.
    pub fn extend<I: IntoIterator<Item = FileDescriptor>>(&mut self, batch: I) {
        for file in batch {
            self.insert(file);
        }
    }

    /// Candidates inserted so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.total
    }

    /// True if nothing has been inserted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Sizes currently shared by two or more candidates.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Sizes currently held by exactly one candidate.
    #[must_use]
    pub fn singleton_count(&self) -> usize {
        self.singletons.len()
    }

    /// Close the index: drop singletons and return buckets in first-seen order.
    #[must_use]
    pub fn finalize(mut self) -> SizePartition {
        let unique = self.singletons.len();
        let buckets = self
            .order
            .iter()
            .filter_map(|size| {
                self.buckets.remove(size).map(|files| SizeBucket {
                    size: *size,
                    files,
                })
            })
            .collect();

        log::debug!(
            "Size index: {} candidates, {} unique sizes pruned",
            self.total,
            unique
        );

        SizePartition { buckets, unique }
    }
}
