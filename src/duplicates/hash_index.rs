//! Content grouping within size buckets.
//!
//! The coordinating thread folds `(FileDescriptor, Digest)` results from the
//! hashing workers into a [`HashIndex`] keyed by `(size, digest)`. Keying on
//! size as well as digest keeps the size bucket authoritative: files of
//! different sizes are never grouped together.
//!
//! Group membership does not depend on the order results arrive in; members
//! are sorted by path when the index is closed.

use std::collections::HashMap;

use serde::Serialize;

use crate::scanner::{Digest, FileDescriptor};

/// Files sharing one size and one digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HashGroup {
    /// Byte size shared by all members
    pub size: u64,
    /// Content digest shared by all members
    pub digest: Digest,
    /// Members sorted by path
    pub files: Vec<FileDescriptor>,
}

impl HashGroup {
    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// True if the group has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// A group is a duplicate set iff it has two or more members.
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        self.files.len() >= 2
    }
}

/// `(size, digest) -> files` index, owned by a single thread.
#[derive(Debug, Default)]
pub struct HashIndex {
    groups: HashMap<(u64, Digest), Vec<FileDescriptor>>,
    bucket_rank: HashMap<u64, usize>,
}

impl HashIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the discovery rank of each size bucket.
    ///
    /// Groups from earlier buckets come first in [`HashIndex::into_groups`].
    #[must_use]
    pub fn with_bucket_order<I: IntoIterator<Item = u64>>(mut self, sizes: I) -> Self {
        self.bucket_rank = sizes
            .into_iter()
            .enumerate()
            .map(|(rank, size)| (size, rank))
            .collect();
        self
    }

    /// Fold one hashed file into the index.
    ///
    /// Returns `true` when this insert turns the group into a duplicate set
    /// (its second member).
    pub fn insert(&mut self, file: FileDescriptor, digest: Digest) -> bool {
        let members = self.groups.entry((file.size, digest)).or_default();
        members.push(file);
        members.len() == 2
    }

    /// Number of `(size, digest)` keys currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// True if nothing has been inserted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of keys with two or more members.
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.groups.values().filter(|v| v.len() >= 2).count()
    }

    /// Close the index, keeping only groups with two or more members.
    ///
    /// Members are sorted by path. Groups are ordered by bucket rank, then
    /// by their first member's path.
    #[must_use]
    pub fn into_groups(self) -> Vec<HashGroup> {
        let rank = self.bucket_rank;
        let mut groups: Vec<HashGroup> = self
            .groups
            .into_iter()
            .filter(|(_, files)| files.len() >= 2)
            .map(|((size, digest), mut files)| {
                files.sort_by(|a, b| a.path.cmp(&b.path));
                HashGroup {
                    size,
                    digest,
                    files,
                }
            })
            .collect();

        groups.sort_by(|a, b| {
            let ra = rank.get(&a.size).copied().unwrap_or(usize::MAX);
            let rb = rank.get(&b.size).copied().unwrap_or(usize::MAX);
            ra.cmp(&rb).then_with(|| a.files[0].path.cmp(&b.files[0].path))
        });

        groups
    }
}
