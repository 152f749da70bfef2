//! Keep/remove selection for duplicate sets.
//!
//! # Overview
//!
//! [`resolve`] turns a [`HashGroup`] into a [`DuplicateSet`] by sorting its
//! members with a [`RetentionPolicy`]: the head of the sorted order is kept
//! and the rest are marked for removal, in sorted order.
//!
//! The default policy, [`NewestFirst`], keeps the most recently modified file
//! and breaks ties by ascending path. Modification times are filesystem
//! metadata and can be rewritten by copies, so "newest" is a retention rule,
//! not a guarantee of keeping the original.
//!
//! Resolution never touches the filesystem. Deleting is a separate step, see
//! [`crate::actions::Deleter`].
//!
//! # Example
//!
//! ```
//! use dedupinator::duplicates::{resolve, HashGroup, NewestFirst};
//! use dedupinator::scanner::{FileDescriptor, Hasher};
//! use std::path::PathBuf;
//! use std::time::{Duration, SystemTime};
//!
//! let old = SystemTime::UNIX_EPOCH;
//! let new = old + Duration::from_secs(60);
//! let group = HashGroup {
//!     size: 3,
//!     digest: Hasher::new().hash_bytes(b"abc"),
//!     files: vec![
//!         FileDescriptor::new(PathBuf::from("/a"), 3, old),
//!         FileDescriptor::new(PathBuf::from("/b"), 3, new),
//!     ],
//! };
//!
//! let set = resolve(group, &NewestFirst).unwrap();
//! assert_eq!(set.keep.path, PathBuf::from("/b"));
//! assert_eq!(set.remove.len(), 1);
//! ```

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::HashGroup;
use crate::scanner::{Digest, FileDescriptor};

/// Total order over the members of a duplicate group.
///
/// The first member under this order is the one retained. Implementations
/// must be total (break every tie) so the choice is deterministic.
pub trait RetentionPolicy: Send + Sync {
    /// Compare two members; `Less` means `a` is preferred for keeping.
    fn compare(&self, a: &FileDescriptor, b: &FileDescriptor) -> Ordering;

    /// Short name for logs and reports.
    fn name(&self) -> &'static str;
}

/// Keep the most recently modified file; ties go to the smallest path.
#[derive(Debug, Clone, Copy, Default)]
pub struct NewestFirst;

impl RetentionPolicy for NewestFirst {
    fn compare(&self, a: &FileDescriptor, b: &FileDescriptor) -> Ordering {
        b.modified
            .cmp(&a.modified)
            .then_with(|| a.path.cmp(&b.path))
    }

    fn name(&self) -> &'static str {
        "newest"
    }
}

/// Keep the least recently modified file; ties go to the smallest path.
#[derive(Debug, Clone, Copy, Default)]
pub struct OldestFirst;

impl RetentionPolicy for OldestFirst {
    fn compare(&self, a: &FileDescriptor, b: &FileDescriptor) -> Ordering {
        a.modified
            .cmp(&b.modified)
            .then_with(|| a.path.cmp(&b.path))
    }

    fn name(&self) -> &'static str {
        "oldest"
    }
}

/// Built-in retention rules, selectable from configuration.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum RetentionRule {
    /// Keep the most recently modified copy
    #[default]
    Newest,
    /// Keep the least recently modified copy
    Oldest,
}

impl RetentionRule {
    /// The policy implementing this rule.
    #[must_use]
    pub fn policy(self) -> &'static dyn RetentionPolicy {
        match self {
            Self::Newest => &NewestFirst,
            Self::Oldest => &OldestFirst,
        }
    }
}

impl fmt::Display for RetentionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.policy().name())
    }
}

/// A resolved duplicate group: one survivor and the copies to remove.
///
/// `keep` and `remove` together are exactly the group's members, with no
/// overlap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateSet {
    /// Byte size shared by all members
    pub size: u64,
    /// Content digest shared by all members
    pub digest: Digest,
    /// The retained file
    pub keep: FileDescriptor,
    /// Files marked for removal, in policy order
    pub remove: Vec<FileDescriptor>,
}

impl DuplicateSet {
    /// Total members including the kept file.
    #[must_use]
    pub fn len(&self) -> usize {
        self.remove.len() + 1
    }

    /// Always false; a set has at least its kept file.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// All members, kept file first.
    pub fn members(&self) -> impl Iterator<Item = &FileDescriptor> {
        std::iter::once(&self.keep).chain(self.remove.iter())
    }

    /// Bytes freed if every removal succeeds.
    #[must_use]
    pub fn reclaimable(&self) -> u64 {
        self.size.saturating_mul(self.remove.len() as u64)
    }
}

/// Resolve a hash group with the given policy.
///
/// Returns `None` for a group with fewer than two members.
#[must_use]
pub fn resolve(group: HashGroup, policy: &dyn RetentionPolicy) -> Option<DuplicateSet> {
    if !group.is_duplicate() {
        return None;
    }

    let mut files = group.files;
    files.sort_by(|a, b| policy.compare(a, b));
    let mut sorted = files.into_iter();
    let keep = sorted.next()?;

    log::trace!(
        "Resolved group {} ({}): keeping {}",
        group.digest,
        policy.name(),
        keep.path.display()
    );

    Some(DuplicateSet {
        size: group.size,
        digest: group.digest,
        keep,
        remove: sorted.collect(),
    })
}

/// Resolve every group, preserving the input order.
#[must_use]
pub fn resolve_all(groups: Vec<HashGroup>, policy: &dyn RetentionPolicy) -> Vec<DuplicateSet> {
    groups
        .into_iter()
        .filter_map(|g| resolve(g, policy))
        .collect()
}
