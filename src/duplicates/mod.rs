//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Size-based bucketing (pre-filter, no I/O)
//! - Content grouping by digest within buckets
//! - Keep/remove resolution of duplicate groups
//! - Scan coordination, progress and cancellation

pub mod finder;
pub mod hash_index;
pub mod resolver;
pub mod size_index;
pub mod stats;

pub use finder::{
    default_workers, validate_root, DuplicateFinder, FinderConfig, FinderError, ProgressEvent,
    ScanEvent, ScanHandle, ScanPhase, ScanReport, ScanStatus, DEFAULT_PROGRESS_INTERVAL,
};
pub use hash_index::{HashGroup, HashIndex};
pub use resolver::{
    resolve, resolve_all, DuplicateSet, NewestFirst, OldestFirst, RetentionPolicy, RetentionRule,
};
pub use size_index::{SizeBucket, SizeIndex, SizePartition};
pub use stats::{ScanStatistics, StatisticsSnapshot};
