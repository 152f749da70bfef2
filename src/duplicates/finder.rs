//! Duplicate finder: the scan coordinator.
//!
//! # Overview
//!
//! A scan runs on a dedicated coordinator thread:
//! 1. **Traverse** - the [`Walker`] yields filtered candidates in batches,
//!    which are merged into the [`SizeIndex`]
//! 2. **Bucket** - once traversal completes, unique sizes are pruned
//! 3. **Hash** - every member of every remaining bucket is hashed on a
//!    bounded rayon pool; workers send results back over a channel and the
//!    coordinator alone folds them into the [`HashIndex`]
//! 4. **Resolve** - groups with two or more members become
//!    [`DuplicateSet`]s through the configured retention policy
//!
//! The caller gets a [`ScanHandle`] immediately. Progress arrives on the
//! handle's event channel at a bounded rate; the final [`ScanReport`] is the
//! last event.
//!
//! Cancellation is checked at each traversal step and before each hash.
//! In-flight hashes finish. A cancelled scan reports its statistics but no
//! duplicate sets.
//!
//! # Example
//!
//! ```no_run
//! use dedupinator::duplicates::{DuplicateFinder, FinderConfig, ScanEvent};
//! use std::path::Path;
//!
//! let finder = DuplicateFinder::new(FinderConfig::default());
//! let handle = finder.start_scan(Path::new("/data")).unwrap();
//!
//! for event in handle.events() {
//!     match event {
//!         ScanEvent::Progress(p) => eprintln!("{} processed", p.processed),
//!         ScanEvent::Warning(w) => eprintln!("warning: {w}"),
//!         ScanEvent::Completed(report) => {
//!             println!("{} duplicate sets", report.sets.len());
//!             break;
//!         }
//!     }
//! }
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use serde::Serialize;

use super::{
    resolve_all, DuplicateSet, HashIndex, RetentionPolicy, RetentionRule, ScanStatistics,
    SizeIndex, StatisticsSnapshot,
};
use crate::error::ConfigurationError;
use crate::scanner::{
    Digest, FileDescriptor, HashAlgorithm, Hasher, ReadError, SizeExtensionFilter,
    TraversalError, WalkBatch, Walker, DEFAULT_BATCH_SIZE, DEFAULT_CHUNK_SIZE,
};
use crate::signal::CancellationToken;

/// Default minimum spacing between progress events.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(250);

/// Hashing workers when none are configured: available CPUs minus one,
/// at least one.
#[must_use]
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map_or(1, std::num::NonZeroUsize::get)
        .saturating_sub(1)
        .max(1)
}

/// Configuration for the duplicate finder.
#[derive(Clone)]
pub struct FinderConfig {
    /// Size and extension filter
    pub filter: SizeExtensionFilter,
    /// Candidates per traversal batch
    pub batch_size: usize,
    /// Bytes per read while hashing
    pub chunk_size: usize,
    /// Hashing workers; `None` means [`default_workers`]
    pub workers: Option<usize>,
    /// Digest algorithm
    pub algorithm: HashAlgorithm,
    /// Keep/remove ordering
    pub retention: Arc<dyn RetentionPolicy>,
    /// Minimum spacing between progress events
    pub progress_interval: Duration,
    /// External cancellation token (e.g. wired to Ctrl+C)
    pub cancellation: Option<CancellationToken>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("filter", &self.filter)
            .field("batch_size", &self.batch_size)
            .field("chunk_size", &self.chunk_size)
            .field("workers", &self.workers)
            .field("algorithm", &self.algorithm)
            .field("retention", &self.retention.name())
            .field("progress_interval", &self.progress_interval)
            .field("cancellation", &self.cancellation)
            .finish()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            filter: SizeExtensionFilter::new(1, u64::MAX, Vec::<String>::new()),
            batch_size: DEFAULT_BATCH_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers: None,
            algorithm: HashAlgorithm::default(),
            retention: Arc::new(super::NewestFirst),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            cancellation: None,
        }
    }
}

impl FinderConfig {
    /// Set the size/extension filter.
    #[must_use]
    pub fn with_filter(mut self, filter: SizeExtensionFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Set the traversal batch size.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the hashing chunk size.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Set the number of hashing workers.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Set the digest algorithm.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Use one of the built-in retention rules.
    #[must_use]
    pub fn with_retention(self, rule: RetentionRule) -> Self {
        match rule {
            RetentionRule::Newest => self.with_retention_policy(Arc::new(super::NewestFirst)),
            RetentionRule::Oldest => self.with_retention_policy(Arc::new(super::OldestFirst)),
        }
    }

    /// Use a custom retention policy.
    #[must_use]
    pub fn with_retention_policy(mut self, policy: Arc<dyn RetentionPolicy>) -> Self {
        self.retention = policy;
        self
    }

    /// Set the minimum spacing between progress events.
    #[must_use]
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Drive cancellation from an external token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// The worker count a scan will actually use.
    #[must_use]
    pub fn effective_workers(&self) -> usize {
        self.workers.unwrap_or_else(default_workers)
    }

    /// Check settings that do not depend on the scan root.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigurationError`] found.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.filter.min_size > self.filter.max_size {
            return Err(ConfigurationError::InvalidSizeRange {
                min: self.filter.min_size,
                max: self.filter.max_size,
            });
        }
        if self.batch_size == 0 {
            return Err(ConfigurationError::ZeroBatchSize);
        }
        if self.chunk_size == 0 {
            return Err(ConfigurationError::ZeroChunkSize);
        }
        if self.workers == Some(0) {
            return Err(ConfigurationError::ZeroWorkers);
        }
        Ok(())
    }
}

/// Check that `root` is an existing directory.
///
/// # Errors
///
/// Returns [`ConfigurationError::RootNotFound`] or
/// [`ConfigurationError::RootNotDirectory`].
pub fn validate_root(root: &Path) -> Result<(), ConfigurationError> {
    match std::fs::metadata(root) {
        Ok(m) if m.is_dir() => Ok(()),
        Ok(_) => Err(ConfigurationError::RootNotDirectory(root.to_path_buf())),
        Err(_) => Err(ConfigurationError::RootNotFound(root.to_path_buf())),
    }
}

/// Errors that stop a scan from starting or finishing.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// Settings were rejected before any I/O.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The hashing pool could not be created.
    #[error("Failed to start hashing workers: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    /// The coordinator thread could not be spawned.
    #[error("Failed to start scan coordinator: {0}")]
    Spawn(#[source] std::io::Error),

    /// The coordinator stopped without delivering a report.
    #[error("Scan coordinator exited without a result")]
    ResultLost,
}

/// Stage the scan is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanPhase {
    /// Walking the tree and bucketing by size
    Traversing,
    /// Hashing bucket members
    Hashing,
    /// Scan has ended
    Finished,
}

/// Rate-limited progress snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    /// Current stage
    pub phase: ScanPhase,
    /// Candidates received by the size index
    pub processed: u64,
    /// Files rejected by the filter
    pub skipped: u64,
    /// Files hashed
    pub hashed: u64,
    /// Duplicate groups found so far
    pub duplicate_groups: u64,
    /// Total size of candidates
    pub bytes_processed: u64,
    /// Most recent file handled, if any
    pub current_path: Option<PathBuf>,
}

impl ProgressEvent {
    fn from_stats(phase: ScanPhase, stats: &StatisticsSnapshot, current: Option<&Path>) -> Self {
        Self {
            phase,
            processed: stats.files_processed,
            skipped: stats.files_skipped,
            hashed: stats.files_hashed,
            duplicate_groups: stats.duplicate_sets,
            bytes_processed: stats.bytes_processed,
            current_path: current.map(Path::to_path_buf),
        }
    }
}

/// How a scan ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    /// Every bucket was hashed and resolved
    Completed,
    /// Cancellation stopped the scan early
    Cancelled,
}

/// Final result of a scan.
#[derive(Debug)]
pub struct ScanReport {
    /// How the scan ended
    pub status: ScanStatus,
    /// Duplicate sets in discovery order; empty when cancelled
    pub sets: Vec<DuplicateSet>,
    /// Live counters; deletions performed later are added here
    pub statistics: Arc<ScanStatistics>,
    /// Entries the traversal could not read
    pub traversal_errors: Vec<TraversalError>,
    /// Files that could not be hashed
    pub read_errors: Vec<ReadError>,
    /// Wall-clock time of the scan
    pub duration: Duration,
}

impl ScanReport {
    /// Whether the scan ran to completion.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status == ScanStatus::Completed
    }

    /// Current statistics.
    #[must_use]
    pub fn snapshot(&self) -> StatisticsSnapshot {
        self.statistics.snapshot()
    }

    /// Bytes that removing every marked copy would free.
    #[must_use]
    pub fn reclaimable(&self) -> u64 {
        self.sets.iter().map(DuplicateSet::reclaimable).sum()
    }
}

/// Messages delivered on a [`ScanHandle`].
#[derive(Debug)]
pub enum ScanEvent {
    /// Periodic progress
    Progress(ProgressEvent),
    /// A non-fatal problem (unreadable entry or file)
    Warning(String),
    /// The scan ended; always the last event
    Completed(Box<ScanReport>),
}

/// Handle to a running scan.
#[derive(Debug)]
pub struct ScanHandle {
    events: Receiver<ScanEvent>,
    cancel: CancellationToken,
    statistics: Arc<ScanStatistics>,
    finished: Arc<AtomicBool>,
    coordinator: Option<JoinHandle<()>>,
}

impl ScanHandle {
    /// Event stream. Ends after [`ScanEvent::Completed`].
    #[must_use]
    pub fn events(&self) -> &Receiver<ScanEvent> {
        &self.events
    }

    /// Request cancellation. Best-effort: in-flight hashes finish.
    pub fn cancel(&self) {
        log::info!("Scan cancellation requested");
        self.cancel.cancel();
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Live counters of this scan.
    #[must_use]
    pub fn statistics(&self) -> Arc<ScanStatistics> {
        Arc::clone(&self.statistics)
    }

    /// Block until the scan ends and return its report.
    ///
    /// Progress and warning events still queued are discarded.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::ResultLost`] if the report was already taken
    /// from [`ScanHandle::events`] or the coordinator died.
    pub fn wait(mut self) -> Result<ScanReport, FinderError> {
        let report = self.events.iter().find_map(|event| match event {
            ScanEvent::Completed(report) => Some(*report),
            _ => None,
        });
        if let Some(handle) = self.coordinator.take() {
            if handle.join().is_err() {
                log::error!("Scan coordinator panicked");
            }
        }
        report.ok_or(FinderError::ResultLost)
    }
}

/// Dropping the handle of an unfinished scan cancels it.
impl Drop for ScanHandle {
    fn drop(&mut self) {
        if self.coordinator.is_some() && !self.finished.load(Ordering::Acquire) {
            log::debug!("Scan handle dropped before completion; cancelling");
            self.cancel.cancel();
        }
    }
}

/// Duplicate finder that starts scans with a fixed configuration.
#[derive(Debug, Clone)]
pub struct DuplicateFinder {
    config: FinderConfig,
}

impl DuplicateFinder {
    /// Create a new duplicate finder with the given configuration.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        Self { config }
    }

    /// Create a new duplicate finder with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FinderConfig::default())
    }

    /// The finder's configuration.
    #[must_use]
    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Start scanning `root` in the background.
    ///
    /// Configuration and root are validated before any I/O; the handle is
    /// returned immediately afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError::Configuration`] for invalid settings or root,
    /// and [`FinderError::WorkerPool`]/[`FinderError::Spawn`] if threads
    /// cannot be created.
    pub fn start_scan(&self, root: &Path) -> Result<ScanHandle, FinderError> {
        self.config.validate()?;
        validate_root(root)?;

        let root = root.to_path_buf();
        let filter = self.config.filter.clone();
        let batch_size = self.config.batch_size;
        self.spawn(move |coordinator| {
            log::info!("Scanning {}", root.display());
            let walker = Walker::new(&root, filter)
                .with_cancellation(coordinator.cancel.clone())
                .with_statistics(Arc::clone(&coordinator.stats));
            coordinator.run(walker.batches(batch_size));
        })
    }

    /// Start a scan over pre-collected candidate batches.
    ///
    /// The batches are consumed lazily on the coordinator thread, with the
    /// same cancellation checks as a filesystem walk.
    ///
    /// # Errors
    ///
    /// Same as [`DuplicateFinder::start_scan`], minus root validation.
    pub fn start_scan_batches<I>(&self, batches: I) -> Result<ScanHandle, FinderError>
    where
        I: IntoIterator<Item = WalkBatch> + Send + 'static,
        I::IntoIter: Send,
    {
        self.config.validate()?;
        self.spawn(move |coordinator| coordinator.run(batches.into_iter()))
    }

    /// Scan `root` and block until it finishes.
    ///
    /// # Errors
    ///
    /// Same as [`DuplicateFinder::start_scan`].
    pub fn find_duplicates(&self, root: &Path) -> Result<ScanReport, FinderError> {
        self.start_scan(root)?.wait()
    }

    fn spawn<F>(&self, body: F) -> Result<ScanHandle, FinderError>
    where
        F: FnOnce(Coordinator) + Send + 'static,
    {
        let workers = self.config.effective_workers();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("hash-worker-{i}"))
            .build()?;
        log::debug!("Hashing pool started with {} workers", workers);

        let cancel = self.config.cancellation.clone().unwrap_or_default();
        let statistics = Arc::new(ScanStatistics::new());
        let finished = Arc::new(AtomicBool::new(false));
        let (events_tx, events_rx) = crossbeam_channel::unbounded();

        let coordinator = Coordinator {
            config: self.config.clone(),
            pool,
            cancel: cancel.clone(),
            stats: Arc::clone(&statistics),
            events: events_tx,
            throttle: Throttle::new(self.config.progress_interval),
            current: None,
            finished: Arc::clone(&finished),
        };

        let handle = std::thread::Builder::new()
            .name("scan-coordinator".into())
            .spawn(move || body(coordinator))
            .map_err(FinderError::Spawn)?;

        Ok(ScanHandle {
            events: events_rx,
            cancel,
            statistics,
            finished,
            coordinator: Some(handle),
        })
    }
}

/// Emits at most one event per interval.
#[derive(Debug)]
struct Throttle {
    interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    fn ready(&mut self) -> bool {
        let now = Instant::now();
        match self.last {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

enum HashOutcome {
    Hashed(FileDescriptor, Digest),
    Failed(ReadError),
}

struct Coordinator {
    config: FinderConfig,
    pool: rayon::ThreadPool,
    cancel: CancellationToken,
    stats: Arc<ScanStatistics>,
    events: Sender<ScanEvent>,
    throttle: Throttle,
    current: Option<PathBuf>,
    finished: Arc<AtomicBool>,
}

impl Coordinator {
    fn run<I: Iterator<Item = WalkBatch>>(mut self, batches: I) {
        let started = Instant::now();
        let mut traversal_errors = Vec::new();
        let mut read_errors = Vec::new();

        let size_index = self.traverse(batches, &mut traversal_errors);
        let sets = if self.cancel.is_cancelled() {
            None
        } else {
            self.hash_and_resolve(size_index, &mut read_errors)
        };

        let (status, sets) = match sets {
            Some(sets) => (ScanStatus::Completed, sets),
            None => (ScanStatus::Cancelled, Vec::new()),
        };
        self.finish(status, sets, traversal_errors, read_errors, started);
    }

    fn traverse<I: Iterator<Item = WalkBatch>>(
        &mut self,
        batches: I,
        errors: &mut Vec<TraversalError>,
    ) -> SizeIndex {
        let mut index = SizeIndex::new();

        'batches: for batch in batches {
            for error in batch.errors {
                self.warn(error.to_string());
                errors.push(error);
            }
            for file in batch.files {
                if self.cancel.is_cancelled() {
                    break 'batches;
                }
                self.stats.inc_processed();
                self.stats.add_bytes_processed(file.size);
                self.current = Some(file.path.clone());
                index.insert(file);
            }
            self.progress(ScanPhase::Traversing, false);
        }

        self.progress(ScanPhase::Traversing, true);
        log::info!(
            "Traversal finished: {} candidates, {} skipped",
            index.len(),
            self.stats.snapshot().files_skipped
        );
        index
    }

    /// Returns `None` if cancellation interrupted hashing.
    fn hash_and_resolve(
        &mut self,
        size_index: SizeIndex,
        read_errors: &mut Vec<ReadError>,
    ) -> Option<Vec<DuplicateSet>> {
        let partition = size_index.finalize();
        log::info!(
            "Hashing {} files in {} size buckets ({} unique sizes eliminated)",
            partition.candidate_count(),
            partition.buckets.len(),
            partition.unique
        );

        let mut hash_index =
            HashIndex::new().with_bucket_order(partition.buckets.iter().map(|b| b.size));
        let hasher = Hasher::new()
            .with_algorithm(self.config.algorithm)
            .with_chunk_size(self.config.chunk_size);
        let (tx, rx) = crossbeam_channel::bounded::<HashOutcome>(self.config.batch_size);

        for bucket in partition.buckets {
            for file in bucket.files {
                let tx = tx.clone();
                let cancel = self.cancel.clone();
                let stats = Arc::clone(&self.stats);
                self.pool.spawn(move || {
                    if cancel.is_cancelled() {
                        return;
                    }
                    let outcome = match hasher.hash_file(&file.path) {
                        Ok(digest) => {
                            stats.inc_hashed();
                            stats.add_bytes_hashed(file.size);
                            HashOutcome::Hashed(file, digest)
                        }
                        Err(e) => {
                            stats.inc_unhashable();
                            HashOutcome::Failed(e)
                        }
                    };
                    let _ = tx.send(outcome);
                });
            }
        }
        drop(tx);

        loop {
            match rx.recv_timeout(self.config.progress_interval) {
                Ok(HashOutcome::Hashed(file, digest)) => {
                    self.current = Some(file.path.clone());
                    if hash_index.insert(file, digest) {
                        self.stats.inc_duplicate_sets();
                    }
                    self.progress(ScanPhase::Hashing, false);
                }
                Ok(HashOutcome::Failed(e)) => {
                    log::warn!("{}", e);
                    self.warn(e.to_string());
                    read_errors.push(e);
                }
                Err(RecvTimeoutError::Timeout) => self.progress(ScanPhase::Hashing, false),
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        if self.cancel.is_cancelled() {
            log::info!("Hashing cancelled; discarding partial groups");
            return None;
        }

        let sets = resolve_all(hash_index.into_groups(), self.config.retention.as_ref());
        log::info!("Found {} duplicate sets", sets.len());
        Some(sets)
    }

    fn finish(
        mut self,
        status: ScanStatus,
        sets: Vec<DuplicateSet>,
        traversal_errors: Vec<TraversalError>,
        read_errors: Vec<ReadError>,
        started: Instant,
    ) {
        self.current = None;
        self.progress(ScanPhase::Finished, true);

        let report = ScanReport {
            status,
            sets,
            statistics: Arc::clone(&self.stats),
            traversal_errors,
            read_errors,
            duration: started.elapsed(),
        };
        log::info!("Scan {:?} in {:.2?}", report.status, report.duration);

        self.finished.store(true, Ordering::Release);
        if self
            .events
            .send(ScanEvent::Completed(Box::new(report)))
            .is_err()
        {
            log::debug!("Scan report dropped: no receiver");
        }
    }

    fn progress(&mut self, phase: ScanPhase, force: bool) {
        if force || self.throttle.ready() {
            let snapshot = self.stats.snapshot();
            let event = ProgressEvent::from_stats(phase, &snapshot, self.current.as_deref());
            let _ = self.events.send(ScanEvent::Progress(event));
        }
    }

    fn warn(&self, message: String) {
        let _ = self.events.send(ScanEvent::Warning(message));
    }
}
