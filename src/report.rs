//! Final scan report and verdict.
//!
//! [`FinalReport`] combines a [`ScanReport`] with the outcome of an optional
//! deletion pass and classifies the run with a [`Verdict`]. The verdict keeps
//! "resolved", "some deletions failed" and "no duplicates" apart, and the
//! skipped/unhashable counts are reported separately from duplicate counts.

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use bytesize::ByteSize;
use serde::Serialize;
use yansi::Paint;

use crate::actions::DeletionSummary;
use crate::duplicates::{DuplicateSet, ScanReport, ScanStatus, StatisticsSnapshot};
use crate::error::ExitCode;

/// Overall classification of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Scan completed and found nothing
    NoDuplicates,
    /// Duplicates found; nothing was deleted
    DuplicatesFound,
    /// Duplicates found and every attempted removal succeeded
    Resolved,
    /// Duplicates found and at least one removal failed
    PartiallyResolved,
    /// The scan or the deletion pass was cancelled
    Cancelled,
}

impl Verdict {
    /// Classify a run.
    #[must_use]
    pub fn classify(scan: &ScanReport, deletion: Option<&DeletionSummary>) -> Self {
        if scan.status == ScanStatus::Cancelled || deletion.is_some_and(DeletionSummary::cancelled)
        {
            return Self::Cancelled;
        }
        if scan.sets.is_empty() {
            return Self::NoDuplicates;
        }
        match deletion {
            Some(d) if d.failed() > 0 => Self::PartiallyResolved,
            Some(d) if d.deleted() > 0 => Self::Resolved,
            _ => Self::DuplicatesFound,
        }
    }

    /// Process exit code for this verdict.
    #[must_use]
    pub fn exit_code(self) -> ExitCode {
        match self {
            Self::NoDuplicates => ExitCode::NoDuplicates,
            Self::DuplicatesFound | Self::Resolved => ExitCode::Success,
            Self::PartiallyResolved => ExitCode::PartialSuccess,
            Self::Cancelled => ExitCode::Interrupted,
        }
    }

    /// One-line human description.
    #[must_use]
    pub fn describe(self) -> &'static str {
        match self {
            Self::NoDuplicates => "No duplicates found",
            Self::DuplicatesFound => "Duplicates found",
            Self::Resolved => "Duplicates found and resolved",
            Self::PartiallyResolved => "Duplicates found, some deletions failed",
            Self::Cancelled => "Scan cancelled",
        }
    }
}

/// Everything a front end needs to present a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct FinalReport {
    /// Overall classification
    pub verdict: Verdict,
    /// Duplicate sets in discovery order
    pub sets: Vec<DuplicateSet>,
    /// Counters at the end of the run
    pub statistics: StatisticsSnapshot,
    /// Space that removing every marked copy would free
    pub reclaimable_bytes: u64,
    /// Unreadable traversal entries
    pub traversal_errors: Vec<String>,
    /// Files that could not be hashed
    pub read_errors: Vec<String>,
    /// Deletion failures by path
    pub deletion_failures: Vec<(PathBuf, String)>,
    /// Whether a deletion pass ran
    pub deletion_ran: bool,
    /// Scan wall-clock time in seconds
    pub duration_secs: f64,
}

impl FinalReport {
    /// Build the report from a scan and an optional deletion pass.
    #[must_use]
    pub fn new(scan: &ScanReport, deletion: Option<&DeletionSummary>) -> Self {
        Self {
            verdict: Verdict::classify(scan, deletion),
            sets: scan.sets.clone(),
            statistics: scan.snapshot(),
            reclaimable_bytes: scan.reclaimable(),
            traversal_errors: scan.traversal_errors.iter().map(ToString::to_string).collect(),
            read_errors: scan.read_errors.iter().map(ToString::to_string).collect(),
            deletion_failures: deletion
                .map(|d| {
                    d.failures()
                        .map(|(p, e)| (p.clone(), e.clone()))
                        .collect()
                })
                .unwrap_or_default(),
            deletion_ran: deletion.is_some(),
            duration_secs: scan.duration.as_secs_f64(),
        }
    }

    /// Process exit code for this run.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        self.verdict.exit_code()
    }

    /// Render duplicate sets and the statistics block as text.
    ///
    /// # Errors
    ///
    /// Propagates write errors.
    pub fn write_text<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write_sets(w, &self.sets)?;
        self.write_statistics(w)
    }

    /// Render the statistics block.
    ///
    /// # Errors
    ///
    /// Propagates write errors.
    pub fn write_statistics<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let s = &self.statistics;
        let headline = match self.verdict {
            Verdict::NoDuplicates | Verdict::Resolved => self.verdict.describe().green().bold(),
            Verdict::DuplicatesFound => self.verdict.describe().cyan().bold(),
            Verdict::PartiallyResolved | Verdict::Cancelled => {
                self.verdict.describe().red().bold()
            }
        };

        writeln!(w, "{headline}")?;
        writeln!(w, "  Files seen:          {}", s.files_seen)?;
        writeln!(w, "  Files processed:     {}", s.files_processed)?;
        writeln!(w, "  Files skipped:       {}", s.files_skipped)?;
        writeln!(w, "  Files hashed:        {}", s.files_hashed)?;
        writeln!(w, "  Unhashable files:    {}", s.files_unhashable)?;
        writeln!(w, "  Traversal errors:    {}", s.traversal_errors)?;
        writeln!(w, "  Duplicate groups:    {}", s.duplicate_sets)?;
        writeln!(w, "  Bytes processed:     {}", ByteSize(s.bytes_processed))?;
        if self.deletion_ran {
            writeln!(w, "  Files deleted:       {}", s.files_deleted)?;
            writeln!(w, "  Deletion failures:   {}", s.deletion_failures)?;
            writeln!(w, "  Space reclaimed:     {}", ByteSize(s.bytes_reclaimed))?;
        } else {
            writeln!(w, "  Reclaimable space:   {}", ByteSize(self.reclaimable_bytes))?;
        }
        writeln!(
            w,
            "  Elapsed:             {:.2?}",
            Duration::from_secs_f64(self.duration_secs)
        )?;

        for (path, reason) in &self.deletion_failures {
            writeln!(w, "  {} {}: {}", "failed".red(), path.display(), reason)?;
        }
        Ok(())
    }
}

/// List duplicate sets, numbered from 1, kept copy first.
///
/// # Errors
///
/// Propagates write errors.
pub fn write_sets<W: Write>(w: &mut W, sets: &[DuplicateSet]) -> io::Result<()> {
    for (idx, set) in sets.iter().enumerate() {
        writeln!(
            w,
            "{} {} ({} x {}, {})",
            "Group".bold(),
            idx + 1,
            set.len(),
            ByteSize(set.size),
            &set.digest.to_hex()[..16]
        )?;
        writeln!(w, "  {}       {}", "KEEP".green(), set.keep.path.display())?;
        for file in &set.remove {
            writeln!(w, "  {}  {}", "DUPLICATE".yellow(), file.path.display())?;
        }
        writeln!(w)?;
    }
    Ok(())
}
