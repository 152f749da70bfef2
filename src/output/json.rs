//! JSON output formatter for the final report.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "verdict": "duplicates_found",
//!   "exit_code": 0,
//!   "exit_code_name": "DD000",
//!   "sets": [
//!     {
//!       "hash": "abc123...",
//!       "size": 1024,
//!       "keep": { "path": "/a.txt", "size": 1024, "modified": "2024-03-09T14:05:07+00:00" },
//!       "duplicates": [ { "path": "/b.txt", "size": 1024, "modified": "..." } ]
//!     }
//!   ],
//!   "statistics": { "files_seen": 100, "files_processed": 80, "...": 0 },
//!   "reclaimable_bytes": 1024,
//!   "traversal_errors": [],
//!   "read_errors": [],
//!   "deletion_failures": [],
//!   "duration_ms": 12
//! }
//! ```

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::duplicates::{DuplicateSet, StatisticsSnapshot};
use crate::report::{FinalReport, Verdict};
use crate::scanner::FileDescriptor;

/// One file in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonFile {
    /// Path as discovered
    pub path: String,
    /// Size in bytes
    pub size: u64,
    /// Modification time captured during traversal (RFC 3339, UTC)
    pub modified: String,
}

impl From<&FileDescriptor> for JsonFile {
    fn from(file: &FileDescriptor) -> Self {
        let modified: DateTime<Utc> = file.modified.into();
        Self {
            path: file.path.to_string_lossy().into_owned(),
            size: file.size,
            modified: modified.to_rfc3339(),
        }
    }
}

/// One duplicate set in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuplicateSet {
    /// Content digest as hexadecimal (64 characters)
    pub hash: String,
    /// Size of every member in bytes
    pub size: u64,
    /// The retained copy
    pub keep: JsonFile,
    /// Copies marked for removal
    pub duplicates: Vec<JsonFile>,
}

impl From<&DuplicateSet> for JsonDuplicateSet {
    fn from(set: &DuplicateSet) -> Self {
        Self {
            hash: set.digest.to_hex(),
            size: set.size,
            keep: JsonFile::from(&set.keep),
            duplicates: set.remove.iter().map(JsonFile::from).collect(),
        }
    }
}

/// A deletion failure in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonFailure {
    /// File that remains
    pub path: String,
    /// Why removal failed
    pub reason: String,
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Overall classification of the run
    pub verdict: Verdict,
    /// Process exit code
    pub exit_code: i32,
    /// Machine-readable exit code name (e.g. "DD000")
    pub exit_code_name: String,
    /// Duplicate sets in discovery order
    pub sets: Vec<JsonDuplicateSet>,
    /// Counters at the end of the run
    pub statistics: StatisticsSnapshot,
    /// Space removing every marked copy would free
    pub reclaimable_bytes: u64,
    /// Traversal problems
    pub traversal_errors: Vec<String>,
    /// Files that could not be hashed
    pub read_errors: Vec<String>,
    /// Removals that failed
    pub deletion_failures: Vec<JsonFailure>,
    /// Scan duration in milliseconds
    pub duration_ms: u64,
}

impl JsonOutput {
    /// Build the JSON view of a final report.
    #[must_use]
    pub fn new(report: &FinalReport) -> Self {
        let exit_code = report.exit_code();
        Self {
            verdict: report.verdict,
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
            sets: report.sets.iter().map(JsonDuplicateSet::from).collect(),
            statistics: report.statistics,
            reclaimable_bytes: report.reclaimable_bytes,
            traversal_errors: report.traversal_errors.clone(),
            read_errors: report.read_errors.clone(),
            deletion_failures: report
                .deletion_failures
                .iter()
                .map(|(path, reason)| JsonFailure {
                    path: path.to_string_lossy().into_owned(),
                    reason: reason.clone(),
                })
                .collect(),
            duration_ms: (report.duration_secs * 1000.0).round() as u64,
        }
    }

    /// Serialize to compact JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer, followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, mut writer: W, pretty: bool) -> std::io::Result<()> {
        if pretty {
            serde_json::to_writer_pretty(&mut writer, self)?;
        } else {
            serde_json::to_writer(&mut writer, self)?;
        }
        writeln!(writer)?;
        Ok(())
    }
}
