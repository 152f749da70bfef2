//! CSV export of duplicate sets.
//!
//! One row per file, groups numbered from 1 in discovery order. Within a
//! group the kept file comes first.
//!
//! # Columns
//!
//! - `Group`: 1-based group number
//! - `FilePath`: path as discovered
//! - `Size`: file size in bytes
//! - `ModifiedTime`: modification time captured during traversal, local time
//!   `YYYY-MM-DD HH:MM:SS`
//! - `Status`: `KEEP` or `DUPLICATE`
//!
//! # Example
//!
//! ```no_run
//! use dedupinator::duplicates::DuplicateFinder;
//! use dedupinator::output::csv::CsvOutput;
//! use std::path::Path;
//!
//! let report = DuplicateFinder::with_defaults()
//!     .find_duplicates(Path::new("."))
//!     .unwrap();
//! CsvOutput::new(&report.sets).write_to(std::io::stdout()).unwrap();
//! ```

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use serde::Serialize;
use thiserror::Error;

use crate::duplicates::DuplicateSet;
use crate::scanner::FileDescriptor;

/// Directory under Documents used when no export directory is configured.
pub const DEFAULT_EXPORT_DIR: &str = "Dedupinator";

/// Errors that can occur during CSV output generation.
#[derive(Debug, Error)]
pub enum CsvOutputError {
    /// I/O error during writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error during CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// No export directory could be determined.
    #[error("Cannot determine a directory for CSV export; pass an explicit path")]
    NoExportDir,
}

/// Retention status of one exported row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
enum RowStatus {
    #[serde(rename = "KEEP")]
    Keep,
    #[serde(rename = "DUPLICATE")]
    Duplicate,
}

#[derive(Debug, Serialize)]
struct CsvRow {
    #[serde(rename = "Group")]
    group: usize,
    #[serde(rename = "FilePath")]
    file_path: String,
    #[serde(rename = "Size")]
    size: u64,
    #[serde(rename = "ModifiedTime")]
    modified_time: String,
    #[serde(rename = "Status")]
    status: RowStatus,
}

impl CsvRow {
    fn new(group: usize, file: &FileDescriptor, status: RowStatus) -> Self {
        Self {
            group,
            file_path: file.path.to_string_lossy().into_owned(),
            size: file.size,
            modified_time: format_modified(file.modified),
            status,
        }
    }
}

/// CSV output formatter.
pub struct CsvOutput<'a> {
    sets: &'a [DuplicateSet],
}

impl<'a> CsvOutput<'a> {
    /// Create a new CSV output formatter.
    #[must_use]
    pub fn new(sets: &'a [DuplicateSet]) -> Self {
        Self { sets }
    }

    /// Write the CSV output to the given writer.
    ///
    /// The header row is written even when there are no sets.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if writing or serialization fails.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), CsvOutputError> {
        let mut csv_writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        csv_writer.write_record(["Group", "FilePath", "Size", "ModifiedTime", "Status"])?;

        for (idx, set) in self.sets.iter().enumerate() {
            let group = idx + 1;
            csv_writer.serialize(CsvRow::new(group, &set.keep, RowStatus::Keep))?;
            for file in &set.remove {
                csv_writer.serialize(CsvRow::new(group, file, RowStatus::Duplicate))?;
            }
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Write the export to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if the file cannot be created or written.
    pub fn write_file(&self, path: &Path) -> Result<(), CsvOutputError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        self.write_to(io::BufWriter::new(file))?;
        log::info!("CSV export written to {}", path.display());
        Ok(())
    }

    /// Generate CSV output as a string.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if serialization fails.
    pub fn to_string(&self) -> Result<String, CsvOutputError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).to_string())
    }
}

fn format_modified(time: SystemTime) -> String {
    let datetime: DateTime<Local> = time.into();
    datetime.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Timestamped export file name, `duplicates_YYYYMMDD_HHMMSS.csv`.
#[must_use]
pub fn export_file_name(now: DateTime<Local>) -> String {
    format!("duplicates_{}.csv", now.format("%Y%m%d_%H%M%S"))
}

/// Default export path: `<csv_dir>` if given, otherwise
/// `<Documents>/Dedupinator`, plus a timestamped file name.
///
/// # Errors
///
/// Returns [`CsvOutputError::NoExportDir`] when no directory is configured
/// and the platform has no Documents or home directory.
pub fn default_csv_path(csv_dir: Option<&Path>) -> Result<PathBuf, CsvOutputError> {
    let dir = match csv_dir {
        Some(dir) => dir.to_path_buf(),
        None => {
            let user_dirs = directories::UserDirs::new().ok_or(CsvOutputError::NoExportDir)?;
            user_dirs
                .document_dir()
                .unwrap_or_else(|| user_dirs.home_dir())
                .join(DEFAULT_EXPORT_DIR)
        }
    };
    Ok(dir.join(export_file_name(Local::now())))
}
