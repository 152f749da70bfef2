//! Output formatters for scan results.
//!
//! - JSON for automation and scripting
//! - CSV for spreadsheet import
//!
//! Human-readable text lives on [`crate::report::FinalReport`].
//!
//! # Example
//!
//! ```no_run
//! use dedupinator::duplicates::DuplicateFinder;
//! use dedupinator::output::json::JsonOutput;
//! use dedupinator::report::FinalReport;
//! use std::path::Path;
//!
//! let scan = DuplicateFinder::with_defaults()
//!     .find_duplicates(Path::new("."))
//!     .unwrap();
//! let report = FinalReport::new(&scan, None);
//! println!("{}", JsonOutput::new(&report).to_json_pretty().unwrap());
//! ```

pub mod csv;
pub mod json;

pub use csv::{default_csv_path, CsvOutput, CsvOutputError};
pub use json::JsonOutput;

/// Report format on stdout.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON report
    Json,
}
