//! Command-line interface definitions for dedupinator.
//!
//! Global options (verbosity, color, logging, config file) apply to every
//! subcommand. Scan flags override the configuration file and environment.
//!
//! # Example
//!
//! ```bash
//! # Report duplicates, ask before deleting each set
//! dedupinator scan ~/Downloads
//!
//! # JSON report, never delete
//! dedupinator scan ~/Downloads --output json --dry-run
//!
//! # Only files between 1 MiB and 1 GiB, keep the oldest copy
//! dedupinator scan ~/Downloads --min-size 1MB --max-size 1GB --keep oldest
//!
//! # Write the default configuration file
//! dedupinator config --init
//! ```

use clap::{Args, Parser, Subcommand};
use std::fmt;
use std::path::PathBuf;

use crate::actions::ConfirmMode;
use crate::config::SizeUnit;
use crate::duplicates::RetentionRule;
use crate::error::ConfigurationError;
use crate::output::OutputFormat;
use crate::scanner::HashAlgorithm;

/// Find exact duplicate files and keep one copy of each.
///
/// Files are grouped by size, then by content digest. In each duplicate set
/// one copy is kept (the newest by default) and the rest can be deleted.
#[derive(Debug, Parser)]
#[command(name = "dedupinator")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Write log records to this file instead of stderr
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Configuration file (default: platform config directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print fatal errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan a directory for duplicate files
    Scan(ScanArgs),
    /// Create or show the configuration file
    Config(ConfigArgs),
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Directory to scan
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Report format on stdout
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Smallest file to consider (e.g. 10, 1KB, 500MB, 2GiB)
    ///
    /// Suffixes are binary: KB = KiB = 1024 bytes. Plain numbers use --unit.
    #[arg(long, value_name = "SIZE", value_parser = parse_size_arg)]
    pub min_size: Option<SizeArg>,

    /// Largest file to consider (e.g. 10, 1KB, 500MB, 2GiB)
    #[arg(long, value_name = "SIZE", value_parser = parse_size_arg)]
    pub max_size: Option<SizeArg>,

    /// Unit for plain --min-size/--max-size numbers
    #[arg(long, value_enum, value_name = "UNIT")]
    pub unit: Option<SizeUnit>,

    /// Extension to skip; repeat or separate with commas. Replaces the
    /// configured list.
    #[arg(long = "skip-ext", value_name = "EXT", value_delimiter = ',')]
    pub skip_extensions: Vec<String>,

    /// Candidates handed to the size index per batch
    #[arg(long, value_name = "N")]
    pub batch_size: Option<usize>,

    /// Bytes per read while hashing (e.g. 4MB)
    #[arg(long, value_name = "SIZE", value_parser = parse_size_arg)]
    pub chunk_size: Option<SizeArg>,

    /// Hashing worker threads (default: CPUs - 1)
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// Content digest
    #[arg(long, value_enum)]
    pub algorithm: Option<HashAlgorithm>,

    /// Which copy of each set to keep
    #[arg(long, value_enum)]
    pub keep: Option<RetentionRule>,

    /// Delete duplicates without asking
    #[arg(long, conflicts_with = "dry_run")]
    pub auto_delete: bool,

    /// Report only; never delete
    #[arg(long)]
    pub dry_run: bool,

    /// Ask once per set or once for the whole scan
    #[arg(long, value_enum)]
    pub confirm_mode: Option<ConfirmMode>,

    /// Move duplicates to the trash instead of deleting them
    #[arg(long)]
    pub trash: bool,

    /// Export duplicate sets as CSV to this file
    #[arg(long, value_name = "FILE")]
    pub csv: Option<PathBuf>,

    /// Export CSV to the default location (Documents/Dedupinator)
    #[arg(long, conflicts_with = "csv")]
    pub export_csv: bool,

    /// Minimum milliseconds between progress updates
    #[arg(long, value_name = "MS")]
    pub progress_interval_ms: Option<u64>,

    /// Hide the live status line
    #[arg(long)]
    pub no_progress: bool,
}

/// Arguments for the config subcommand.
#[derive(Debug, Args)]
#[command(group(clap::ArgGroup::new("action").required(true).args(["init", "show"])))]
pub struct ConfigArgs {
    /// Write the default configuration file
    #[arg(long)]
    pub init: bool,

    /// Overwrite an existing file with --init
    #[arg(long, requires = "init")]
    pub force: bool,

    /// Print the effective configuration as TOML
    #[arg(long)]
    pub show: bool,
}

/// A size from the command line: a number with an optional unit suffix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeArg {
    amount: Amount,
    multiplier: Option<u64>,
}

/// Whole numbers stay exact; only a decimal point goes through `f64`.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Amount {
    Whole(u64),
    Fractional(f64),
}

impl SizeArg {
    /// Bytes, reading a plain number in `unit`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidSize`] if the result does not fit
    /// in 64 bits.
    pub fn to_bytes(self, unit: SizeUnit) -> Result<u64, ConfigurationError> {
        let multiplier = self.multiplier.unwrap_or_else(|| unit.multiplier());
        let too_large = || ConfigurationError::InvalidSize(self.to_string());
        match self.amount {
            Amount::Whole(n) => n.checked_mul(multiplier).ok_or_else(too_large),
            Amount::Fractional(x) => {
                let bytes = x * multiplier as f64;
                if !bytes.is_finite() || bytes >= u64::MAX as f64 {
                    return Err(too_large());
                }
                Ok(bytes as u64)
            }
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Whole(n) => write!(f, "{n}"),
            Self::Fractional(x) => write!(f, "{x}"),
        }
    }
}

impl fmt::Display for SizeArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.multiplier {
            Some(m) => write!(f, "{} x {}", self.amount, m),
            None => write!(f, "{}", self.amount),
        }
    }
}

/// Parse a size argument, keeping plain numbers unit-less.
///
/// # Errors
///
/// Returns an error if the string is empty, contains an invalid number,
/// a negative number, or an unknown size suffix.
pub fn parse_size_arg(s: &str) -> Result<SizeArg, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }
    if s.starts_with('-') {
        return Err("Size cannot be negative".to_string());
    }

    // Find where the number ends and the suffix begins
    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let invalid = || format!("Invalid number: '{num_str}'");
    let amount = if num_str.contains('.') {
        Amount::Fractional(num_str.parse().map_err(|_| invalid())?)
    } else {
        Amount::Whole(num_str.parse().map_err(|_| invalid())?)
    };

    let multiplier = match suffix.as_str() {
        "" => None,
        "B" => Some(1),
        "K" | "KB" | "KIB" => Some(1 << 10),
        "M" | "MB" | "MIB" => Some(1 << 20),
        "G" | "GB" | "GIB" => Some(1 << 30),
        "T" | "TB" | "TIB" => Some(1 << 40),
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    Ok(SizeArg { amount, multiplier })
}

/// Parse a human-readable size string into bytes.
///
/// Plain numbers are bytes. Suffixes are binary and case-insensitive.
///
/// # Examples
///
/// ```
/// use dedupinator::cli::parse_size;
///
/// assert_eq!(parse_size("1024").unwrap(), 1024);
/// assert_eq!(parse_size("1KB").unwrap(), 1024);
/// assert_eq!(parse_size("1MiB").unwrap(), 1_048_576);
/// assert_eq!(parse_size("1.5GB").unwrap(), 1_610_612_736);
/// ```
///
/// # Errors
///
/// Same as [`parse_size_arg`], plus overflow.
pub fn parse_size(s: &str) -> Result<u64, String> {
    parse_size_arg(s)?
        .to_bytes(SizeUnit::B)
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size_bytes() {
        assert_eq!(parse_size("1024").unwrap(), 1024);
        assert_eq!(parse_size("1024B").unwrap(), 1024);
        assert_eq!(parse_size("0").unwrap(), 0);
    }

    #[test]
    fn test_parse_size_binary_suffixes() {
        assert_eq!(parse_size("1KB").unwrap(), 1_024);
        assert_eq!(parse_size("1k").unwrap(), 1_024);
        assert_eq!(parse_size("1kib").unwrap(), 1_024);
        assert_eq!(parse_size("10MB").unwrap(), 10 << 20);
        assert_eq!(parse_size("1GiB").unwrap(), 1 << 30);
        assert_eq!(parse_size("1TB").unwrap(), 1 << 40);
    }

    #[test]
    fn test_parse_size_fractional_and_whitespace() {
        assert_eq!(parse_size("0.5KB").unwrap(), 512);
        assert_eq!(parse_size("  1 MB ").unwrap(), 1 << 20);
    }

    #[test]
    fn test_parse_size_errors() {
        assert!(parse_size("").is_err());
        assert!(parse_size("abc").is_err());
        assert!(parse_size("1XB").is_err());
        assert!(parse_size("-1MB").is_err());
        assert!(parse_size("99999999999TB").is_err());
    }

    #[test]
    fn test_parse_size_whole_numbers_are_exact() {
        // 2^53 + 1 has no exact f64 representation.
        assert_eq!(parse_size("9007199254740993").unwrap(), 9_007_199_254_740_993);
        assert_eq!(parse_size(&u64::MAX.to_string()).unwrap(), u64::MAX);
        assert!(parse_size("18446744073709551616").is_err());
        assert!(parse_size("16777216TB").is_err());
    }

    #[test]
    fn test_plain_number_uses_unit() {
        let arg = parse_size_arg("3").unwrap();
        assert_eq!(arg.to_bytes(SizeUnit::Mb).unwrap(), 3 << 20);
        let suffixed = parse_size_arg("3KB").unwrap();
        assert_eq!(suffixed.to_bytes(SizeUnit::Mb).unwrap(), 3 << 10);
    }

    #[test]
    fn test_cli_parse_scan_basic() {
        let cli = Cli::try_parse_from(["dedupinator", "scan", "/some/path"]).unwrap();
        assert_eq!(cli.verbose, 0);
        match cli.command {
            Commands::Scan(args) => {
                assert_eq!(args.path, PathBuf::from("/some/path"));
                assert_eq!(args.output, OutputFormat::Text);
                assert!(!args.auto_delete);
                assert!(args.skip_extensions.is_empty());
            }
            Commands::Config(_) => panic!("Expected Scan command"),
        }
    }

    #[test]
    fn test_cli_parse_scan_with_options() {
        let cli = Cli::try_parse_from([
            "dedupinator",
            "-v",
            "--log-file",
            "run.log",
            "scan",
            "/path",
            "--output",
            "json",
            "--min-size",
            "1MB",
            "--max-size",
            "2",
            "--unit",
            "gb",
            "--skip-ext",
            ".bak,.old",
            "--skip-ext",
            "iso",
            "--keep",
            "oldest",
            "--algorithm",
            "blake3",
            "--confirm-mode",
            "whole-scan",
            "--workers",
            "2",
            "--trash",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        assert_eq!(cli.log_file, Some(PathBuf::from("run.log")));

        match cli.command {
            Commands::Scan(args) => {
                assert_eq!(args.output, OutputFormat::Json);
                assert_eq!(args.min_size.unwrap().to_bytes(SizeUnit::B).unwrap(), 1 << 20);
                assert_eq!(args.unit, Some(SizeUnit::Gb));
                assert_eq!(args.skip_extensions, vec![".bak", ".old", "iso"]);
                assert_eq!(args.keep, Some(RetentionRule::Oldest));
                assert_eq!(args.algorithm, Some(HashAlgorithm::Blake3));
                assert_eq!(args.confirm_mode, Some(ConfirmMode::WholeScan));
                assert_eq!(args.workers, Some(2));
                assert!(args.trash);
            }
            Commands::Config(_) => panic!("Expected Scan command"),
        }
    }

    #[test]
    fn test_cli_quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["dedupinator", "-v", "-q", "scan", "/path"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_auto_delete_conflicts_with_dry_run() {
        let result =
            Cli::try_parse_from(["dedupinator", "scan", "/path", "--auto-delete", "--dry-run"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_csv_flags_conflict() {
        let result = Cli::try_parse_from([
            "dedupinator",
            "scan",
            "/path",
            "--csv",
            "out.csv",
            "--export-csv",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_missing_path() {
        assert!(Cli::try_parse_from(["dedupinator", "scan"]).is_err());
    }

    #[test]
    fn test_cli_config_requires_action() {
        assert!(Cli::try_parse_from(["dedupinator", "config"]).is_err());
        let cli = Cli::try_parse_from(["dedupinator", "config", "--init", "--force"]).unwrap();
        match cli.command {
            Commands::Config(args) => assert!(args.init && args.force && !args.show),
            Commands::Scan(_) => panic!("Expected Config command"),
        }
    }

    #[test]
    fn test_cli_version_flag() {
        assert!(Cli::try_parse_from(["dedupinator", "--version"]).is_err());
    }
}
