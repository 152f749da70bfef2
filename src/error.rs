//! Configuration errors, exit codes and structured error output.

use std::path::PathBuf;

use serde::Serialize;

/// Invalid settings detected before any filesystem work starts.
///
/// This is the only error class that aborts a scan.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// `min_size` is larger than `max_size`.
    #[error("Invalid size bounds: minimum {min} bytes exceeds maximum {max} bytes")]
    InvalidSizeRange {
        /// Lower bound in bytes
        min: u64,
        /// Upper bound in bytes
        max: u64,
    },

    /// A size could not be parsed or overflows.
    #[error("Invalid size '{0}'")]
    InvalidSize(String),

    /// Batch size must be at least one.
    #[error("Batch size must be greater than zero")]
    ZeroBatchSize,

    /// Chunk size must be at least one byte.
    #[error("Chunk size must be greater than zero")]
    ZeroChunkSize,

    /// Worker count must be at least one.
    #[error("Worker count must be greater than zero")]
    ZeroWorkers,

    /// A skip extension is empty or only a dot.
    #[error("Skip extensions must not be blank")]
    BlankExtension,

    /// The scan root does not exist.
    #[error("Scan root does not exist: {0}")]
    RootNotFound(PathBuf),

    /// The scan root is not a directory.
    #[error("Scan root is not a directory: {0}")]
    RootNotDirectory(PathBuf),

    /// The configuration sources could not be loaded or merged.
    #[error("Failed to load configuration: {0}")]
    Load(String),
}

/// Exit codes for the dedupinator binary.
///
/// - 0: Duplicates found (and resolved, if deletion ran)
/// - 1: General error (unexpected failure)
/// - 2: No duplicates found
/// - 3: Duplicates found but some deletions failed
/// - 4: Invalid configuration
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: duplicates found or resolved.
    Success = 0,
    /// General error: An unexpected error occurred.
    GeneralError = 1,
    /// No duplicates: scan completed but nothing matched.
    NoDuplicates = 2,
    /// Partial success: some deletions failed.
    PartialSuccess = 3,
    /// Invalid configuration: nothing was scanned.
    InvalidConfig = 4,
    /// Interrupted: scan was cancelled.
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "DD000",
            Self::GeneralError => "DD001",
            Self::NoDuplicates => "DD002",
            Self::PartialSuccess => "DD003",
            Self::InvalidConfig => "DD004",
            Self::Interrupted => "DD130",
        }
    }

    /// Pick the exit code for a fatal application error.
    #[must_use]
    pub fn for_error(err: &anyhow::Error) -> Self {
        let is_config = err.chain().any(|cause| {
            cause.downcast_ref::<ConfigurationError>().is_some()
                || cause
                    .downcast_ref::<crate::duplicates::FinderError>()
                    .is_some_and(|e| matches!(e, crate::duplicates::FinderError::Configuration(_)))
        });

        if is_config {
            Self::InvalidConfig
        } else {
            Self::GeneralError
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "DD001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message including causes
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
