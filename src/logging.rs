//! Logging setup for the dedupinator binary.
//!
//! The library logs through the `log` facade only; this module installs the
//! `env_logger` backend. Log levels are determined by (in priority order):
//!
//! 1. `RUST_LOG` environment variable (if set)
//! 2. CLI flags: `--quiet` (error only) or `--verbose` (debug/trace)
//! 3. Default: info level
//!
//! Output goes to stderr, or to a file with `--log-file`.
//!
//! ```rust,no_run
//! use dedupinator::logging::{init_logging, LogOptions};
//!
//! init_logging(&LogOptions { verbose: 1, ..Default::default() }).unwrap();
//! log::debug!("visible at -v");
//! ```

use std::env;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use env_logger::{Builder, Target};
use log::LevelFilter;

/// Logging settings taken from the command line.
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Verbosity count (0=info, 1=debug, 2+=trace)
    pub verbose: u8,
    /// Errors only
    pub quiet: bool,
    /// Append log records to this file instead of stderr
    pub log_file: Option<PathBuf>,
}

/// Errors raised while installing the logger.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// The log file could not be opened.
    #[error("Cannot open log file {path}: {source}")]
    File {
        /// Requested log file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A logger is already installed.
    #[error("Logger already initialized: {0}")]
    AlreadyInitialized(#[from] log::SetLoggerError),
}

/// Install the process-wide logger.
///
/// # Errors
///
/// Fails if the log file cannot be opened or a logger is already set.
pub fn init_logging(options: &LogOptions) -> Result<(), LoggingError> {
    let use_env = env::var("RUST_LOG").is_ok();
    let mut builder = Builder::new();

    if use_env {
        builder.parse_default_env();
    } else {
        builder.filter_level(determine_level(options.verbose, options.quiet));
    }

    let to_file = if let Some(path) = &options.log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| LoggingError::File {
                path: path.clone(),
                source,
            })?;
        builder.target(Target::Pipe(Box::new(file)));
        builder.write_style(env_logger::WriteStyle::Never);
        true
    } else {
        false
    };

    configure_format(&mut builder, options.verbose, to_file);
    builder.try_init()?;

    log::debug!(
        "Logging initialized at level {} ({})",
        current_level_name(),
        if use_env { "RUST_LOG" } else { "flags" }
    );
    Ok(())
}

/// Determine the log level from CLI flags. `quiet` wins over `verbose`.
fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }
}

/// Timestamps go to files and to verbose runs; module paths only when
/// verbose.
fn configure_format(builder: &mut Builder, verbose: u8, to_file: bool) {
    builder.format(move |buf, record| {
        let level = record.level();
        let style = buf.default_level_style(level);

        if to_file || verbose >= 1 {
            let timestamp = buf.timestamp_seconds();
            if verbose >= 1 {
                writeln!(
                    buf,
                    "{timestamp} {style}{level:<5}{style:#} [{}] {}",
                    record.module_path().unwrap_or("unknown"),
                    record.args()
                )
            } else {
                writeln!(buf, "{timestamp} {style}{level:<5}{style:#} {}", record.args())
            }
        } else {
            writeln!(buf, "{style}{level:<5}{style:#} {}", record.args())
        }
    });
}

/// Name of the current maximum log level.
pub fn current_level_name() -> &'static str {
    match log::max_level() {
        LevelFilter::Off => "off",
        LevelFilter::Error => "error",
        LevelFilter::Warn => "warn",
        LevelFilter::Info => "info",
        LevelFilter::Debug => "debug",
        LevelFilter::Trace => "trace",
    }
}
