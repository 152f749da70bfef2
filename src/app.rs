//! Command-line front end: loads configuration, drives a scan, runs the
//! optional deletion pass and renders the result.

use std::io::{self, IsTerminal};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::actions::{Deleter, DeletionSummary, StdinPrompt};
use crate::cli::{Cli, Commands, ConfigArgs, ScanArgs};
use crate::config::Config;
use crate::duplicates::{DuplicateFinder, FinderError, ScanEvent, ScanHandle, ScanReport};
use crate::error::ExitCode;
use crate::logging::{init_logging, LogOptions, LoggingError};
use crate::output::{default_csv_path, CsvOutput, JsonOutput, OutputFormat};
use crate::progress::ScanProgress;
use crate::report::{write_sets, FinalReport};
use crate::signal::{self, CancellationToken};

/// Run the command described by `cli` and return the process exit code.
///
/// # Errors
///
/// Returns an error for invalid configuration, an unusable scan root, or
/// failures writing output. Problems with individual files are reported in
/// the result instead.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    if cli.no_color || !io::stdout().is_terminal() {
        yansi::disable();
    }

    let log_options = LogOptions {
        verbose: cli.verbose,
        quiet: cli.quiet,
        log_file: cli.log_file.clone(),
    };
    match init_logging(&log_options) {
        Ok(()) | Err(LoggingError::AlreadyInitialized(_)) => {}
        Err(e) => return Err(e).context("Failed to initialize logging"),
    }

    match &cli.command {
        Commands::Config(args) => run_config(&cli, args),
        Commands::Scan(args) => run_scan(&cli, args),
    }
}

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<ExitCode> {
    if args.init {
        let path = Config::write_default(cli.config.as_deref(), args.force)?;
        println!("Wrote default configuration to {}", path.display());
    }
    if args.show {
        let config = Config::load(cli.config.as_deref())?;
        print!("{}", config.to_toml()?);
    }
    Ok(ExitCode::Success)
}

fn run_scan(cli: &Cli, args: &ScanArgs) -> Result<ExitCode> {
    let mut config = Config::load(cli.config.as_deref())?;
    config.apply_scan_args(args)?;
    let finder_config = config.to_finder_config()?;
    log::debug!("Effective configuration: {:?}", finder_config);

    let cancel = match signal::install_handler() {
        Ok(token) => token,
        Err(e) => {
            log::warn!("Ctrl+C handling unavailable: {}", e);
            CancellationToken::new()
        }
    };

    let finder = DuplicateFinder::new(finder_config.with_cancellation(cancel.clone()));
    let handle = finder.start_scan(&args.path)?;

    let interactive_stderr = io::stderr().is_terminal();
    let progress = ScanProgress::new(
        cli.quiet || args.no_progress || !interactive_stderr,
        cli.no_color,
    );
    // Warnings are already logged; echo them only when logs go elsewhere.
    let echo_warnings = cli.log_file.is_some() && !cli.quiet;
    let scan = collect_report(&handle, &progress, echo_warnings)?;

    if scan.is_complete() {
        export_csv(cli, args, &config, &scan)?;
    }

    let text = args.output == OutputFormat::Text && !cli.quiet;
    if text {
        write_sets(&mut io::stdout().lock(), &scan.sets)?;
    }

    let deletion = run_deletion(args, &config, &scan, cancel);

    let report = FinalReport::new(&scan, deletion.as_ref());
    match args.output {
        OutputFormat::Text if text => report.write_statistics(&mut io::stdout().lock())?,
        OutputFormat::Text => {}
        OutputFormat::Json => JsonOutput::new(&report)
            .write_to(io::stdout().lock(), true)
            .context("Failed to write JSON report")?,
    }

    Ok(report.exit_code())
}

/// Consume events until the scan ends.
fn collect_report(
    handle: &ScanHandle,
    progress: &ScanProgress,
    echo_warnings: bool,
) -> Result<ScanReport, FinderError> {
    let mut report = None;
    for event in handle.events() {
        match event {
            ScanEvent::Progress(p) => progress.update(&p),
            ScanEvent::Warning(message) => {
                if echo_warnings {
                    progress.warn(&message);
                }
            }
            ScanEvent::Completed(r) => report = Some(*r),
        }
    }
    progress.finish();
    report.ok_or(FinderError::ResultLost)
}

fn export_csv(cli: &Cli, args: &ScanArgs, config: &Config, scan: &ScanReport) -> Result<()> {
    let path = match (&args.csv, args.export_csv) {
        (Some(path), _) => path.clone(),
        (None, true) => default_csv_path(config.csv_dir.as_deref())?,
        (None, false) => return Ok(()),
    };

    CsvOutput::new(&scan.sets)
        .write_file(&path)
        .with_context(|| format!("Failed to write CSV export {}", path.display()))?;
    if !cli.quiet {
        eprintln!("CSV export written to {}", path.display());
    }
    Ok(())
}

/// Delete per configuration. Returns `None` when no deletion pass runs.
fn run_deletion(
    args: &ScanArgs,
    config: &Config,
    scan: &ScanReport,
    cancel: CancellationToken,
) -> Option<DeletionSummary> {
    if args.dry_run || !scan.is_complete() || scan.sets.is_empty() {
        return None;
    }

    let mut deleter = Deleter::new(config.delete_mode.backend())
        .with_statistics(Arc::clone(&scan.statistics))
        .with_cancellation(cancel);

    if !config.auto_delete {
        if !io::stdin().is_terminal() {
            log::info!("Not deleting: stdin is not a terminal and auto-delete is off");
            return None;
        }
        deleter = deleter.with_prompt(Box::new(StdinPrompt::stdin()));
    }

    Some(deleter.delete_all(&scan.sets, config.confirm_mode, config.auto_delete))
}
