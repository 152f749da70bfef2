//! Live status line rendered with indicatif.
//!
//! [`ScanProgress`] turns the engine's rate-limited [`ProgressEvent`]s into a
//! single spinner line: processed, skipped, hashed, duplicate groups, bytes
//! processed, and the current file. The engine already throttles events, so
//! every event is drawn.
//!
//! # Plain Mode
//!
//! Plain mode drops the spinner animation and Unicode glyphs. Quiet mode
//! draws nothing.

use std::time::Duration;

use bytesize::ByteSize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::duplicates::{ProgressEvent, ScanPhase};

const PATH_DISPLAY_LEN: usize = 40;

/// Spinner for a running scan.
#[derive(Debug)]
pub struct ScanProgress {
    bar: Option<ProgressBar>,
}

impl ScanProgress {
    /// Create a spinner on stderr. `quiet` disables drawing entirely.
    ///
    /// # Examples
    ///
    /// ```
    /// use dedupinator::progress::ScanProgress;
    ///
    /// let progress = ScanProgress::new(true, false);
    /// progress.finish();
    /// ```
    #[must_use]
    pub fn new(quiet: bool, plain: bool) -> Self {
        if quiet {
            return Self { bar: None };
        }

        let bar = ProgressBar::new_spinner();
        bar.set_style(Self::style(plain));
        bar.set_message("Scanning");
        let tick_rate = if plain { 500 } else { 100 };
        bar.enable_steady_tick(Duration::from_millis(tick_rate));
        Self { bar: Some(bar) }
    }

    /// Spinner that draws nowhere; used by tests and non-terminal output.
    #[must_use]
    pub fn hidden() -> Self {
        let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::hidden());
        Self { bar: Some(bar) }
    }

    fn style(plain: bool) -> ProgressStyle {
        if plain {
            ProgressStyle::with_template("[{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
        } else {
            ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        }
    }

    /// Draw one progress event.
    pub fn update(&self, event: &ProgressEvent) {
        if let Some(bar) = &self.bar {
            bar.set_message(status_line(event));
        }
    }

    /// Print a warning above the spinner.
    pub fn warn(&self, message: &str) {
        match &self.bar {
            Some(bar) if !bar.is_hidden() => bar.println(format!("warning: {message}")),
            _ => {}
        }
    }

    /// Current status text, if any.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        self.bar.as_ref().map(ProgressBar::message)
    }

    /// Remove the spinner.
    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

/// Status text for one event.
#[must_use]
pub fn status_line(event: &ProgressEvent) -> String {
    let phase = match event.phase {
        ScanPhase::Traversing => "Scanning",
        ScanPhase::Hashing => "Hashing",
        ScanPhase::Finished => "Done",
    };
    let mut line = format!(
        "{phase}: {} processed, {} skipped, {} hashed, {} groups, {}",
        event.processed,
        event.skipped,
        event.hashed,
        event.duplicate_groups,
        ByteSize(event.bytes_processed)
    );
    if let Some(path) = &event.current_path {
        line.push_str(" | ");
        line.push_str(&truncate_path(&path.to_string_lossy(), PATH_DISPLAY_LEN));
    }
    line
}

/// Shorten a path to at most `max_len` characters, keeping the file name.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let name_len = file_name.chars().count();

    if name_len + 4 > max_len {
        let tail: String = file_name.chars().skip(name_len + 3 - max_len).collect();
        return format!("...{tail}");
    }

    format!(".../{file_name}")
}
