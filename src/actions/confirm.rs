//! Confirmation prompts for deletion.
//!
//! A [`ConfirmPrompt`] approves deletion either one duplicate set at a time
//! or once for a whole scan; [`ConfirmMode`] picks which. Auto-delete skips
//! prompting entirely.

use std::io::{BufRead, Write};
use std::sync::Mutex;

use bytesize::ByteSize;
use serde::{Deserialize, Serialize};

use crate::duplicates::DuplicateSet;

/// Granularity of deletion approval.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmMode {
    /// Ask once per duplicate set
    #[default]
    PerGroup,
    /// Ask once for every set found by the scan
    WholeScan,
}

/// Source of yes/no answers for deletion.
pub trait ConfirmPrompt: Send + Sync {
    /// Approve removing the marked copies of one set.
    fn confirm_set(&self, set: &DuplicateSet) -> bool;

    /// Approve removing the marked copies of every set.
    fn confirm_scan(&self, sets: &[DuplicateSet]) -> bool;
}

/// Approves everything. Used for auto-delete.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

impl ConfirmPrompt for AutoApprove {
    fn confirm_set(&self, _set: &DuplicateSet) -> bool {
        true
    }

    fn confirm_scan(&self, _sets: &[DuplicateSet]) -> bool {
        true
    }
}

/// Declines everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysDecline;

impl ConfirmPrompt for AlwaysDecline {
    fn confirm_set(&self, _set: &DuplicateSet) -> bool {
        false
    }

    fn confirm_scan(&self, _sets: &[DuplicateSet]) -> bool {
        false
    }
}

/// Line-oriented prompt: writes a question, reads `y`/`yes` to approve.
///
/// End of input or a read error counts as "no".
pub struct LinePrompt<R, W> {
    io: Mutex<(R, W)>,
}

impl<R: BufRead + Send, W: Write + Send> LinePrompt<R, W> {
    /// Prompt over arbitrary streams.
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            io: Mutex::new((reader, writer)),
        }
    }

    fn ask(&self, describe: impl FnOnce(&mut W) -> std::io::Result<()>) -> bool {
        let Ok(mut guard) = self.io.lock() else {
            return false;
        };
        let (reader, writer) = &mut *guard;

        if describe(writer).and_then(|()| writer.flush()).is_err() {
            return false;
        }

        let mut answer = String::new();
        match reader.read_line(&mut answer) {
            Ok(0) | Err(_) => false,
            Ok(_) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
        }
    }
}

/// Prompt on stdin/stderr.
pub type StdinPrompt = LinePrompt<std::io::BufReader<std::io::Stdin>, std::io::Stderr>;

impl StdinPrompt {
    /// Prompt on the process terminal.
    #[must_use]
    pub fn stdin() -> Self {
        Self::new(std::io::BufReader::new(std::io::stdin()), std::io::stderr())
    }
}

fn describe_set<W: Write>(w: &mut W, set: &DuplicateSet) -> std::io::Result<()> {
    writeln!(w, "Duplicate set ({} each):", ByteSize(set.size))?;
    writeln!(w, "  KEEP       {}", set.keep.path.display())?;
    for file in &set.remove {
        writeln!(w, "  DUPLICATE  {}", file.path.display())?;
    }
    write!(
        w,
        "Delete {} duplicate(s), freeing {}? [y/N] ",
        set.remove.len(),
        ByteSize(set.reclaimable())
    )
}

impl<R: BufRead + Send, W: Write + Send> ConfirmPrompt for LinePrompt<R, W> {
    fn confirm_set(&self, set: &DuplicateSet) -> bool {
        self.ask(|w| describe_set(w, set))
    }

    fn confirm_scan(&self, sets: &[DuplicateSet]) -> bool {
        let files: usize = sets.iter().map(|s| s.remove.len()).sum();
        let bytes: u64 = sets.iter().map(DuplicateSet::reclaimable).sum();
        self.ask(|w| {
            write!(
                w,
                "Delete {} duplicate(s) across {} set(s), freeing {}? [y/N] ",
                files,
                sets.len(),
                ByteSize(bytes)
            )
        })
    }
}
