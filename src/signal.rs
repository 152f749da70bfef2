//! Cancellation and Ctrl+C handling.
//!
//! A [`CancellationToken`] is a cheaply clonable shared flag. The engine
//! checks it at every traversal step, before every hash and before every
//! removal. Work already in flight is allowed to finish.
//!
//! The binary wires Ctrl+C to the same token that [`crate::duplicates::ScanHandle::cancel`]
//! raises, so pressing Ctrl+C and calling `cancel()` are indistinguishable.
//!
//! ```rust,no_run
//! use dedupinator::signal::install_handler;
//!
//! let token = install_handler().expect("signal handler");
//! if token.is_cancelled() {
//!     return;
//! }
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Exit code for SIGINT interruption (128 + 2).
pub const EXIT_CODE_INTERRUPTED: i32 = 130;

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Lower the flag so the token can drive another scan.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Error type for signal handler installation.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Failed to install the Ctrl+C handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

static GLOBAL_TOKEN: OnceLock<CancellationToken> = OnceLock::new();

/// Install a Ctrl+C handler that cancels the returned token.
///
/// The process-wide hook is registered once; later calls reset and return
/// the same token. If another hook already owns the signal (common when
/// tests run in one process) an unhooked token is returned, which still
/// cancels through [`CancellationToken::cancel`].
///
/// # Errors
///
/// Currently always succeeds; the `Result` leaves room for platforms where
/// registration failure should be reported.
pub fn install_handler() -> Result<CancellationToken, SignalError> {
    if let Some(token) = GLOBAL_TOKEN.get() {
        token.reset();
        return Ok(token.clone());
    }

    let token = CancellationToken::new();
    let hooked = token.clone();

    match ctrlc::set_handler(move || {
        hooked.cancel();

        let _ = writeln!(std::io::stderr(), "\nInterrupted. Finishing in-flight work...");
        let _ = std::io::stderr().flush();

        log::info!("Cancellation requested by signal");
    }) {
        Ok(()) => {
            let _ = GLOBAL_TOKEN.set(token.clone());
            Ok(token)
        }
        Err(e) => {
            if let Some(existing) = GLOBAL_TOKEN.get() {
                existing.reset();
                Ok(existing.clone())
            } else {
                log::debug!("Ctrl+C handler unavailable ({e}), using unhooked token");
                let _ = GLOBAL_TOKEN.set(token.clone());
                Ok(token)
            }
        }
    }
}
