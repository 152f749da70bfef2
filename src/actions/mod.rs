//! File actions module.
//!
//! This module provides functionality for:
//! - Deleting the marked copies of resolved duplicate sets
//! - Permanent removal (default) or moving to the platform trash
//! - Confirmation per set, per scan, or not at all (auto-delete)
//!
//! Detection never deletes anything by itself; callers run a [`Deleter`]
//! explicitly once they have decided, which is what makes dry runs and
//! confirm-before-delete possible without scanning again.

pub mod confirm;
pub mod delete;

pub use confirm::{AlwaysDecline, AutoApprove, ConfirmMode, ConfirmPrompt, LinePrompt, StdinPrompt};
pub use delete::{
    DeleteMode, Deleter, DeletionError, DeletionOutcome, DeletionSummary, PermanentRemoval,
    RemovalBackend, TrashRemoval,
};
