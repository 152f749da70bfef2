//! Dedupinator - exact duplicate file finder
//!
//! Walks a directory tree, groups files by size, confirms duplicates by
//! content digest, and keeps one copy of each duplicate set. The engine
//! (`scanner`, `duplicates`, `actions`) runs scans on background threads and
//! reports through events; the remaining modules make up the command-line
//! front end.

pub mod actions;
pub mod app;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod report;
pub mod scanner;
pub mod signal;

pub use app::run_app;
