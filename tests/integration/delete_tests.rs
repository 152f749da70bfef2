use clap::Parser;
use dedupinator::actions::{
    ConfirmMode, DeleteMode, Deleter, DeletionError, PermanentRemoval, RemovalBackend,
};
use dedupinator::cli::Cli;
use dedupinator::duplicates::{DuplicateFinder, FinderConfig, RetentionRule};
use dedupinator::error::ExitCode;
use dedupinator::report::{FinalReport, Verdict};
use filetime::{set_file_mtime, FileTime};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::tempdir;

fn write_with_mtime(dir: &Path, name: &str, content: &[u8], secs: i64) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    set_file_mtime(&path, FileTime::from_unix_time(secs, 0)).unwrap();
    path
}

fn finder(rule: RetentionRule) -> DuplicateFinder {
    DuplicateFinder::new(FinderConfig::default().with_workers(2).with_retention(rule))
}

/// Refuses one path with a permission error, removes the rest.
struct DenyOne(PathBuf);

impl RemovalBackend for DenyOne {
    fn remove(&self, path: &Path) -> Result<(), DeletionError> {
        if path == self.0 {
            Err(DeletionError::PermissionDenied(path.to_path_buf()))
        } else {
            PermanentRemoval.remove(path)
        }
    }

    fn name(&self) -> &'static str {
        "deny-one"
    }
}

#[test]
fn test_keep_newest_by_default() {
    let dir = tempdir().unwrap();
    let old = write_with_mtime(dir.path(), "old.txt", b"same", 1_000);
    let new = write_with_mtime(dir.path(), "new.txt", b"same", 2_000);

    let report = finder(RetentionRule::Newest).find_duplicates(dir.path()).unwrap();

    assert_eq!(report.sets[0].keep.path, new);
    assert_eq!(report.sets[0].remove[0].path, old);
}

#[test]
fn test_keep_oldest() {
    let dir = tempdir().unwrap();
    let old = write_with_mtime(dir.path(), "old.txt", b"same", 1_000);
    write_with_mtime(dir.path(), "new.txt", b"same", 2_000);

    let report = finder(RetentionRule::Oldest).find_duplicates(dir.path()).unwrap();

    assert_eq!(report.sets[0].keep.path, old);
}

#[test]
fn test_equal_mtimes_keep_smallest_path() {
    let dir = tempdir().unwrap();
    write_with_mtime(dir.path(), "b.txt", b"tie", 5_000);
    let a = write_with_mtime(dir.path(), "a.txt", b"tie", 5_000);
    write_with_mtime(dir.path(), "c.txt", b"tie", 5_000);

    let first = finder(RetentionRule::Newest).find_duplicates(dir.path()).unwrap();
    let second = finder(RetentionRule::Newest).find_duplicates(dir.path()).unwrap();

    assert_eq!(first.sets[0].keep.path, a);
    assert_eq!(first.sets[0], second.sets[0]);
}

#[test]
fn test_rescan_after_deletion_finds_nothing() {
    let dir = tempdir().unwrap();
    write_with_mtime(dir.path(), "a", b"dup one", 10);
    write_with_mtime(dir.path(), "b", b"dup one", 20);
    write_with_mtime(dir.path(), "c", b"dup one", 30);
    write_with_mtime(dir.path(), "d", b"dup two!", 10);
    write_with_mtime(dir.path(), "e", b"dup two!", 20);

    let report = finder(RetentionRule::Newest).find_duplicates(dir.path()).unwrap();
    assert_eq!(report.sets.len(), 2);

    let summary = Deleter::new(DeleteMode::Permanent.backend())
        .with_statistics(Arc::clone(&report.statistics))
        .delete_all(&report.sets, ConfirmMode::PerGroup, true);

    assert_eq!(summary.deleted(), 3);
    assert_eq!(summary.bytes_reclaimed(), 7 * 2 + 8);
    assert_eq!(report.snapshot().files_deleted, 3);
    assert_eq!(report.snapshot().bytes_reclaimed, 22);
    assert_eq!(
        FinalReport::new(&report, Some(&summary)).verdict,
        Verdict::Resolved
    );

    let rescan = finder(RetentionRule::Newest).find_duplicates(dir.path()).unwrap();
    assert!(rescan.sets.is_empty());
    assert_eq!(
        FinalReport::new(&rescan, None).exit_code(),
        ExitCode::NoDuplicates
    );
}

#[test]
fn test_failed_removal_is_not_counted_as_reclaimed() {
    let dir = tempdir().unwrap();
    write_with_mtime(dir.path(), "keep", b"0123456789", 300);
    let stuck = write_with_mtime(dir.path(), "stuck", b"0123456789", 200);
    let gone = write_with_mtime(dir.path(), "gone", b"0123456789", 100);

    let report = finder(RetentionRule::Newest).find_duplicates(dir.path()).unwrap();
    let summary = Deleter::new(Box::new(DenyOne(stuck.clone())))
        .with_statistics(Arc::clone(&report.statistics))
        .delete_all(&report.sets, ConfirmMode::WholeScan, true);

    assert!(stuck.exists());
    assert!(!gone.exists());
    assert_eq!(summary.deleted(), 1);
    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.bytes_reclaimed(), 10);

    let final_report = FinalReport::new(&report, Some(&summary));
    assert_eq!(final_report.verdict, Verdict::PartiallyResolved);
    assert_eq!(final_report.exit_code(), ExitCode::PartialSuccess);
    assert_eq!(final_report.statistics.deletion_failures, 1);
    assert_eq!(final_report.deletion_failures[0].0, stuck);
}

#[test]
fn test_run_app_auto_delete_removes_copies() {
    let dir = tempdir().unwrap();
    let tree = dir.path().join("tree");
    fs::create_dir(&tree).unwrap();
    let config = dir.path().join("config.toml");
    fs::write(&config, "").unwrap();
    let keep = write_with_mtime(&tree, "keep.bin", b"payload", 2_000);
    let copy = write_with_mtime(&tree, "copy.bin", b"payload", 1_000);

    let cli = Cli::try_parse_from([
        "dedupinator",
        "-q",
        "--config",
        config.to_str().unwrap(),
        "scan",
        tree.to_str().unwrap(),
        "--auto-delete",
        "--no-progress",
    ])
    .unwrap();
    let code = dedupinator::run_app(cli).unwrap();

    assert_eq!(code, ExitCode::Success);
    assert!(keep.exists());
    assert!(!copy.exists());
}

#[test]
fn test_run_app_dry_run_keeps_everything() {
    let dir = tempdir().unwrap();
    let tree = dir.path().join("tree");
    fs::create_dir(&tree).unwrap();
    let config = dir.path().join("config.toml");
    fs::write(&config, "auto_delete = true\n").unwrap();
    write_with_mtime(&tree, "a", b"payload", 2_000);
    write_with_mtime(&tree, "b", b"payload", 1_000);

    let cli = Cli::try_parse_from([
        "dedupinator",
        "-q",
        "--config",
        config.to_str().unwrap(),
        "scan",
        tree.to_str().unwrap(),
        "--dry-run",
        "--no-progress",
    ])
    .unwrap();
    let code = dedupinator::run_app(cli).unwrap();

    assert_eq!(code, ExitCode::Success);
    assert_eq!(fs::read_dir(&tree).unwrap().count(), 2);
}
