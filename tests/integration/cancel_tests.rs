use dedupinator::actions::{ConfirmMode, DeleteMode, Deleter};
use dedupinator::duplicates::{DuplicateFinder, FinderConfig, ScanStatus};
use dedupinator::scanner::{SizeExtensionFilter, WalkBatch, Walker};
use dedupinator::signal::CancellationToken;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_cancel_mid_scan_counts_exactly_processed_files() {
    let dir = tempdir().unwrap();
    for i in 0..10 {
        fs::write(dir.path().join(format!("file{i:02}")), b"identical").unwrap();
    }

    let batches: Vec<WalkBatch> = Walker::new(dir.path(), SizeExtensionFilter::default())
        .batches(2)
        .collect();
    assert_eq!(batches.len(), 5);

    let token = CancellationToken::new();
    let finder = DuplicateFinder::new(
        FinderConfig::default()
            .with_workers(1)
            .with_cancellation(token.clone()),
    );

    // Cancel while the third batch is being produced.
    let trigger = token.clone();
    let source = batches.into_iter().enumerate().map(move |(i, batch)| {
        if i == 2 {
            trigger.cancel();
        }
        batch
    });
    let report = finder.start_scan_batches(source).unwrap().wait().unwrap();

    assert_eq!(report.status, ScanStatus::Cancelled);
    assert_eq!(report.snapshot().files_processed, 4);
    assert_eq!(report.snapshot().files_hashed, 0);
    assert!(report.sets.is_empty());

    // Nothing resolved means nothing to delete.
    let summary = Deleter::new(DeleteMode::Permanent.backend()).delete_all(
        &report.sets,
        ConfirmMode::PerGroup,
        true,
    );
    assert!(summary.outcomes.is_empty());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 10);
}

#[test]
fn test_handle_cancel_reports_cancelled() {
    let dir = tempdir().unwrap();
    for i in 0..50 {
        fs::write(dir.path().join(format!("f{i}")), vec![b'q'; 64]).unwrap();
    }

    let token = CancellationToken::new();
    token.cancel();
    let handle = DuplicateFinder::new(
        FinderConfig::default()
            .with_workers(2)
            .with_cancellation(token),
    )
    .start_scan(dir.path())
    .unwrap();

    assert!(handle.is_cancelled());
    let report = handle.wait().unwrap();
    assert_eq!(report.status, ScanStatus::Cancelled);
    assert!(report.sets.is_empty());
    assert!(!report.is_complete());
}

#[test]
fn test_cancel_via_handle_after_start() {
    let dir = tempdir().unwrap();
    for i in 0..20 {
        fs::write(dir.path().join(format!("f{i}")), b"same bytes").unwrap();
    }

    let handle = DuplicateFinder::new(FinderConfig::default().with_workers(1))
        .start_scan(dir.path())
        .unwrap();
    handle.cancel();
    let report = handle.wait().unwrap();

    // The scan may have finished before the request arrived.
    match report.status {
        ScanStatus::Cancelled => assert!(report.sets.is_empty()),
        ScanStatus::Completed => assert_eq!(report.sets.len(), 1),
    }
}
