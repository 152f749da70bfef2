use dedupinator::duplicates::{DuplicateFinder, FinderConfig, ScanEvent, ScanPhase, ScanStatus};
use dedupinator::scanner::{FileDescriptor, HashAlgorithm, SizeExtensionFilter, WalkBatch};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tempfile::tempdir;

fn write(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

fn finder() -> DuplicateFinder {
    DuplicateFinder::new(FinderConfig::default().with_workers(2))
}

fn finder_with_filter(filter: SizeExtensionFilter) -> DuplicateFinder {
    DuplicateFinder::new(FinderConfig::default().with_workers(2).with_filter(filter))
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let report = finder().find_duplicates(dir.path()).unwrap();

    assert_eq!(report.status, ScanStatus::Completed);
    assert!(report.sets.is_empty());
    assert_eq!(report.snapshot().files_seen, 0);
    assert_eq!(report.snapshot().duplicate_sets, 0);
}

#[test]
fn test_scenario_same_size_one_different_content() {
    let dir = tempdir().unwrap();
    let a = write(dir.path(), "a", b"XXXXXXXXXX");
    let b = write(dir.path(), "b", b"XXXXXXXXXX");
    let c = write(dir.path(), "c", b"YYYYYYYYYY");

    let report = finder().find_duplicates(dir.path()).unwrap();

    assert_eq!(report.sets.len(), 1);
    let members: Vec<PathBuf> = report.sets[0].members().map(|f| f.path.clone()).collect();
    assert_eq!(members.len(), 2);
    assert!(members.contains(&a));
    assert!(members.contains(&b));
    assert!(!members.contains(&c));
    assert!(c.exists());

    let stats = report.snapshot();
    assert_eq!(stats.files_processed, 3);
    assert_eq!(stats.files_hashed, 3);
    assert_eq!(stats.duplicate_sets, 1);
}

#[test]
fn test_size_is_authoritative_prefilter() {
    let dir = tempdir().unwrap();
    let a = write(dir.path(), "a", b"same");
    let b = write(dir.path(), "b", b"same");

    // Same bytes on disk, but the traversal snapshot disagrees on size.
    let batch = WalkBatch {
        files: vec![
            FileDescriptor::new(a, 4, SystemTime::UNIX_EPOCH),
            FileDescriptor::new(b, 5, SystemTime::UNIX_EPOCH),
        ],
        errors: Vec::new(),
        filtered: 0,
    };

    let report = finder()
        .start_scan_batches(vec![batch])
        .unwrap()
        .wait()
        .unwrap();

    assert!(report.sets.is_empty());
    assert_eq!(report.snapshot().files_hashed, 0);
}

#[test]
fn test_identical_content_across_directories() {
    let dir = tempdir().unwrap();
    write(dir.path(), "photos/2020/img.jpg", b"jpeg bytes");
    write(dir.path(), "backup/img copy.jpg", b"jpeg bytes");
    write(dir.path(), "backup/deep/er/img.jpg", b"jpeg bytes");
    write(dir.path(), "other.jpg", b"JPEG BYTES");

    let report = finder().find_duplicates(dir.path()).unwrap();

    assert_eq!(report.sets.len(), 1);
    assert_eq!(report.sets[0].len(), 3);
    assert_eq!(report.sets[0].remove.len(), 2);
    assert_eq!(report.reclaimable(), 20);
}

#[test]
fn test_multiple_sets_in_discovery_order() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a1", b"first set");
    write(dir.path(), "a2", b"first set");
    write(dir.path(), "b1", b"second");
    write(dir.path(), "b2", b"second");

    let report = finder().find_duplicates(dir.path()).unwrap();

    assert_eq!(report.sets.len(), 2);
    // Sorted traversal sees a1 (9 bytes) before b1 (6 bytes).
    assert_eq!(report.sets[0].size, 9);
    assert_eq!(report.sets[1].size, 6);
}

#[test]
fn test_size_filter_boundaries_are_inclusive() {
    let dir = tempdir().unwrap();
    for (name, len) in [("under", 9), ("min", 10), ("max", 20), ("over", 21)] {
        write(dir.path(), &format!("{name}_1"), &vec![b'z'; len]);
        write(dir.path(), &format!("{name}_2"), &vec![b'z'; len]);
    }

    let filter = SizeExtensionFilter::new(10, 20, Vec::<String>::new());
    let report = finder_with_filter(filter).find_duplicates(dir.path()).unwrap();

    let mut sizes: Vec<u64> = report.sets.iter().map(|s| s.size).collect();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![10, 20]);
    assert_eq!(report.snapshot().files_skipped, 4);
}

#[test]
fn test_extension_filter_is_case_insensitive() {
    let dir = tempdir().unwrap();
    write(dir.path(), "server.LOG", b"log line");
    write(dir.path(), "client.log", b"log line");
    write(dir.path(), "notes.txt", b"log line");

    let filter = SizeExtensionFilter::new(1, u64::MAX, [".log"]);
    let report = finder_with_filter(filter).find_duplicates(dir.path()).unwrap();

    assert!(report.sets.is_empty());
    assert_eq!(report.snapshot().files_skipped, 2);
    assert_eq!(report.snapshot().files_processed, 1);
}

#[test]
fn test_empty_files_are_not_duplicates_by_default() {
    let dir = tempdir().unwrap();
    write(dir.path(), "empty1", b"");
    write(dir.path(), "empty2", b"");

    let report = finder().find_duplicates(dir.path()).unwrap();

    assert!(report.sets.is_empty());
    assert_eq!(report.snapshot().files_skipped, 2);
}

#[test]
fn test_blake3_finds_the_same_sets() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a", b"payload");
    write(dir.path(), "b", b"payload");
    write(dir.path(), "c", b"payloaX");

    let sha = finder().find_duplicates(dir.path()).unwrap();
    let blake = DuplicateFinder::new(
        FinderConfig::default()
            .with_workers(2)
            .with_algorithm(HashAlgorithm::Blake3),
    )
    .find_duplicates(dir.path())
    .unwrap();

    assert_eq!(sha.sets.len(), 1);
    assert_eq!(blake.sets.len(), 1);
    assert_eq!(sha.sets[0].keep.path, blake.sets[0].keep.path);
    assert_ne!(sha.sets[0].digest, blake.sets[0].digest);
}

#[test]
fn test_small_batches_and_chunks_give_same_result() {
    let dir = tempdir().unwrap();
    for i in 0..12 {
        write(dir.path(), &format!("f{i:02}"), format!("group {}", i % 3).as_bytes());
    }

    let report = DuplicateFinder::new(
        FinderConfig::default()
            .with_workers(3)
            .with_batch_size(2)
            .with_chunk_size(3),
    )
    .find_duplicates(dir.path())
    .unwrap();

    assert_eq!(report.sets.len(), 3);
    assert!(report.sets.iter().all(|s| s.len() == 4));
}

#[test]
fn test_progress_events_report_counts() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a", b"dup");
    write(dir.path(), "b", b"dup");

    let handle = DuplicateFinder::new(
        FinderConfig::default()
            .with_workers(1)
            .with_progress_interval(std::time::Duration::from_millis(1)),
    )
    .start_scan(dir.path())
    .unwrap();

    let mut last_progress = None;
    let mut report = None;
    for event in handle.events() {
        match event {
            ScanEvent::Progress(p) => last_progress = Some(p),
            ScanEvent::Completed(r) => report = Some(r),
            ScanEvent::Warning(_) => {}
        }
    }

    let progress = last_progress.expect("at least one progress event");
    assert_eq!(progress.phase, ScanPhase::Finished);
    assert_eq!(progress.processed, 2);
    assert_eq!(progress.hashed, 2);
    assert_eq!(progress.duplicate_groups, 1);
    assert_eq!(report.unwrap().sets.len(), 1);
}

#[cfg(unix)]
#[test]
fn test_unreadable_directory_does_not_abort_scan() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    write(dir.path(), "ok/a", b"visible");
    write(dir.path(), "ok/b", b"visible");
    let locked = dir.path().join("locked");
    write(dir.path(), "locked/c", b"hidden");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Privileged users can read it anyway.
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let report = finder().find_duplicates(dir.path()).unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    assert_eq!(report.status, ScanStatus::Completed);
    assert_eq!(report.sets.len(), 1);
    assert!(report.snapshot().traversal_errors >= 1);
    assert!(!report.traversal_errors.is_empty());
}
