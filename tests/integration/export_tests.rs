use clap::Parser;
use dedupinator::cli::Cli;
use dedupinator::duplicates::{DuplicateFinder, FinderConfig};
use dedupinator::error::ExitCode;
use dedupinator::output::{CsvOutput, JsonOutput};
use dedupinator::report::FinalReport;
use filetime::{set_file_mtime, FileTime};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write(dir: &Path, name: &str, content: &[u8], secs: i64) {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    set_file_mtime(&path, FileTime::from_unix_time(secs, 0)).unwrap();
}

#[test]
fn test_csv_from_real_scan() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.txt", b"twin", 100);
    write(dir.path(), "b.txt", b"twin", 200);
    write(dir.path(), "c.dat", b"triplet", 100);
    write(dir.path(), "d.dat", b"triplet", 100);
    write(dir.path(), "e.dat", b"triplet", 100);

    let report = DuplicateFinder::new(FinderConfig::default().with_workers(2))
        .find_duplicates(dir.path())
        .unwrap();
    let csv = CsvOutput::new(&report.sets).to_string().unwrap();
    let rows: Vec<Vec<&str>> = csv.lines().map(|l| l.split(',').collect()).collect();

    assert_eq!(rows[0], vec!["Group", "FilePath", "Size", "ModifiedTime", "Status"]);
    assert_eq!(rows.len(), 1 + 5);

    // Group 1 is the first size bucket seen: a.txt/b.txt.
    assert_eq!(rows[1][0], "1");
    assert!(rows[1][1].ends_with("b.txt"));
    assert_eq!(rows[1][2], "4");
    assert_eq!(rows[1][4], "KEEP");
    assert!(rows[2][1].ends_with("a.txt"));
    assert_eq!(rows[2][4], "DUPLICATE");

    let group_two: Vec<_> = rows[3..].iter().filter(|r| r[0] == "2").collect();
    assert_eq!(group_two.len(), 3);
    assert_eq!(group_two.iter().filter(|r| r[4] == "KEEP").count(), 1);
    assert!(group_two[0][1].ends_with("c.dat"));
}

#[test]
fn test_json_from_real_scan() {
    let dir = tempdir().unwrap();
    write(dir.path(), "x", b"json body", 10);
    write(dir.path(), "y", b"json body", 20);

    let scan = DuplicateFinder::new(FinderConfig::default().with_workers(1))
        .find_duplicates(dir.path())
        .unwrap();
    let report = FinalReport::new(&scan, None);
    let value: serde_json::Value =
        serde_json::from_str(&JsonOutput::new(&report).to_json().unwrap()).unwrap();

    assert_eq!(value["verdict"], "duplicates_found");
    assert_eq!(value["sets"].as_array().unwrap().len(), 1);
    assert!(value["sets"][0]["keep"]["path"].as_str().unwrap().ends_with('y'));
    assert_eq!(value["statistics"]["files_hashed"], 2);
    assert_eq!(value["reclaimable_bytes"], 9);
}

#[test]
fn test_run_app_writes_csv_file() {
    let dir = tempdir().unwrap();
    let tree = dir.path().join("tree");
    fs::create_dir(&tree).unwrap();
    let config = dir.path().join("config.toml");
    fs::write(&config, "").unwrap();
    let out = dir.path().join("exports").join("dups.csv");
    write(&tree, "one", b"exported", 1);
    write(&tree, "two", b"exported", 2);

    let cli = Cli::try_parse_from([
        "dedupinator",
        "-q",
        "--config",
        config.to_str().unwrap(),
        "scan",
        tree.to_str().unwrap(),
        "--dry-run",
        "--no-progress",
        "--csv",
        out.to_str().unwrap(),
    ])
    .unwrap();
    assert_eq!(dedupinator::run_app(cli).unwrap(), ExitCode::Success);

    let content = fs::read_to_string(&out).unwrap();
    assert!(content.starts_with("Group,FilePath,Size,ModifiedTime,Status"));
    assert_eq!(content.lines().count(), 3);
}

#[test]
fn test_run_app_default_export_dir() {
    let dir = tempdir().unwrap();
    let tree = dir.path().join("tree");
    fs::create_dir(&tree).unwrap();
    let exports = dir.path().join("exports");
    let config = dir.path().join("config.toml");
    fs::write(
        &config,
        format!("csv_dir = {:?}\n", exports.to_str().unwrap()),
    )
    .unwrap();
    write(&tree, "solo", b"no twin", 1);

    let cli = Cli::try_parse_from([
        "dedupinator",
        "-q",
        "--config",
        config.to_str().unwrap(),
        "scan",
        tree.to_str().unwrap(),
        "--dry-run",
        "--no-progress",
        "--export-csv",
    ])
    .unwrap();
    assert_eq!(dedupinator::run_app(cli).unwrap(), ExitCode::NoDuplicates);

    let files: Vec<_> = fs::read_dir(&exports).unwrap().collect();
    assert_eq!(files.len(), 1);
    let name = files[0].as_ref().unwrap().file_name();
    let name = name.to_string_lossy();
    assert!(name.starts_with("duplicates_") && name.ends_with(".csv"));
}
