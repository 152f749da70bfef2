use clap::Parser;
use dedupinator::actions::{ConfirmMode, DeleteMode};
use dedupinator::cli::{Cli, Commands};
use dedupinator::config::{Config, SizeUnit};
use dedupinator::duplicates::RetentionRule;
use dedupinator::error::{ConfigurationError, ExitCode};
use dedupinator::scanner::HashAlgorithm;
use std::fs;
use std::sync::Mutex;
use tempfile::tempdir;

static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Clear all DEDUPINATOR_* environment variables to avoid interference.
fn clear_env() {
    for (key, _) in std::env::vars() {
        if key.starts_with("DEDUPINATOR_") {
            std::env::remove_var(key);
        }
    }
}

fn scan_args(args: &[&str]) -> dedupinator::cli::ScanArgs {
    let mut argv = vec!["dedupinator", "scan", "/tmp"];
    argv.extend_from_slice(args);
    match Cli::try_parse_from(argv).unwrap().command {
        Commands::Scan(args) => args,
        Commands::Config(_) => panic!("Expected Scan command"),
    }
}

#[test]
fn test_load_from_toml_with_units() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
min_size = 2
max_size = 3
size_unit = "mb"
skip_extensions = [".bak"]
algorithm = "blake3"
keep = "oldest"
confirm_mode = "whole_scan"
delete_mode = "trash"
workers = 3
"#,
    )
    .unwrap();

    let config = Config::load(Some(&path)).unwrap();

    assert_eq!(config.min_size, 2 << 20);
    assert_eq!(config.max_size, Some(3 << 20));
    assert_eq!(config.size_unit, SizeUnit::B);
    assert_eq!(config.skip_extensions, vec![".bak"]);
    assert_eq!(config.algorithm, HashAlgorithm::Blake3);
    assert_eq!(config.keep, RetentionRule::Oldest);
    assert_eq!(config.confirm_mode, ConfirmMode::WholeScan);
    assert_eq!(config.delete_mode, DeleteMode::Trash);
    assert_eq!(config.workers, Some(3));
    assert_eq!(config.batch_size, 1000);
}

#[test]
fn test_env_overrides_file() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "batch_size = 50\nkeep = \"oldest\"\n").unwrap();

    std::env::set_var("DEDUPINATOR_BATCH_SIZE", "75");
    let config = Config::load(Some(&path));
    clear_env();
    let config = config.unwrap();

    assert_eq!(config.batch_size, 75);
    assert_eq!(config.keep, RetentionRule::Oldest);
}

#[test]
fn test_cli_overrides_everything() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "min_size = 1\nsize_unit = \"kb\"\nauto_delete = true\n").unwrap();

    let mut config = Config::load(Some(&path)).unwrap();
    config
        .apply_scan_args(&scan_args(&[
            "--min-size",
            "5",
            "--unit",
            "kb",
            "--max-size",
            "1MB",
            "--skip-ext",
            ".iso",
            "--keep",
            "oldest",
            "--dry-run",
            "--trash",
            "--chunk-size",
            "64KB",
        ]))
        .unwrap();

    assert_eq!(config.min_size, 5 * 1024);
    assert_eq!(config.max_size, Some(1 << 20));
    assert_eq!(config.skip_extensions, vec![".iso"]);
    assert_eq!(config.keep, RetentionRule::Oldest);
    assert!(!config.auto_delete);
    assert_eq!(config.delete_mode, DeleteMode::Trash);
    assert_eq!(config.chunk_size, 64 * 1024);
}

#[test]
fn test_invalid_toml_is_a_load_error() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "batch_size = \"many\"\n").unwrap();

    let err = Config::load(Some(&path)).unwrap_err();
    assert!(matches!(err, ConfigurationError::Load(_)));
}

#[test]
fn test_run_app_inverted_range_exits_with_config_code() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let config = dir.path().join("config.toml");
    fs::write(&config, "").unwrap();
    fs::write(dir.path().join("a"), b"content").unwrap();
    fs::write(dir.path().join("b"), b"content").unwrap();

    let cli = Cli::try_parse_from([
        "dedupinator",
        "-q",
        "--config",
        config.to_str().unwrap(),
        "scan",
        dir.path().to_str().unwrap(),
        "--min-size",
        "100",
        "--max-size",
        "10",
        "--dry-run",
    ])
    .unwrap();

    let err = dedupinator::run_app(cli).unwrap_err();
    assert_eq!(ExitCode::for_error(&err), ExitCode::InvalidConfig);
}

#[test]
fn test_run_app_missing_root_exits_with_config_code() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let config = dir.path().join("config.toml");
    fs::write(&config, "").unwrap();

    let cli = Cli::try_parse_from([
        "dedupinator",
        "-q",
        "--config",
        config.to_str().unwrap(),
        "scan",
        dir.path().join("nope").to_str().unwrap(),
        "--dry-run",
    ])
    .unwrap();

    let err = dedupinator::run_app(cli).unwrap_err();
    assert_eq!(ExitCode::for_error(&err), ExitCode::InvalidConfig);
}

#[test]
fn test_blank_skip_extension_is_rejected() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "skip_extensions = [\".tmp\", \"\"]\n").unwrap();

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(
        config.to_finder_config().unwrap_err(),
        ConfigurationError::BlankExtension
    );
}

#[test]
fn test_config_init_then_show() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let init = Cli::try_parse_from([
        "dedupinator",
        "-q",
        "--config",
        path.to_str().unwrap(),
        "config",
        "--init",
    ])
    .unwrap();
    assert_eq!(dedupinator::run_app(init).unwrap(), ExitCode::Success);
    assert!(fs::read_to_string(&path).unwrap().contains("batch_size = 1000"));

    let show = Cli::try_parse_from([
        "dedupinator",
        "-q",
        "--config",
        path.to_str().unwrap(),
        "config",
        "--show",
    ])
    .unwrap();
    assert_eq!(dedupinator::run_app(show).unwrap(), ExitCode::Success);
}
