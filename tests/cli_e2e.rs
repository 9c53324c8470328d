//! End-to-end CLI tests for tidy-tweet.
//!
//! These tests run the actual tidy-tweet binary and verify:
//! - Command-line interface behavior
//! - Output format and content
//! - Error handling and messages
//!
//! # Test Organization
//!
//! Tests are organized by command:
//! - `test_load_*` - Load command tests
//! - `test_init_*` - Init command tests
//! - `test_check_*` - Check command tests
//! - `test_schema_*` - Schema command tests
//! - `test_config_*` - Configuration file and environment handling
//! - `test_cli_*` - General CLI tests (flags, help, version, completions)
//!
//! # Logging
//!
//! All tests use detailed logging for debugging:
//! - Test start/end timestamps
//! - Command output capture
//! - Timing information

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

/// Log a test event with timestamp
macro_rules! test_log {
    ($($arg:tt)*) => {
        let timestamp = chrono::Utc::now().format("%H:%M:%S%.3f");
        eprintln!("[TEST {}] {}", timestamp, format!($($arg)*));
    };
}

/// Get the tidy-tweet command ready for testing, isolated from user config
fn tidy_cmd(temp_dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("tidy-tweet");
    cmd.env("HOME", temp_dir.path())
        .env("XDG_CONFIG_HOME", temp_dir.path().join(".config"))
        .env("NO_COLOR", "1")
        .env_remove("TIDY_TWEET_CONFIG")
        .env_remove("RUST_LOG")
        .env_remove("TIDY_TWEET_STRICT")
        .env_remove("TIDY_TWEET_LOG")
        .env_remove("TIDY_TWEET_LOG_FORMAT");
    cmd
}

/// Write a results file into the temp dir
fn write_results(temp_dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = temp_dir.path().join(name);
    fs::write(&path, content).expect("Failed to write results file");
    path
}

fn db_path(temp_dir: &TempDir) -> PathBuf {
    temp_dir.path().join("tweets.db")
}

fn load(temp_dir: &TempDir, db: &Path, files: &[&Path]) -> assert_cmd::assert::Assert {
    let mut cmd = tidy_cmd(temp_dir);
    cmd.arg("load").arg(db);
    for file in files {
        cmd.arg(file);
    }
    cmd.assert()
}

// =============================================================================
// Sample Test Data
// =============================================================================

const SEARCH_RESULTS: &str = r#"{"data": [{"id": "1501", "author_id": "2244994945", "text": "Learning #Rust today", "lang": "en", "public_metrics": {"retweet_count": 0, "reply_count": 1, "like_count": 5, "quote_count": 0}, "entities": {"hashtags": [{"start": 9, "end": 14, "tag": "Rust"}]}}], "includes": {"users": [{"id": "2244994945", "username": "TwitterDev", "name": "Twitter Dev"}]}, "meta": {"newest_id": "1501", "oldest_id": "1501", "result_count": 1}, "__twarc": {"url": "https://api.twitter.com/2/tweets/search/recent?query=%23rust", "version": "2.10.4", "retrieved_at": "2022-03-10T05:38:58+00:00"}}
{"data": [{"id": "1500", "author_id": "2244994945", "text": "Hello world"}], "meta": {"newest_id": "1500", "oldest_id": "1500", "result_count": 1}, "__twarc": {"url": "https://api.twitter.com/2/tweets/search/recent?query=%23rust", "version": "2.10.4", "retrieved_at": "2022-03-10T05:39:01+00:00"}}
"#;

const USER_LOOKUP: &str = r#"{"data": {"id": "783214", "username": "X", "name": "X", "location": "everywhere"}, "__twarc": {"retrieved_at": "2022-03-11T00:00:00+00:00"}}
"#;

const BROKEN_RESULTS: &str = r#"{"data": [{"id": "1", "author_id": "2", "text": "fine"}], "__twarc": {"retrieved_at": "2022-03-10T00:00:00+00:00"}}
{"data": [{"id": "2", "text": "no author"}], "__twarc": {"retrieved_at": "2022-03-10T00:01:00+00:00"}}
"#;

// =============================================================================
// CLI Tests
// =============================================================================

#[test]
fn test_cli_help() {
    test_log!("Starting test_cli_help");
    let temp_dir = TempDir::new().unwrap();

    tidy_cmd(&temp_dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("load"))
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("schema"));

    test_log!("test_cli_help completed");
}

#[test]
fn test_cli_version() {
    test_log!("Starting test_cli_version");
    let temp_dir = TempDir::new().unwrap();

    tidy_cmd(&temp_dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));

    test_log!("test_cli_version completed");
}

#[test]
fn test_cli_completions_bash() {
    test_log!("Starting test_cli_completions_bash");
    let temp_dir = TempDir::new().unwrap();

    tidy_cmd(&temp_dir)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tidy-tweet"));

    test_log!("test_cli_completions_bash completed");
}

#[test]
fn test_cli_load_requires_files() {
    test_log!("Starting test_cli_load_requires_files");
    let temp_dir = TempDir::new().unwrap();

    tidy_cmd(&temp_dir)
        .arg("load")
        .arg(db_path(&temp_dir))
        .assert()
        .failure();

    assert!(!db_path(&temp_dir).exists());
    test_log!("test_cli_load_requires_files completed");
}

// =============================================================================
// Load Tests
// =============================================================================

#[test]
fn test_load_creates_database() {
    test_log!("Starting test_load_creates_database");
    let start = Instant::now();
    let temp_dir = TempDir::new().unwrap();
    let results = write_results(&temp_dir, "search.jsonl", SEARCH_RESULTS);
    let db = db_path(&temp_dir);

    let output = load(&temp_dir, &db, &[&results])
        .success()
        .stdout(predicate::str::contains("Created"))
        .stdout(predicate::str::contains("All done! 2 pages from 1 files"))
        .get_output()
        .clone();

    test_log!("stdout: {}", String::from_utf8_lossy(&output.stdout));
    assert!(db.exists());

    let conn = rusqlite::Connection::open(&db).unwrap();
    let pages: i64 = conn
        .query_row("SELECT COUNT(*) FROM results_page", [], |row| row.get(0))
        .unwrap();
    assert_eq!(pages, 2);

    test_log!("test_load_creates_database completed in {:?}", start.elapsed());
}

#[test]
fn test_load_into_existing_database() {
    test_log!("Starting test_load_into_existing_database");
    let start = Instant::now();
    let temp_dir = TempDir::new().unwrap();
    let search = write_results(&temp_dir, "search.jsonl", SEARCH_RESULTS);
    let lookup = write_results(&temp_dir, "lookup.jsonl", USER_LOOKUP);
    let db = db_path(&temp_dir);

    load(&temp_dir, &db, &[&search]).success();
    load(&temp_dir, &db, &[&lookup])
        .success()
        .stdout(predicate::str::contains("Created").not())
        .stdout(predicate::str::contains("All done! 1 pages from 1 files"));

    let conn = rusqlite::Connection::open(&db).unwrap();
    let location: String = conn
        .query_row("SELECT location FROM user WHERE id = '783214'", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(location, "everywhere");

    test_log!(
        "test_load_into_existing_database completed in {:?}",
        start.elapsed()
    );
}

#[test]
fn test_load_failing_page_reports_page() {
    test_log!("Starting test_load_failing_page_reports_page");
    let temp_dir = TempDir::new().unwrap();
    let broken = write_results(&temp_dir, "broken.jsonl", BROKEN_RESULTS);
    let db = db_path(&temp_dir);

    let output = load(&temp_dir, &db, &[&broken])
        .failure()
        .stderr(predicate::str::contains("page 2"))
        .stderr(predicate::str::contains("broken.jsonl"))
        .stderr(predicate::str::contains("author_id"))
        .get_output()
        .clone();
    test_log!("stderr: {}", String::from_utf8_lossy(&output.stderr));

    // The first page stays committed.
    let conn = rusqlite::Connection::open(&db).unwrap();
    let pages: i64 = conn
        .query_row("SELECT COUNT(*) FROM results_page", [], |row| row.get(0))
        .unwrap();
    assert_eq!(pages, 1);

    test_log!("test_load_failing_page_reports_page completed");
}

#[test]
fn test_load_missing_input_file() {
    test_log!("Starting test_load_missing_input_file");
    let temp_dir = TempDir::new().unwrap();
    let db = db_path(&temp_dir);
    let missing = temp_dir.path().join("missing.jsonl");

    load(&temp_dir, &db, &[&missing])
        .failure()
        .stderr(predicate::str::contains("Input file does not exist"));

    assert!(!db.exists());
    test_log!("test_load_missing_input_file completed");
}

#[test]
fn test_load_refuses_foreign_file() {
    test_log!("Starting test_load_refuses_foreign_file");
    let temp_dir = TempDir::new().unwrap();
    let results = write_results(&temp_dir, "search.jsonl", SEARCH_RESULTS);
    let db = write_results(
        &temp_dir,
        "notes.db",
        &"these are notes, not a database\n".repeat(32),
    );

    load(&temp_dir, &db, &[&results])
        .failure()
        .stderr(predicate::str::contains("Not a tidy-tweet database"));

    test_log!("test_load_refuses_foreign_file completed");
}

// =============================================================================
// Init Tests
// =============================================================================

#[test]
fn test_init_twice_fails() {
    test_log!("Starting test_init_twice_fails");
    let temp_dir = TempDir::new().unwrap();
    let db = db_path(&temp_dir);

    tidy_cmd(&temp_dir)
        .arg("init")
        .arg(&db)
        .assert()
        .success()
        .stdout(predicate::str::contains("schema version 2023-06-22"));

    tidy_cmd(&temp_dir)
        .arg("init")
        .arg(&db)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    test_log!("test_init_twice_fails completed");
}

#[test]
fn test_init_strict() {
    test_log!("Starting test_init_strict");
    let temp_dir = TempDir::new().unwrap();
    let db = db_path(&temp_dir);

    tidy_cmd(&temp_dir)
        .args(["init", "--strict"])
        .arg(&db)
        .assert()
        .success()
        .stdout(predicate::str::contains("strict"));

    let conn = rusqlite::Connection::open(&db).unwrap();
    let sql: String = conn
        .query_row(
            "SELECT sql FROM sqlite_master WHERE name = 'tweet_by_page'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert!(sql.ends_with("strict"));

    test_log!("test_init_strict completed");
}

// =============================================================================
// Check Tests
// =============================================================================

#[test]
fn test_check_reports_row_counts() {
    test_log!("Starting test_check_reports_row_counts");
    let temp_dir = TempDir::new().unwrap();
    let results = write_results(&temp_dir, "search.jsonl", SEARCH_RESULTS);
    let db = db_path(&temp_dir);
    load(&temp_dir, &db, &[&results]).success();

    tidy_cmd(&temp_dir)
        .arg("check")
        .arg(&db)
        .assert()
        .success()
        .stdout(predicate::str::contains("is compatible"))
        .stdout(predicate::str::contains("results_page"))
        .stdout(predicate::str::contains("tweet_by_page"))
        .stdout(predicate::str::contains("results_file"));

    test_log!("test_check_reports_row_counts completed");
}

#[test]
fn test_check_missing_database() {
    test_log!("Starting test_check_missing_database");
    let temp_dir = TempDir::new().unwrap();

    tidy_cmd(&temp_dir)
        .arg("check")
        .arg(db_path(&temp_dir))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not a tidy-tweet database"));

    test_log!("test_check_missing_database completed");
}

// =============================================================================
// Schema Tests
// =============================================================================

#[test]
fn test_schema_prints_tables_and_views() {
    test_log!("Starting test_schema_prints_tables_and_views");
    let temp_dir = TempDir::new().unwrap();

    tidy_cmd(&temp_dir)
        .arg("schema")
        .assert()
        .success()
        .stdout(predicate::str::contains("create table tweet_by_page"))
        .stdout(predicate::str::contains("create view tweet as"))
        .stdout(predicate::str::contains(") strict").not());

    tidy_cmd(&temp_dir)
        .args(["schema", "--strict"])
        .assert()
        .success()
        .stdout(predicate::str::contains(") strict"));

    test_log!("test_schema_prints_tables_and_views completed");
}

// =============================================================================
// Config Tests
// =============================================================================

#[test]
fn test_config_invalid_file_stops_run() {
    test_log!("Starting test_config_invalid_file_stops_run");
    let temp_dir = TempDir::new().unwrap();
    let config = write_results(
        &temp_dir,
        "bad.toml",
        "[storage]\nstrict = true\n\n[logging]\nlevel = \"loud\"\n",
    );

    let output = tidy_cmd(&temp_dir)
        .arg("--config")
        .arg(&config)
        .arg("schema")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"))
        .stderr(predicate::str::contains("bad.toml"))
        .stdout(predicate::str::is_empty())
        .get_output()
        .clone();
    test_log!("stderr: {}", String::from_utf8_lossy(&output.stderr));

    test_log!("test_config_invalid_file_stops_run completed");
}

#[test]
fn test_config_missing_file_stops_run() {
    test_log!("Starting test_config_missing_file_stops_run");
    let temp_dir = TempDir::new().unwrap();
    let db = db_path(&temp_dir);

    tidy_cmd(&temp_dir)
        .env("TIDY_TWEET_CONFIG", temp_dir.path().join("does-not-exist.toml"))
        .arg("init")
        .arg(&db)
        .assert()
        .failure()
        .stderr(predicate::str::contains("does-not-exist.toml"));

    assert!(!db.exists());
    test_log!("test_config_missing_file_stops_run completed");
}

#[test]
fn test_config_file_strict_applies() {
    test_log!("Starting test_config_file_strict_applies");
    let temp_dir = TempDir::new().unwrap();
    let config = write_results(&temp_dir, "strict.toml", "[storage]\nstrict = true\n");
    let db = db_path(&temp_dir);

    tidy_cmd(&temp_dir)
        .arg("--config")
        .arg(&config)
        .arg("init")
        .arg(&db)
        .assert()
        .success()
        .stdout(predicate::str::contains("strict"));

    test_log!("test_config_file_strict_applies completed");
}

#[test]
fn test_config_bad_env_value_is_reported() {
    test_log!("Starting test_config_bad_env_value_is_reported");
    let temp_dir = TempDir::new().unwrap();

    tidy_cmd(&temp_dir)
        .env("TIDY_TWEET_LOG", "loud")
        .arg("schema")
        .assert()
        .success()
        .stderr(predicate::str::contains("TIDY_TWEET_LOG"))
        .stdout(predicate::str::contains("create table results_page"));

    test_log!("test_config_bad_env_value_is_reported completed");
}
