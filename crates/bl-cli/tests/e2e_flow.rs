//! End-to-end tests for the babylog binary.
//!
//! Each test runs the real binary against a database in a temp directory.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn babylog_binary() -> String {
    env!("CARGO_BIN_EXE_babylog").to_string()
}

/// Runs babylog with `HOME` and the database isolated under `temp`.
fn babylog(temp: &Path, args: &[&str]) -> Output {
    Command::new(babylog_binary())
        .env("HOME", temp)
        .env_remove("XDG_CONFIG_HOME")
        .env_remove("XDG_DATA_HOME")
        .env_remove("RUST_LOG")
        .env("BABYLOG_DATABASE_PATH", temp.join("data/babylog.db"))
        .args(args)
        .output()
        .expect("failed to run babylog")
}

fn stdout_of(output: &Output) -> String {
    assert!(
        output.status.success(),
        "babylog should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_feed_start_stop_flow() {
    let temp = TempDir::new().unwrap();

    let started = stdout_of(&babylog(temp.path(), &["start", "--side", "left"]));
    assert!(started.starts_with("Started feed #1 at "));
    assert!(temp.path().join("data/babylog.db").exists());

    let status = stdout_of(&babylog(temp.path(), &["status"]));
    assert!(status.contains("in progress"), "status was: {status}");
    assert!(status.contains("Feeding:     yes, #1"));

    // A second start is refused while the first feed runs.
    let second = babylog(temp.path(), &["start"]);
    assert!(!second.status.success());
    assert!(String::from_utf8_lossy(&second.stderr).contains("already in progress"));

    let stopped = stdout_of(&babylog(temp.path(), &["stop"]));
    assert!(stopped.starts_with("Stopped feed #1: "));
    assert!(stopped.contains("left"));

    let again = stdout_of(&babylog(temp.path(), &["stop"]));
    assert_eq!(again, "No feed in progress.\n");

    let status = stdout_of(&babylog(temp.path(), &["status"]));
    assert!(status.contains("Feeding:     no"));
    assert!(status.contains("Today:       1 feeds"));
}

#[test]
fn test_log_undo_and_history() {
    let temp = TempDir::new().unwrap();

    stdout_of(&babylog(temp.path(), &["log", "wet"]));
    stdout_of(&babylog(temp.path(), &["log", "both", "--notes", "big one"]));

    let history = stdout_of(&babylog(temp.path(), &["history"]));
    assert!(history.contains("Wet + soiled"));
    assert!(history.contains("big one"));
    assert!(history.contains("Wet diaper"));

    let undone = stdout_of(&babylog(temp.path(), &["undo"]));
    assert!(undone.starts_with("Removed wet + soiled #2"));

    let json = stdout_of(&babylog(temp.path(), &["history", "--json"]));
    let events: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(events.as_array().map(Vec::len), Some(1));
    assert_eq!(events[0]["type"], "wet");
}

#[test]
fn test_manual_entry_and_stats_json() {
    let temp = TempDir::new().unwrap();

    let logged = stdout_of(&babylog(
        temp.path(),
        &[
            "manual", "--date", "2026-10-17", "--start", "23:50", "--end", "00:10",
        ],
    ));
    assert!(logged.contains("(20 min)"), "manual output was: {logged}");

    let json = stdout_of(&babylog(temp.path(), &["stats", "--view", "daily", "--json"]));
    let report: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(report["view"], "daily");
    assert!(report["timezone"].is_string());
    assert_eq!(report["buckets"][0]["date"], "2026-10-17");
    assert_eq!(report["buckets"][0]["counts"]["feeds"], 1);
    assert_eq!(report["buckets"][0]["feed_minutes"], 20.0);
}

#[test]
fn test_export_import_round_trip() {
    let source = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    let backup = source.path().join("backup.csv");
    let backup_arg = backup.to_str().unwrap();

    stdout_of(&babylog(source.path(), &["log", "soiled"]));
    stdout_of(&babylog(source.path(), &["feed", "--side", "right"]));
    stdout_of(&babylog(source.path(), &["feed"]));

    let exported = stdout_of(&babylog(source.path(), &["export", "--output", backup_arg]));
    assert!(exported.starts_with("Exported 2 events"));

    let imported = stdout_of(&babylog(target.path(), &["import", backup_arg]));
    assert_eq!(
        imported,
        "Imported 2 events, skipped 0 already present, 0 invalid.\n"
    );

    // Importing the same file again keeps the existing events.
    let again = stdout_of(&babylog(target.path(), &["import", backup_arg]));
    assert_eq!(again, "Imported 0 events, skipped 2 already present, 0 invalid.\n");

    let original = stdout_of(&babylog(source.path(), &["export", "--output", "-"]));
    let restored = stdout_of(&babylog(target.path(), &["export", "--output", "-"]));
    assert_eq!(original, restored);
}

#[test]
fn test_clear_requires_confirmation() {
    let temp = TempDir::new().unwrap();
    stdout_of(&babylog(temp.path(), &["log", "wet"]));

    let refused = babylog(temp.path(), &["clear"]);
    assert!(!refused.status.success());

    let cleared = stdout_of(&babylog(temp.path(), &["clear", "--yes"]));
    assert_eq!(cleared, "Deleted 1 events.\n");

    // Ids are not reused after a clear.
    let logged = stdout_of(&babylog(temp.path(), &["log", "wet"]));
    assert!(logged.starts_with("Logged wet diaper #2 "));
}
