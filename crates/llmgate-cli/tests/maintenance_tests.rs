//! Integration tests for maintenance commands

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn llmgate_cmd(dirs: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("llmgate").unwrap();
    cmd.env("LLMGATE_DB", dirs.path().join("test.sqlite"))
        .env("XDG_CONFIG_HOME", dirs.path().join("config"))
        .env("LLMGATE_URL", "http://127.0.0.1:9");
    cmd
}

#[test]
fn test_cache_stats_empty() {
    let dirs = TempDir::new().unwrap();
    llmgate_cmd(&dirs)
        .arg("cache")
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("Entries:         0"));
}

#[test]
fn test_cache_sweep_and_invalidate() {
    let dirs = TempDir::new().unwrap();
    llmgate_cmd(&dirs)
        .arg("cache")
        .arg("sweep")
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 0 expired entries"));

    llmgate_cmd(&dirs)
        .arg("cache")
        .arg("invalidate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Invalidated all 0 entries"));
}

#[test]
fn test_verbose_flag_emits_debug_trace() {
    let dirs = TempDir::new().unwrap();
    llmgate_cmd(&dirs)
        .arg("--verbose")
        .arg("cache")
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("Entries:         0"))
        .stderr(predicate::str::contains("DEBUG"));
}

#[test]
fn test_stats_json_shape() {
    let dirs = TempDir::new().unwrap();
    let output = llmgate_cmd(&dirs)
        .arg("--format")
        .arg("json")
        .arg("stats")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let parsed: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert!(parsed.get("cache").is_some());
    assert!(parsed.get("retry").is_some());
    assert!(parsed.get("rag").is_some());
    assert!(parsed.get("comparisons").is_some());
}

#[test]
fn test_rate_rejects_out_of_range() {
    let dirs = TempDir::new().unwrap();
    llmgate_cmd(&dirs)
        .arg("rate")
        .arg("1")
        .arg("5")
        .assert()
        .failure()
        .stderr(predicate::str::contains("rating must be -1, 0 or 1"));
}

#[test]
fn test_models_fails_without_backend() {
    let dirs = TempDir::new().unwrap();
    llmgate_cmd(&dirs)
        .arg("models")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not responding"));
}

#[test]
fn test_rankings_empty_window() {
    let dirs = TempDir::new().unwrap();
    llmgate_cmd(&dirs)
        .arg("rankings")
        .assert()
        .success()
        .stdout(predicate::str::contains("No comparison data"));
}

#[test]
fn test_compare_requires_two_models() {
    let dirs = TempDir::new().unwrap();
    llmgate_cmd(&dirs)
        .arg("compare")
        .arg("hello")
        .arg("--models")
        .arg("m1")
        .assert()
        .failure();
}
