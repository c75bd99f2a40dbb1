//! Integration tests for document commands
//!
//! These run without an inference backend: ingestion degrades to keyword
//! retrieval when the embedding service is unreachable.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn llmgate_cmd(dirs: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("llmgate").unwrap();
    cmd.env("LLMGATE_DB", dirs.path().join("test.sqlite"))
        .env("XDG_CONFIG_HOME", dirs.path().join("config"))
        // Nothing listens here; embedding calls fail fast
        .env("LLMGATE_URL", "http://127.0.0.1:9");
    cmd
}

fn write_doc(dirs: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dirs.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_rag_add_and_ls() {
    let dirs = TempDir::new().unwrap();
    let doc = write_doc(&dirs, "notes.md", "tokio schedules tasks on worker threads");

    llmgate_cmd(&dirs)
        .arg("rag")
        .arg("add")
        .arg(&doc)
        .assert()
        .success()
        .stdout(predicate::str::contains("Added document"))
        .stdout(predicate::str::contains("notes"));

    llmgate_cmd(&dirs)
        .arg("rag")
        .arg("ls")
        .assert()
        .success()
        .stdout(predicate::str::contains("notes"))
        .stdout(predicate::str::contains("1 chunks"));
}

#[test]
fn test_rag_search_keyword_fallback() {
    let dirs = TempDir::new().unwrap();
    let doc = write_doc(&dirs, "runtime.md", "tokio schedules tasks on worker threads");
    llmgate_cmd(&dirs).arg("rag").arg("add").arg(&doc).assert().success();

    llmgate_cmd(&dirs)
        .arg("rag")
        .arg("search")
        .arg("tokio")
        .arg("worker")
        .assert()
        .success()
        .stdout(predicate::str::contains("runtime"));

    llmgate_cmd(&dirs)
        .arg("rag")
        .arg("search")
        .arg("unrelated")
        .arg("terms")
        .assert()
        .success()
        .stdout(predicate::str::contains("No matching chunks"));
}

#[test]
fn test_rag_remove_scoped_to_user() {
    let dirs = TempDir::new().unwrap();
    let doc = write_doc(&dirs, "mine.md", "some private notes");
    llmgate_cmd(&dirs).arg("rag").arg("add").arg(&doc).assert().success();

    // Another user cannot remove it
    llmgate_cmd(&dirs)
        .arg("--user")
        .arg("2")
        .arg("rag")
        .arg("rm")
        .arg("1")
        .assert()
        .failure()
        .stderr(predicate::str::contains("another user"));

    llmgate_cmd(&dirs)
        .arg("rag")
        .arg("rm")
        .arg("1")
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed document 1"));
}

#[test]
fn test_rag_add_missing_file_fails() {
    let dirs = TempDir::new().unwrap();
    llmgate_cmd(&dirs)
        .arg("rag")
        .arg("add")
        .arg(dirs.path().join("does-not-exist.md"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("reading"));
}
