//! Integration tests for the tidelog binary.
//!
//! Each test writes a real index file with the library, then drives the
//! binary against it.

#![allow(deprecated)] // Command::cargo_bin is deprecated but replacement requires newer assert_cmd

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use tidelog_index::{IndexReader, IndexWriter, read_all_entries};
use tidelog_io::DiskFile;
use tidelog_types::{BatchKind, Offset};

/// Writes 10 entries cycling through three keys.
fn write_index(dir: &Path) -> PathBuf {
    let path = dir.join("0-1.log.compaction_index");
    let mut writer = IndexWriter::new(DiskFile::create(&path).unwrap(), 128);
    for i in 0..10u64 {
        let key = format!("key-{}", i % 3);
        writer
            .index(BatchKind::new(1), key.as_bytes(), Offset::new(i), 0)
            .unwrap();
    }
    writer.close().unwrap();
    path
}

fn tidelog(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tidelog").unwrap();
    cmd.current_dir(dir.path()).env_remove("RUST_LOG");
    cmd
}

// ============================================================================
// Argument Parsing
// ============================================================================

#[test]
fn help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    tidelog(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("inspect"))
        .stdout(predicate::str::contains("dump"))
        .stdout(predicate::str::contains("dedup"))
        .stdout(predicate::str::contains("offsets"));
}

#[test]
fn dedup_requires_output() {
    let dir = TempDir::new().unwrap();
    tidelog(&dir)
        .args(["dedup", "in.idx"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("required"));
}

// ============================================================================
// Commands
// ============================================================================

#[test]
fn inspect_prints_footer_and_verifies() {
    let dir = TempDir::new().unwrap();
    let path = write_index(dir.path());

    tidelog(&dir)
        .arg("inspect")
        .arg(&path)
        .arg("--verify")
        .assert()
        .success()
        .stdout(predicate::str::contains("version: key_prefixed_with_batch_kind"))
        .stdout(predicate::str::contains("keys:    10"))
        .stdout(predicate::str::contains("integrity: ok"));
}

#[test]
fn inspect_verify_fails_on_corruption() {
    let dir = TempDir::new().unwrap();
    let path = write_index(dir.path());
    let mut bytes = fs::read(&path).unwrap();
    // Last byte of the first key.
    bytes[10] ^= 0x01;
    fs::write(&path, bytes).unwrap();

    tidelog(&dir)
        .arg("inspect")
        .arg(&path)
        .arg("--verify")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Integrity check failed"));
}

#[test]
fn inspect_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    tidelog(&dir)
        .args(["inspect", "absent.compaction_index"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open index"));
}

#[test]
fn dump_prints_entries_in_order() {
    let dir = TempDir::new().unwrap();
    let path = write_index(dir.path());

    tidelog(&dir)
        .arg("dump")
        .arg(&path)
        .args(["--limit", "2"])
        .assert()
        .success()
        .stdout("0\t0\t1\tkey-0\n1\t0\t1\tkey-1\n");
}

#[test]
fn dedup_writes_latest_entry_per_key() {
    let dir = TempDir::new().unwrap();
    let input = write_index(dir.path());
    let output = dir.path().join("0-1.log.compaction_index.staging");

    tidelog(&dir)
        .arg("dedup")
        .arg(&input)
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("kept 3 of 10 entries"));

    let mut reader = IndexReader::new(DiskFile::open(&output).unwrap());
    reader.verify_integrity().unwrap();
    let offsets: Vec<u64> = read_all_entries(&mut reader)
        .unwrap()
        .iter()
        .map(|e| e.offset.as_u64())
        .collect();
    assert_eq!(offsets, vec![7, 8, 9]);
}

#[test]
fn dedup_with_tiny_budget_keeps_more() {
    let dir = TempDir::new().unwrap();
    let input = write_index(dir.path());
    let output = dir.path().join("out.compaction_index");

    tidelog(&dir)
        .arg("dedup")
        .arg(&input)
        .arg(&output)
        .args(["--key-budget", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("kept 10 of 10 entries"));
}

#[test]
fn offsets_respects_base() {
    let dir = TempDir::new().unwrap();
    let path = write_index(dir.path());

    tidelog(&dir)
        .arg("offsets")
        .arg(&path)
        .args(["--base", "7"])
        .assert()
        .success()
        .stdout("7\n8\n9\n");
}

#[test]
fn config_reads_project_file() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("tidelog.toml"),
        "[index]\nspill_budget_bytes = 1024\n",
    )
    .unwrap();

    tidelog(&dir)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("spill_budget_bytes = 1024"));
}

#[test]
fn invalid_config_fails_before_running() {
    let dir = TempDir::new().unwrap();
    let extra = dir.path().join("bad.toml");
    fs::write(&extra, "[index]\nread_buffer_bytes = 0\n").unwrap();

    tidelog(&dir)
        .arg("--config")
        .arg(&extra)
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}
