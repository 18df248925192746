//! E2E Test Suite 07: CLI Integration
//!
//! Tests the `derdump` binary as a black box using std::process::Command:
//! tree output, stdin mode, and exit codes on malformed input.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tempfile::TempDir;

/// Locate the `derdump` binary produced by Cargo.
fn derdump_bin() -> PathBuf {
    // CARGO_BIN_EXE_derdump is set by Cargo when running integration tests.
    if let Ok(p) = std::env::var("CARGO_BIN_EXE_derdump") {
        return PathBuf::from(p);
    }
    let mut p = std::env::current_exe().unwrap();
    p.pop();
    if p.ends_with("deps") {
        p.pop();
    }
    p.push("derdump");
    p
}

/// SEQUENCE { INTEGER 5, SET { PrintableString "hi" } }
const SAMPLE: &[u8] = &[
    0x30, 0x09, 0x02, 0x01, 0x05, 0x31, 0x04, 0x13, 0x02, 0x68, 0x69,
];

// ─────────────────────────────────────────────────────────────────────────────
// Test 1: dump a file argument
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_cli_dumps_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sample.der");
    fs::write(&path, SAMPLE).unwrap();

    let output = Command::new(derdump_bin())
        .arg(&path)
        .output()
        .expect("derdump should run");
    assert!(output.status.success());

    let text = String::from_utf8(output.stdout).unwrap();
    assert!(text.contains("SEQUENCE (9 bytes)"));
    assert!(text.contains("  INTEGER (1 bytes): 05"));
    assert!(text.contains("  SET (4 bytes)"));
    assert!(text.contains("    PrintableString (2 bytes): 68 69"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 2: read from stdin with "-"
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_cli_reads_stdin() {
    let mut child = Command::new(derdump_bin())
        .arg("-")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("derdump should spawn");
    child.stdin.as_mut().unwrap().write_all(SAMPLE).unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8(output.stdout)
        .unwrap()
        .contains("SEQUENCE (9 bytes)"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 3: malformed input fails with a nonzero exit code
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_cli_rejects_malformed_input() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("trunc.der");
    fs::write(&path, [0x30u8, 0x05, 0x02]).unwrap();

    let output = Command::new(derdump_bin())
        .arg(&path)
        .output()
        .expect("derdump should run");
    assert!(!output.status.success());
    let err = String::from_utf8(output.stderr).unwrap();
    assert!(err.contains("not well-formed"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 4: a missing file is reported with its path
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_cli_reports_missing_file() {
    let output = Command::new(derdump_bin())
        .arg("/no/such/file.der")
        .output()
        .expect("derdump should run");
    assert!(!output.status.success());
    let err = String::from_utf8(output.stderr).unwrap();
    assert!(err.contains("/no/such/file.der"));
}
