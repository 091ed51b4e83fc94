//! Format specs

use crate::prelude::*;

#[test]
fn format_reports_the_geometry() {
    let scratch = Scratch::new();

    sj().args(["format", "--entries", "32", "--entry-size", "1024", "--uuid", "255"])
        .arg(scratch.journal())
        .assert()
        .success()
        .stdout(predicate::str::contains("32 slots x 1024 bytes"))
        .stdout(predicate::str::contains("0x00000000000000ff"));

    // Header region plus every slot.
    let len = std::fs::metadata(scratch.journal()).unwrap().len();
    assert_eq!(len, 4096 + 32 * 1024);
}

#[test]
fn format_refuses_an_existing_journal_without_force() {
    let scratch = Scratch::new().formatted(8);

    sj().args(["format", "--entries", "4", "--entry-size", "512"])
        .arg(scratch.journal())
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    sj().args(["format", "--force", "--entries", "4", "--entry-size", "512"])
        .arg(scratch.journal())
        .assert()
        .success();
    assert_eq!(scratch.json(&["inspect"])["header"]["slots"], 4);
}

#[test]
fn format_rejects_an_unaligned_entry_size() {
    let scratch = Scratch::new();

    sj().args(["format", "--entry-size", "700"])
        .arg(scratch.journal())
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid geometry"));
    assert!(!scratch.journal().exists());
}

#[test]
fn format_rejects_a_malformed_uuid() {
    let scratch = Scratch::new();

    sj().args(["format", "--uuid", "0xnothex"])
        .arg(scratch.journal())
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid number"));
}

#[test]
fn format_json_carries_the_header() {
    let scratch = Scratch::new();
    let output = sj()
        .args(["format", "--entries", "8", "--entry-size", "512", "--uuid", "7", "-o", "json"])
        .arg(scratch.journal())
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["slots"], 8);
    assert_eq!(json["entry_size"], 512);
    assert_eq!(json["store_uuid"], 7);
}
