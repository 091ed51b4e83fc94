//! Error reporting specs

use crate::prelude::*;

#[test]
fn unknown_command_fails() {
    sj().arg("rotate").assert().failure();
}

#[test]
fn inspect_of_missing_file_fails() {
    let scratch = Scratch::new();
    sj().arg("inspect")
        .arg(scratch.path().join("absent"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to inspect"));
}

#[test]
fn inspect_of_garbage_reports_an_unusable_journal() {
    let scratch = Scratch::new();
    std::fs::write(scratch.journal(), vec![0x11u8; 8192]).unwrap();

    sj().arg("inspect")
        .arg(scratch.journal())
        .assert()
        .failure()
        .stderr(predicate::str::contains("journal unusable"));
}

#[test]
fn scan_of_garbage_fails() {
    let scratch = Scratch::new();
    std::fs::write(scratch.journal(), vec![0u8; 100]).unwrap();

    sj().arg("scan").arg(scratch.journal()).assert().failure();
}
