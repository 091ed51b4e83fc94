//! Help and completions specs

use crate::prelude::*;

#[test]
fn help_lists_every_command() {
    sj().arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("format"))
        .stdout(predicate::str::contains("inspect"))
        .stdout(predicate::str::contains("scan"))
        .stdout(predicate::str::contains("completions"));
}

#[test]
fn version_is_printed() {
    sj().arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("sj "));
}

#[test]
fn bash_completions_mention_the_binary() {
    sj().args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("_sj"));
}
