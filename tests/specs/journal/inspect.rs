//! Inspect specs

use crate::prelude::*;

#[test]
fn fresh_journal_has_only_format_entries() {
    let scratch = Scratch::new().formatted(8);

    sj().arg("inspect")
        .arg(scratch.journal())
        .assert()
        .success()
        .stdout(predicate::str::contains("8 slots x 512 bytes"))
        .stdout(predicate::str::contains("Store uuid: 0x000000000000abcd"))
        .stdout(predicate::str::contains("Format:     8"))
        .stdout(predicate::str::contains("Xids:       none"));
}

#[test]
fn written_entries_appear_in_the_census() {
    let scratch = Scratch::new()
        .formatted(8)
        .with_entries(&[(false, 1, b"a"), (true, 1, b"b"), (false, 2, b"c")]);

    let json = scratch.json(&["inspect"]);

    assert_eq!(json["census"]["valid"], 3);
    assert_eq!(json["census"]["distill"], 1);
    assert_eq!(json["census"]["format"], 5);
    assert_eq!(json["census"]["torn"], 0);
    assert_eq!(json["census"]["min_xid"], 1);
    assert_eq!(json["census"]["max_xid"], 3);
}

#[test]
fn inspect_text_shows_the_xid_range() {
    let scratch = Scratch::new()
        .formatted(4)
        .with_entries(&[(false, 1, b""), (false, 1, b"")]);

    sj().arg("inspect")
        .arg(scratch.journal())
        .assert()
        .success()
        .stdout(predicate::str::contains("Valid:      2 (0 distill)"))
        .stdout(predicate::str::contains("Xids:       1..=2"));
}
