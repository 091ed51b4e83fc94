//! Scan specs: recovery dry runs

use crate::prelude::*;

#[test]
fn scan_of_a_fresh_journal_finds_nothing() {
    let scratch = Scratch::new().formatted(8);

    sj().arg("scan")
        .arg(scratch.journal())
        .assert()
        .success()
        .stdout(predicate::str::contains("0 need action"))
        .stdout(predicate::str::contains("Next xid: 1"));
}

#[test]
fn scan_lists_uncommitted_entries_in_xid_order() {
    let scratch = Scratch::new()
        .formatted(8)
        .with_entries(&[(false, 2, b"one"), (false, 1, b"two"), (true, 3, b"three")]);

    let json = scratch.json(&["scan", "--commit-epoch", "1"]);

    let xids: Vec<u64> = json["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["xid"].as_u64().unwrap())
        .collect();
    assert_eq!(xids, vec![1, 3]);
    assert_eq!(json["filtered"], 1);
    assert_eq!(json["last_xid"], 3);
}

#[test]
fn watermarks_filter_finished_work() {
    let scratch = Scratch::new()
        .formatted(8)
        .with_entries(&[(false, 5, b""), (false, 5, b""), (false, 5, b"")]);

    let json = scratch.json(&["scan", "--replay-xid", "2"]);

    assert_eq!(json["entries"].as_array().unwrap().len(), 1);
    assert_eq!(json["entries"][0]["xid"], 3);
}

#[test]
fn scan_text_names_the_action_per_entry() {
    let scratch = Scratch::new()
        .formatted(8)
        .with_entries(&[(true, 1, b"indexed"), (false, 4, b"")]);

    sj().args(["scan", "--commit-epoch", "2"])
        .arg(scratch.journal())
        .assert()
        .success()
        .stdout(predicate::str::contains("2 need action"))
        .stdout(predicate::str::is_match(r"xid=1\s.*distill\n").unwrap())
        .stdout(predicate::str::is_match(r"xid=2\s.*replay").unwrap());
}
