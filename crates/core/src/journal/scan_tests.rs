// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::config::FormatOptions;
use crate::journal::format::format;
use crate::journal::io::Retry;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use yare::parameterized;

const ENTRY: usize = 512;

struct Fixture {
    _dir: TempDir,
    path: PathBuf,
    header: JournalHeader,
}

impl Fixture {
    fn new(slots: u32, scan_batch: u32) -> Self {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("journal");
        let header = format(
            &path,
            &FormatOptions::new(ENTRY, slots).with_scan_batch(scan_batch),
        )
        .unwrap();
        Self {
            _dir: dir,
            path,
            header,
        }
    }

    fn put(&self, slot: Slot, kind: EntryKind, xid: Xid, epoch: Epoch, payload: &[u8]) {
        let mut block = AlignedBuf::new(ENTRY);
        block.as_mut_slice()[entry::ENTRY_HEADER_SIZE..][..payload.len()].copy_from_slice(payload);
        entry::seal(block.as_mut_slice(), kind, xid, epoch, payload.len());
        self.raw_write(slot, block.as_slice());
    }

    fn raw_write(&self, slot: Slot, bytes: &[u8]) {
        let store = BackingStore::open(&self.path, false).unwrap();
        store
            .write_at(bytes, self.header.slot_offset(slot), &Retry::new(0, Duration::ZERO))
            .unwrap();
    }

    fn scan(&self, marks: Watermarks, commit: Epoch) -> ScanOutcome {
        let store = BackingStore::open(&self.path, false).unwrap();
        scan(&store, &self.header, &marks, commit).unwrap()
    }
}

fn xids(outcome: &ScanOutcome) -> Vec<Xid> {
    outcome.entries.iter().map(|e| e.xid).collect()
}

#[test]
fn fresh_journal_stops_at_first_slot() {
    let fx = Fixture::new(8, 4);
    let outcome = fx.scan(Watermarks::default(), 0);

    assert!(outcome.entries.is_empty());
    assert_eq!(outcome.scanned, 1);
    assert_eq!(outcome.last_xid, 0);
    assert_eq!(outcome.last_slot, None);
}

#[test]
fn survivors_are_ordered_by_xid_not_slot() {
    let fx = Fixture::new(8, 4);
    fx.put(0, EntryKind::NORMAL, 5, 2, b"five");
    fx.put(1, EntryKind::NORMAL, 3, 2, b"three");
    fx.put(2, EntryKind::NORMAL, 4, 2, b"four");

    let outcome = fx.scan(Watermarks::default(), 0);

    assert_eq!(xids(&outcome), vec![3, 4, 5]);
    assert_eq!(outcome.entries[0].payload, b"three");
    assert_eq!(outcome.entries[0].slot, 1);
    assert_eq!(outcome.last_xid, 5);
    assert_eq!(outcome.last_slot, Some(0));
}

#[test]
fn format_entry_hides_stale_slots_beyond_it() {
    let fx = Fixture::new(8, 4);
    fx.put(0, EntryKind::NORMAL, 1, 9, b"");
    fx.put(1, EntryKind::NORMAL, 2, 9, b"");
    fx.put(3, EntryKind::NORMAL, 7, 9, b"");

    let outcome = fx.scan(Watermarks::default(), 0);

    assert_eq!(xids(&outcome), vec![1, 2]);
    assert_eq!(outcome.scanned, 3);
    assert_eq!(outcome.last_xid, 2);
}

#[test]
fn corrupt_entry_is_skipped_not_fatal() {
    let fx = Fixture::new(4, 4);
    fx.put(0, EntryKind::NORMAL, 1, 5, b"ok");
    fx.put(1, EntryKind::NORMAL, 2, 5, b"torn");
    fx.put(2, EntryKind::NORMAL, 3, 5, b"ok");

    // Flip a payload byte in slot 1.
    let mut block = AlignedBuf::new(ENTRY);
    let store = BackingStore::open(&fx.path, false).unwrap();
    store
        .read_at(block.as_mut_slice(), fx.header.slot_offset(1))
        .unwrap();
    block.as_mut_slice()[entry::ENTRY_HEADER_SIZE] ^= 0xFF;
    fx.raw_write(1, block.as_slice());

    let outcome = fx.scan(Watermarks::default(), 0);

    assert_eq!(xids(&outcome), vec![1, 3]);
    assert_eq!(outcome.torn, 1);
}

#[test]
fn scan_crosses_batch_boundaries() {
    let fx = Fixture::new(7, 2);
    for slot in 0..7 {
        fx.put(slot, EntryKind::NORMAL, u64::from(slot) + 10, 4, b"");
    }

    let outcome = fx.scan(Watermarks::default(), 0);

    assert_eq!(outcome.scanned, 7);
    assert_eq!(outcome.entries.len(), 7);
    assert_eq!(outcome.last_xid, 16);
    assert_eq!(outcome.last_slot, Some(6));
}

#[test]
fn watermarks_filter_finished_work() {
    let fx = Fixture::new(8, 8);
    fx.put(0, EntryKind::NORMAL, 1, 1, b"");
    fx.put(1, EntryKind::NORMAL, 2, 3, b"");
    fx.put(2, EntryKind::NORMAL | EntryKind::DISTILL, 3, 1, b"");
    fx.put(3, EntryKind::NORMAL | EntryKind::DISTILL, 4, 1, b"");

    let marks = Watermarks {
        replay_xid: 0,
        distill_xid: 3,
    };
    let outcome = fx.scan(marks, 2);

    // xid 1 committed, xid 3 committed and distilled
    assert_eq!(xids(&outcome), vec![2, 4]);
    assert_eq!(outcome.filtered, 2);
}

#[test]
fn scan_path_reads_without_locking() {
    let fx = Fixture::new(4, 4);
    fx.put(0, EntryKind::NORMAL, 1, 2, b"x");

    let held = BackingStore::open(&fx.path, false).unwrap();
    assert!(held.try_lock().unwrap());

    let outcome = scan_path(&fx.path, &Watermarks::default(), 0).unwrap();
    assert_eq!(xids(&outcome), vec![1]);
}

#[parameterized(
    replayed_already = { EntryKind::NORMAL, 5, 9, 5, 0, 1, false },
    committed_normal = { EntryKind::NORMAL, 6, 2, 0, 0, 2, false },
    uncommitted_normal = { EntryKind::NORMAL, 6, 3, 0, 0, 2, true },
    distilled_and_committed = { EntryKind::DISTILL, 6, 2, 0, 6, 2, false },
    committed_but_undistilled = { EntryKind::DISTILL, 7, 2, 0, 6, 2, true },
    distilled_but_uncommitted = { EntryKind::DISTILL, 6, 3, 0, 6, 2, true },
)]
fn needs_action_cases(
    kind: EntryKind,
    xid: Xid,
    epoch: Epoch,
    replay_xid: Xid,
    distill_xid: Xid,
    commit: Epoch,
    expected: bool,
) {
    let marks = Watermarks {
        replay_xid,
        distill_xid,
    };
    assert_eq!(needs_action(kind, xid, epoch, &marks, commit), expected);
}
