// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::journal::entry::ENTRY_HEADER_SIZE;
use crate::journal::fake::{FakeEpochStore, RecordingCallbacks};
use crate::journal::manager::Journal;
use std::time::Duration;
use tempfile::TempDir;

fn options() -> FormatOptions {
    FormatOptions::new(512, 16).with_scan_batch(4).with_store_uuid(0xABCD)
}

#[test]
fn format_writes_a_readable_header() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("journal");

    let written = format(&path, &options()).unwrap();
    let read = read_header(&path).unwrap();

    assert_eq!(read, written);
    assert_eq!(read.slots, 16);
    assert_eq!(read.entry_size(), 512);
    assert_eq!(read.scan_batch(), 4);
    assert_eq!(read.store_uuid, 0xABCD);
    assert!(read.created_at > 0);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), read.log_len());
}

#[test]
fn store_uuid_is_random_when_unset() {
    let dir = TempDir::new().unwrap();
    let a = format(&dir.path().join("a"), &FormatOptions::new(512, 2)).unwrap();
    let b = format(&dir.path().join("b"), &FormatOptions::new(512, 2)).unwrap();
    assert_ne!(a.store_uuid, b.store_uuid);
}

#[test]
fn every_slot_holds_a_format_entry() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("journal");
    format(&path, &options()).unwrap();

    let inspection = inspect(&path).unwrap();

    assert_eq!(inspection.census.format, 16);
    assert_eq!(inspection.census.valid, 0);
    assert_eq!(inspection.census.torn, 0);
    assert_eq!(inspection.census.max_xid, None);
}

#[test]
fn reformat_discards_previous_entries() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("journal");
    let header = format(&path, &options()).unwrap();

    let store = BackingStore::open(&path, false).unwrap();
    let mut block = AlignedBuf::new(512);
    entry::seal(block.as_mut_slice(), EntryKind::NORMAL, 9, 1, 0);
    store
        .write_at(block.as_slice(), header.slot_offset(3), &Retry::new(0, Duration::ZERO))
        .unwrap();
    drop(store);
    assert_eq!(inspect(&path).unwrap().census.valid, 1);

    format(&path, &options()).unwrap();
    assert_eq!(inspect(&path).unwrap().census.valid, 0);
}

#[test]
fn census_counts_entry_kinds_and_xid_range() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("journal");
    let header = format(&path, &options()).unwrap();
    let store = BackingStore::open(&path, false).unwrap();
    let retry = Retry::new(0, Duration::ZERO);

    for (slot, kind, xid) in [
        (0, EntryKind::NORMAL, 4),
        (1, EntryKind::NORMAL | EntryKind::DISTILL, 7),
        (2, EntryKind::NORMAL, 5),
    ] {
        let mut block = AlignedBuf::new(512);
        entry::seal(block.as_mut_slice(), kind, xid, 1, 0);
        store
            .write_at(block.as_slice(), header.slot_offset(slot), &retry)
            .unwrap();
    }
    let mut garbage = AlignedBuf::new(512);
    garbage.as_mut_slice()[..ENTRY_HEADER_SIZE].fill(0x5A);
    store
        .write_at(garbage.as_slice(), header.slot_offset(3), &retry)
        .unwrap();

    let census = inspect(&path).unwrap().census;

    assert_eq!(census.valid, 3);
    assert_eq!(census.distill, 1);
    assert_eq!(census.torn, 1);
    assert_eq!(census.format, 12);
    assert_eq!(census.min_xid, Some(4));
    assert_eq!(census.max_xid, Some(7));
}

#[test]
fn garbage_file_is_unusable() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("journal");
    std::fs::write(&path, vec![0x11; 8192]).unwrap();

    let err = read_header(&path).unwrap_err();

    assert!(err.is_unusable());
    assert!(matches!(
        err,
        JournalError::Format(FormatError::BadMagic { .. })
    ));
}

#[test]
fn short_file_is_truncated() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("journal");
    std::fs::write(&path, [0u8; 100]).unwrap();

    let err = read_header(&path).unwrap_err();
    assert!(matches!(
        err,
        JournalError::Format(FormatError::Truncated { len: 100, need: 4096 })
    ));
}

#[test]
fn file_shorter_than_its_slots_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("journal");
    let header = format(&path, &options()).unwrap();

    let file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
    file.set_len(header.log_len() - 512).unwrap();

    let err = read_header(&path).unwrap_err();
    assert!(matches!(err, JournalError::Format(FormatError::Geometry(_))));
}

#[test]
fn invalid_geometry_is_refused_before_touching_disk() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("journal");

    let err = format(&path, &FormatOptions::new(700, 4)).unwrap_err();

    assert!(matches!(err, JournalError::Format(FormatError::Geometry(_))));
    assert!(!path.exists());
}

#[test]
fn format_refuses_an_open_journal() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("journal");
    format(&path, &options()).unwrap();

    let _journal = Journal::open(
        &path,
        crate::config::JournalConfig::for_testing(),
        FakeEpochStore::new(),
        RecordingCallbacks::new(),
    )
    .unwrap();

    let err = format(&path, &options()).unwrap_err();
    assert!(matches!(err, JournalError::Locked { .. }));
    assert_eq!(read_header(&path).unwrap().store_uuid, 0xABCD);
}
