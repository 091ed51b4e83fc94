// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recovery scan
//!
//! Reads every slot, keeps the entries that still need a replay or distill
//! decision, and orders them by `(xid, epoch)`. Physical slot order carries
//! no meaning after a wrap.

use super::entry::{self, EntryKind, Record};
use super::error::JournalResult;
use super::format::load_header;
use super::header::JournalHeader;
use super::io::{AlignedBuf, BackingStore};
use super::store::Watermarks;
use super::{Epoch, Slot, Xid};
use serde::Serialize;
use std::io;
use std::path::Path;

/// A surviving entry, copied out of the scan buffer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScannedEntry {
    pub slot: Slot,
    pub kind: EntryKind,
    pub xid: Xid,
    pub epoch: Epoch,
    #[serde(skip)]
    pub payload: Vec<u8>,
}

impl ScannedEntry {
    pub fn record(&self) -> Record<'_> {
        Record {
            kind: self.kind,
            xid: self.xid,
            epoch: self.epoch,
            payload: &self.payload,
        }
    }
}

/// Result of scanning the whole log
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanOutcome {
    /// Entries needing action, sorted by `(xid, epoch)`
    pub entries: Vec<ScannedEntry>,
    /// Highest xid seen on disk, 0 if none
    pub last_xid: Xid,
    /// Slot holding `last_xid`
    pub last_slot: Option<Slot>,
    pub scanned: u32,
    pub torn: u32,
    pub filtered: u32,
}

/// Whether an entry still needs a replay or distill decision.
pub fn needs_action(
    kind: EntryKind,
    xid: Xid,
    epoch: Epoch,
    marks: &Watermarks,
    commit_epoch: Epoch,
) -> bool {
    if xid <= marks.replay_xid {
        return false;
    }
    if kind.is_distill() {
        !(epoch <= commit_epoch && xid <= marks.distill_xid)
    } else {
        epoch > commit_epoch
    }
}

/// Scan slots `0..slots` in batches of `scan_batch`.
///
/// Corrupt entries are logged and skipped. The first FORMAT entry ends the
/// scan: nothing past it was ever written.
pub fn scan(
    store: &BackingStore,
    header: &JournalHeader,
    marks: &Watermarks,
    commit_epoch: Epoch,
) -> io::Result<ScanOutcome> {
    let entry_size = header.entry_size();
    let batch = header.scan_batch();
    let mut buf = AlignedBuf::new(batch * entry_size);
    let mut outcome = ScanOutcome::default();

    let mut slot: Slot = 0;
    'slots: while slot < header.slots {
        let count = batch.min((header.slots - slot) as usize);
        let bytes = count * entry_size;
        let offset = header.slot_offset(slot);
        store
            .read_at(&mut buf.as_mut_slice()[..bytes], offset)
            .map_err(|e| io::Error::new(e.kind(), format!("reading slot {}: {}", slot, e)))?;

        for (i, block) in buf.as_slice()[..bytes].chunks_exact(entry_size).enumerate() {
            let at = slot + i as Slot;
            outcome.scanned += 1;

            let record = match entry::decode(block) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(slot = at, error = %e, "skipping corrupt entry");
                    outcome.torn += 1;
                    continue;
                }
            };
            if record.kind.is_format() {
                tracing::debug!(slot = at, "reached unwritten region");
                break 'slots;
            }

            if record.xid > outcome.last_xid {
                outcome.last_xid = record.xid;
                outcome.last_slot = Some(at);
            }
            if needs_action(record.kind, record.xid, record.epoch, marks, commit_epoch) {
                outcome.entries.push(ScannedEntry {
                    slot: at,
                    kind: record.kind,
                    xid: record.xid,
                    epoch: record.epoch,
                    payload: record.payload.to_vec(),
                });
            } else {
                outcome.filtered += 1;
            }
        }
        slot += count as Slot;
    }

    outcome.entries.sort_by_key(|e| (e.xid, e.epoch));
    tracing::debug!(
        scanned = outcome.scanned,
        survivors = outcome.entries.len(),
        torn = outcome.torn,
        last_xid = outcome.last_xid,
        "scan complete"
    );
    Ok(outcome)
}

/// Dry-run scan of the journal at `path`, without locking it or running callbacks.
pub fn scan_path(path: &Path, marks: &Watermarks, commit_epoch: Epoch) -> JournalResult<ScanOutcome> {
    let store = BackingStore::open(path, false)?;
    let header = load_header(&store)?;
    Ok(scan(&store, &header, marks, commit_epoch)?)
}

#[cfg(test)]
#[path = "scan_tests.rs"]
mod tests;
