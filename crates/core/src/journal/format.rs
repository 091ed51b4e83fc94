// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Formatting and offline inspection

use super::entry::{self, EntryKind};
use super::error::{FormatError, JournalError, JournalResult};
use super::header::JournalHeader;
use super::io::{AlignedBuf, BackingStore, Retry};
use super::Xid;
use crate::config::{FormatOptions, JournalConfig};
use serde::Serialize;
use std::path::Path;

/// Per-slot tally of an inspected journal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SlotCensus {
    /// Entries written by the journal (not FORMAT)
    pub valid: u32,
    /// Slots still holding their FORMAT entry
    pub format: u32,
    /// Slots failing magic, length, or checksum
    pub torn: u32,
    /// Valid entries carrying the DISTILL flag
    pub distill: u32,
    pub min_xid: Option<Xid>,
    pub max_xid: Option<Xid>,
}

/// Header plus slot census
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Inspection {
    pub header: JournalHeader,
    pub census: SlotCensus,
}

/// Format a new journal at `path`.
///
/// Regular files are created or truncated; block devices are written in
/// place and must be large enough. Every slot receives a FORMAT entry.
pub fn format(path: &Path, options: &FormatOptions) -> JournalResult<JournalHeader> {
    let store_uuid = options
        .store_uuid
        .unwrap_or_else(|| uuid::Uuid::new_v4().as_u64_pair().0);
    let created_at = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0);
    let header = JournalHeader::new(
        options.entry_size,
        options.slots,
        options.scan_batch,
        store_uuid,
        created_at,
    )?;

    let store = BackingStore::create(path)?;
    if !store.try_lock()? {
        return Err(JournalError::Locked {
            path: path.to_path_buf(),
        });
    }
    store.prepare(header.log_len())?;
    let defaults = JournalConfig::default();
    let retry = Retry::new(defaults.write_retries, defaults.retry_backoff);

    let mut block = AlignedBuf::new(JournalHeader::region_size());
    header.encode(block.as_mut_slice());
    store.write_at(block.as_slice(), 0, &retry)?;

    let entry_size = header.entry_size();
    let batch = header.scan_batch();
    let mut slots = AlignedBuf::new(batch * entry_size);
    for chunk in slots.as_mut_slice().chunks_exact_mut(entry_size) {
        entry::seal(chunk, EntryKind::FORMAT, 0, 0, 0);
    }

    let mut slot = 0;
    while slot < header.slots {
        let count = batch.min((header.slots - slot) as usize);
        store.write_at(
            &slots.as_slice()[..count * entry_size],
            header.slot_offset(slot),
            &retry,
        )?;
        slot += count as u32;
    }
    store.sync(0, header.log_len())?;

    tracing::info!(
        path = %path.display(),
        slots = header.slots,
        entry_size,
        store_uuid,
        "journal formatted"
    );
    Ok(header)
}

/// Read and validate the header of an open store.
pub(crate) fn load_header(store: &BackingStore) -> JournalResult<JournalHeader> {
    let region = JournalHeader::region_size();
    let len = store.len()?;
    if len < region as u64 {
        return Err(FormatError::Truncated {
            len: len as usize,
            need: region,
        }
        .into());
    }

    let mut block = AlignedBuf::new(region);
    store.read_at(block.as_mut_slice(), 0)?;
    let header = JournalHeader::decode(block.as_slice())?;

    if len < header.log_len() {
        return Err(FormatError::Geometry(format!(
            "store holds {} bytes, {} slots of {} need {}",
            len,
            header.slots,
            header.entry_size(),
            header.log_len()
        ))
        .into());
    }
    Ok(header)
}

/// Validate and return the header at `path` without opening a journal.
pub fn read_header(path: &Path) -> JournalResult<JournalHeader> {
    let store = BackingStore::open(path, false)?;
    load_header(&store)
}

/// Header plus a census of every slot.
pub fn inspect(path: &Path) -> JournalResult<Inspection> {
    let store = BackingStore::open(path, false)?;
    let header = load_header(&store)?;

    let entry_size = header.entry_size();
    let batch = header.scan_batch();
    let mut buf = AlignedBuf::new(batch * entry_size);
    let mut census = SlotCensus::default();

    let mut slot = 0;
    while slot < header.slots {
        let count = batch.min((header.slots - slot) as usize);
        let bytes = count * entry_size;
        store.read_at(&mut buf.as_mut_slice()[..bytes], header.slot_offset(slot))?;

        for block in buf.as_slice()[..bytes].chunks_exact(entry_size) {
            match entry::decode(block) {
                Ok(record) if record.kind.is_format() => census.format += 1,
                Ok(record) => {
                    census.valid += 1;
                    if record.kind.is_distill() {
                        census.distill += 1;
                    }
                    census.min_xid = Some(census.min_xid.map_or(record.xid, |m| m.min(record.xid)));
                    census.max_xid = Some(census.max_xid.map_or(record.xid, |m| m.max(record.xid)));
                }
                Err(_) => census.torn += 1,
            }
        }
        slot += count as u32;
    }

    Ok(Inspection { header, census })
}

#[cfg(test)]
#[path = "format_tests.rs"]
mod tests;
