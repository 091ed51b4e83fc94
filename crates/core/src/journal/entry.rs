// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log entry layout with checksum verification
//!
//! Every slot holds exactly one entry of the journal's entry size:
//!
//! ```text
//! +--------+------+------+--------+--------+----------+-----------------+
//! | magic  | type | len  |  xid   | epoch  | checksum | payload (len)   |
//! | 4      | 2    | 2    |  8     | 8      | 8        |                 |
//! +--------+------+------+--------+--------+----------+-----------------+
//! ```
//!
//! The checksum is CRC32 over bytes `0..24` followed by the payload. It sits
//! last in the header, 8-byte aligned, so it never covers itself.

use super::bytes::{get_u16, get_u32, get_u64, put_u16, put_u32, put_u64};
use super::{Epoch, Xid};
use serde::Serialize;
use std::fmt;
use std::ops::BitOr;
use thiserror::Error;

/// Entry magic ("SJEN")
pub const ENTRY_MAGIC: u32 = 0x534A_454E;
/// Size of the fixed entry header in bytes
pub const ENTRY_HEADER_SIZE: usize = 32;
/// Largest payload the 16-bit length field can describe
pub const MAX_PAYLOAD: usize = u16::MAX as usize;

const OFF_MAGIC: usize = 0;
const OFF_KIND: usize = 4;
const OFF_LEN: usize = 6;
const OFF_XID: usize = 8;
const OFF_EPOCH: usize = 16;
const OFF_CHECKSUM: usize = 24;

/// Entry type bitmask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct EntryKind(u16);

impl EntryKind {
    pub const NORMAL: EntryKind = EntryKind(1);
    pub const FORMAT: EntryKind = EntryKind(2);
    pub const DISTILL: EntryKind = EntryKind(4);

    pub fn from_bits(bits: u16) -> Self {
        EntryKind(bits)
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn contains(self, other: EntryKind) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_format(self) -> bool {
        self.contains(EntryKind::FORMAT)
    }

    pub fn is_distill(self) -> bool {
        self.contains(EntryKind::DISTILL)
    }
}

impl BitOr for EntryKind {
    type Output = EntryKind;

    fn bitor(self, rhs: EntryKind) -> EntryKind {
        EntryKind(self.0 | rhs.0)
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_format() {
            write!(f, "format")
        } else if self.is_distill() {
            write!(f, "distill")
        } else {
            write!(f, "normal")
        }
    }
}

/// Reasons an on-disk entry is rejected
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EntryError {
    #[error("block of {len} bytes is smaller than an entry header")]
    Truncated { len: usize },
    #[error("bad entry magic {found:#010x}")]
    BadMagic { found: u32 },
    #[error("payload length {len} exceeds slot capacity {max}")]
    BadLength { len: usize, max: usize },
    #[error("entry checksum mismatch: stored {stored:#x}, computed {computed:#x}")]
    ChecksumMismatch { stored: u64, computed: u64 },
}

/// A validated entry borrowed from a slot-sized block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record<'a> {
    pub kind: EntryKind,
    pub xid: Xid,
    pub epoch: Epoch,
    pub payload: &'a [u8],
}

/// Payload bytes available in an entry of `entry_size` bytes.
pub fn payload_capacity(entry_size: usize) -> usize {
    entry_size.saturating_sub(ENTRY_HEADER_SIZE).min(MAX_PAYLOAD)
}

/// Checksum of a block whose header fields are already filled in.
///
/// The payload length is taken from the block and clamped to what the block
/// actually holds.
pub fn compute_checksum(block: &[u8]) -> u64 {
    if block.len() < ENTRY_HEADER_SIZE {
        return 0;
    }
    let len = usize::from(get_u16(block, OFF_LEN)).min(block.len() - ENTRY_HEADER_SIZE);
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&block[..OFF_CHECKSUM]);
    hasher.update(&block[ENTRY_HEADER_SIZE..ENTRY_HEADER_SIZE + len]);
    u64::from(hasher.finalize())
}

/// Fill in the header of `block` and stamp its checksum.
///
/// The payload must already occupy `block[ENTRY_HEADER_SIZE..][..len]`, and
/// `len` must fit `payload_capacity(block.len())`.
pub fn seal(block: &mut [u8], kind: EntryKind, xid: Xid, epoch: Epoch, len: usize) {
    put_u32(block, OFF_MAGIC, ENTRY_MAGIC);
    put_u16(block, OFF_KIND, kind.bits());
    put_u16(block, OFF_LEN, len as u16);
    put_u64(block, OFF_XID, xid);
    put_u64(block, OFF_EPOCH, epoch);
    let checksum = compute_checksum(block);
    put_u64(block, OFF_CHECKSUM, checksum);
}

/// Validate magic, length, and checksum, returning the borrowed record.
pub fn decode(block: &[u8]) -> Result<Record<'_>, EntryError> {
    if block.len() < ENTRY_HEADER_SIZE {
        return Err(EntryError::Truncated { len: block.len() });
    }

    let magic = get_u32(block, OFF_MAGIC);
    if magic != ENTRY_MAGIC {
        return Err(EntryError::BadMagic { found: magic });
    }

    let len = usize::from(get_u16(block, OFF_LEN));
    let max = block.len() - ENTRY_HEADER_SIZE;
    if len > max {
        return Err(EntryError::BadLength { len, max });
    }

    let stored = get_u64(block, OFF_CHECKSUM);
    let computed = compute_checksum(block);
    if stored != computed {
        return Err(EntryError::ChecksumMismatch { stored, computed });
    }

    Ok(Record {
        kind: EntryKind::from_bits(get_u16(block, OFF_KIND)),
        xid: get_u64(block, OFF_XID),
        epoch: get_u64(block, OFF_EPOCH),
        payload: &block[ENTRY_HEADER_SIZE..ENTRY_HEADER_SIZE + len],
    })
}

/// True if the block holds a well-formed entry.
pub fn verify(block: &[u8]) -> bool {
    decode(block).is_ok()
}

#[cfg(test)]
#[path = "entry_tests.rs"]
mod tests;
