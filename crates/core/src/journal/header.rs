// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk journal header
//!
//! Written once at format time into the first block of the store. Slot 0
//! starts at the next 4 KiB boundary.
//!
//! ```text
//! magic u64 | start u64 | entry_size i32 | slots u32 | version u32
//! | scan_batch i32 | created_at u64 | store_uuid u64 | checksum u64
//! ```

use super::bytes::{get_i32, get_u32, get_u64, put_i32, put_u32, put_u64};
use super::error::FormatError;
use super::Slot;
use serde::Serialize;

/// Header magic ("SJOURNL" + 0x01)
pub const HEADER_MAGIC: u64 = u64::from_le_bytes(*b"SJOURNL\x01");
/// Current on-disk version
pub const HEADER_VERSION: u32 = 1;
/// Encoded header size in bytes
pub const HEADER_SIZE: usize = 56;
/// Alignment of the header region and of I/O buffers
pub const BLOCK_SIZE: usize = 4096;
/// Entry sizes must be a multiple of this for direct I/O
pub const SECTOR_SIZE: usize = 512;
/// Smallest entry size accepted
pub const MIN_ENTRY_SIZE: usize = 64;

const OFF_CHECKSUM: usize = 48;

/// Round `value` up to a multiple of `align` (a power of two).
pub fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) & !(align - 1)
}

/// Journal header as stored on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JournalHeader {
    pub magic: u64,
    /// Byte offset of slot 0
    pub start: u64,
    pub entry_size: i32,
    pub slots: u32,
    pub version: u32,
    /// Slots read per batch during recovery scans
    pub scan_batch: i32,
    /// Unix seconds at format time
    pub created_at: u64,
    pub store_uuid: u64,
    pub checksum: u64,
}

impl JournalHeader {
    /// Build a header for a fresh journal, validating the geometry.
    pub fn new(
        entry_size: usize,
        slots: u32,
        scan_batch: u32,
        store_uuid: u64,
        created_at: u64,
    ) -> Result<Self, FormatError> {
        let entry_size = i32::try_from(entry_size)
            .map_err(|_| FormatError::Geometry(format!("entry size {} too large", entry_size)))?;
        let scan_batch = i32::try_from(scan_batch)
            .map_err(|_| FormatError::Geometry(format!("scan batch {} too large", scan_batch)))?;

        let mut header = Self {
            magic: HEADER_MAGIC,
            start: Self::region_size() as u64,
            entry_size,
            slots,
            version: HEADER_VERSION,
            scan_batch,
            created_at,
            store_uuid,
            checksum: 0,
        };
        header.validate_geometry()?;
        header.checksum = header.compute_checksum();
        Ok(header)
    }

    /// Bytes reserved for the header ahead of slot 0.
    pub fn region_size() -> usize {
        align_up(HEADER_SIZE, BLOCK_SIZE)
    }

    fn encode_fields(&self, buf: &mut [u8]) {
        put_u64(buf, 0, self.magic);
        put_u64(buf, 8, self.start);
        put_i32(buf, 16, self.entry_size);
        put_u32(buf, 20, self.slots);
        put_u32(buf, 24, self.version);
        put_i32(buf, 28, self.scan_batch);
        put_u64(buf, 32, self.created_at);
        put_u64(buf, 40, self.store_uuid);
    }

    fn compute_checksum(&self) -> u64 {
        let mut fields = [0u8; OFF_CHECKSUM];
        self.encode_fields(&mut fields);
        u64::from(crc32fast::hash(&fields))
    }

    /// Write the header, with a freshly computed checksum, into `buf`.
    ///
    /// `buf` must hold at least `HEADER_SIZE` bytes.
    pub fn encode(&self, buf: &mut [u8]) {
        self.encode_fields(buf);
        put_u64(buf, OFF_CHECKSUM, self.compute_checksum());
    }

    /// Parse and validate a header read from the start of the store.
    pub fn decode(buf: &[u8]) -> Result<Self, FormatError> {
        if buf.len() < HEADER_SIZE {
            return Err(FormatError::Truncated {
                len: buf.len(),
                need: HEADER_SIZE,
            });
        }

        let header = Self {
            magic: get_u64(buf, 0),
            start: get_u64(buf, 8),
            entry_size: get_i32(buf, 16),
            slots: get_u32(buf, 20),
            version: get_u32(buf, 24),
            scan_batch: get_i32(buf, 28),
            created_at: get_u64(buf, 32),
            store_uuid: get_u64(buf, 40),
            checksum: get_u64(buf, OFF_CHECKSUM),
        };

        if header.magic != HEADER_MAGIC {
            return Err(FormatError::BadMagic {
                found: header.magic,
            });
        }
        if header.version != HEADER_VERSION {
            return Err(FormatError::UnsupportedVersion {
                found: header.version,
            });
        }
        let computed = header.compute_checksum();
        if header.checksum != computed {
            return Err(FormatError::ChecksumMismatch {
                stored: header.checksum,
                computed,
            });
        }
        header.validate_geometry()?;

        Ok(header)
    }

    fn validate_geometry(&self) -> Result<(), FormatError> {
        let entry_size = self.entry_size();
        if self.entry_size < 0 || entry_size < MIN_ENTRY_SIZE {
            return Err(FormatError::Geometry(format!(
                "entry size {} is below the minimum of {}",
                self.entry_size, MIN_ENTRY_SIZE
            )));
        }
        if entry_size % SECTOR_SIZE != 0 {
            return Err(FormatError::Geometry(format!(
                "entry size {} is not a multiple of {}",
                entry_size, SECTOR_SIZE
            )));
        }
        if self.slots == 0 {
            return Err(FormatError::Geometry("journal has no slots".to_string()));
        }
        if self.scan_batch <= 0 {
            return Err(FormatError::Geometry(format!(
                "scan batch {} must be positive",
                self.scan_batch
            )));
        }
        if self.start < Self::region_size() as u64 || self.start % BLOCK_SIZE as u64 != 0 {
            return Err(FormatError::Geometry(format!(
                "slot 0 offset {} overlaps the header or is unaligned",
                self.start
            )));
        }
        Ok(())
    }

    pub fn entry_size(&self) -> usize {
        usize::try_from(self.entry_size).unwrap_or(0)
    }

    pub fn scan_batch(&self) -> usize {
        usize::try_from(self.scan_batch).unwrap_or(1).max(1)
    }

    /// Byte offset of `slot`.
    pub fn slot_offset(&self, slot: Slot) -> u64 {
        self.start + u64::from(slot) * self.entry_size() as u64
    }

    /// Total bytes the header plus all slots occupy.
    pub fn log_len(&self) -> u64 {
        self.slot_offset(self.slots)
    }
}

#[cfg(test)]
#[path = "header_tests.rs"]
mod tests;
