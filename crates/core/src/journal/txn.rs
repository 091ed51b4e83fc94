// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transactions and their in-memory handles

use super::entry::{payload_capacity, ENTRY_HEADER_SIZE};
use super::error::{JournalError, JournalResult};
use super::io::AlignedBuf;
use super::manager::Shared;
use super::{Epoch, Slot, Xid};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// Mutable part of a handle, guarded by the handle lock
#[derive(Debug)]
pub(crate) struct HandleState {
    /// Epoch that must commit before the slot may be reclaimed
    pub(crate) epoch: Epoch,
    pub(crate) slot: Option<Slot>,
    /// Still awaiting distillation
    pub(crate) distill: bool,
    /// Durable on disk
    pub(crate) written: bool,
    /// Sealed entry kept for the worker while distillation is pending
    pub(crate) entry: Option<AlignedBuf>,
}

/// Journal-owned bookkeeping for one transaction
#[derive(Debug)]
pub(crate) struct TxnHandle {
    pub(crate) xid: Xid,
    state: Mutex<HandleState>,
}

impl TxnHandle {
    pub(crate) fn new(xid: Xid, epoch: Epoch, distill: bool) -> Self {
        Self {
            xid,
            state: Mutex::new(HandleState {
                epoch,
                slot: None,
                distill,
                written: false,
                entry: None,
            }),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, HandleState> {
        self.state.lock()
    }
}

/// An entry being built in a pooled buffer
///
/// Created by [`Journal::new_transaction`](super::Journal::new_transaction)
/// and consumed by [`Journal::write`](super::Journal::write). Dropping it
/// unwritten abandons it: it leaves the distill list and its buffer returns
/// to the pool. Reservation credit is not returned.
pub struct Transaction {
    pub(crate) shared: Arc<Shared>,
    pub(crate) handle: Arc<TxnHandle>,
    buf: AlignedBuf,
    len: usize,
    epoch: Epoch,
    distill: bool,
    consumed: bool,
}

impl Transaction {
    pub(crate) fn new(
        shared: Arc<Shared>,
        handle: Arc<TxnHandle>,
        buf: AlignedBuf,
        epoch: Epoch,
        distill: bool,
    ) -> Self {
        Self {
            shared,
            handle,
            buf,
            len: 0,
            epoch,
            distill,
            consumed: false,
        }
    }

    pub fn xid(&self) -> Xid {
        self.handle.xid
    }

    /// Epoch recorded at creation.
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn is_distill(&self) -> bool {
        self.distill
    }

    /// Largest payload this entry can carry.
    pub fn capacity(&self) -> usize {
        payload_capacity(self.buf.len())
    }

    /// Copy `payload` into the entry.
    pub fn set_payload(&mut self, payload: &[u8]) -> JournalResult<()> {
        self.payload_mut(payload.len())?.copy_from_slice(payload);
        Ok(())
    }

    /// Size the payload to `len` bytes and return it for in-place filling.
    pub fn payload_mut(&mut self, len: usize) -> JournalResult<&mut [u8]> {
        let max = self.capacity();
        if len > max {
            return Err(JournalError::PayloadTooLarge { len, max });
        }
        self.len = len;
        Ok(&mut self.buf.as_mut_slice()[ENTRY_HEADER_SIZE..ENTRY_HEADER_SIZE + len])
    }

    pub fn payload(&self) -> &[u8] {
        &self.buf.as_slice()[ENTRY_HEADER_SIZE..ENTRY_HEADER_SIZE + self.len]
    }

    /// Hand the buffer to the write path; `Drop` then has nothing to undo.
    pub(crate) fn take_entry(&mut self) -> (AlignedBuf, usize) {
        self.consumed = true;
        (std::mem::replace(&mut self.buf, AlignedBuf::empty()), self.len)
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("xid", &self.handle.xid)
            .field("epoch", &self.epoch)
            .field("distill", &self.distill)
            .field("len", &self.len)
            .finish()
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.consumed {
            return;
        }
        let buf = std::mem::replace(&mut self.buf, AlignedBuf::empty());
        self.shared.abandon(&self.handle, buf);
    }
}
