// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Journal manager
//!
//! Owns every piece of journal state. Lock order is recovery → cursor (the
//! global write lock) → state → handle; condition variables pair with the
//! state lock.

use super::entry::{self, payload_capacity, EntryKind};
use super::error::{JournalError, JournalResult};
use super::fatal;
use super::format::load_header;
use super::header::JournalHeader;
use super::io::{AlignedBuf, BackingStore, Retry};
use super::pool::{Pool, PoolStats};
use super::scan;
use super::store::{DistillMode, EpochStore, JournalCallbacks, Watermarks};
use super::txn::{Transaction, TxnHandle};
use super::worker;
use super::{Epoch, Slot, Xid};
use crate::config::JournalConfig;
use parking_lot::{Condvar, Mutex, MutexGuard};
use serde::Serialize;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Next slot to write; guarded by the write lock
struct Cursor {
    next: Slot,
    wraps: u64,
}

pub(crate) struct State {
    pub(crate) reserved: u32,
    pub(crate) inuse: u32,
    pub(crate) last_xid: Xid,
    pub(crate) marks: Watermarks,
    pub(crate) current_epoch: Epoch,
    pub(crate) commit_epoch: Epoch,
    /// Handles holding a slot, in slot-assignment order
    pub(crate) pending: VecDeque<Arc<TxnHandle>>,
    /// Handles awaiting distillation, in creation order
    pub(crate) distill: VecDeque<Arc<TxnHandle>>,
    pub(crate) recovered: bool,
    pub(crate) shutdown: bool,
}

pub(crate) struct Shared {
    pub(crate) header: JournalHeader,
    pub(crate) io: BackingStore,
    pub(crate) config: JournalConfig,
    retry: Retry,
    pub(crate) store: Box<dyn EpochStore>,
    pub(crate) callbacks: Box<dyn JournalCallbacks>,
    pub(crate) pool: Pool<AlignedBuf>,
    cursor: Mutex<Cursor>,
    /// Serializes `replay` calls; callbacks run without the cursor held
    recovery: Mutex<()>,
    pub(crate) state: Mutex<State>,
    /// Reservers waiting for capacity
    pub(crate) space: Condvar,
    /// Worker waiting for written distill entries
    pub(crate) work: Condvar,
}

impl Shared {
    fn total(&self) -> u32 {
        self.header.slots
    }

    /// Zero an entry buffer and park it in the pool.
    pub(crate) fn release_buf(&self, mut buf: AlignedBuf) {
        if buf.is_empty() {
            return;
        }
        buf.zero();
        self.pool.release(buf);
    }

    /// Reclaim the pending head if it is durable, committed, and distilled.
    pub(crate) fn reclaim_head(&self, state: &mut State) -> bool {
        let Some(head) = state.pending.front().map(Arc::clone) else {
            return false;
        };
        let slot = {
            let h = head.lock();
            if !h.written || h.distill || h.epoch > state.commit_epoch {
                return false;
            }
            h.slot
        };
        state.pending.pop_front();
        if state.inuse == 0 {
            fatal::invariant(format!("inuse underflow reclaiming xid {}", head.xid));
        }
        state.inuse -= 1;
        tracing::trace!(xid = head.xid, slot, "slot reclaimed");
        true
    }

    /// Reclaim the longest eligible prefix of the pending list.
    pub(crate) fn reclaim_prefix(&self, state: &mut State) -> u32 {
        let mut count = 0;
        while self.reclaim_head(state) {
            count += 1;
        }
        count
    }

    /// Undo a transaction dropped before it was written.
    pub(crate) fn abandon(&self, handle: &Arc<TxnHandle>, buf: AlignedBuf) {
        let mut state = self.state.lock();
        let before = state.distill.len();
        state.distill.retain(|h| !Arc::ptr_eq(h, handle));
        let unlinked = state.distill.len() != before;
        drop(state);

        tracing::warn!(xid = handle.xid, unlinked, "transaction dropped without being written");
        self.release_buf(buf);
        if unlinked {
            self.work.notify_one();
        }
    }
}

/// Where and under which ids an entry landed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WriteReceipt {
    pub xid: Xid,
    pub epoch: Epoch,
    pub slot: Slot,
}

/// Summary of a completed `replay()`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecoveryReport {
    /// Slots examined before the first FORMAT entry
    pub scanned: u32,
    /// Slots rejected for bad magic, length, or checksum
    pub torn: u32,
    /// Valid entries needing no action
    pub filtered: u32,
    pub replayed: u32,
    pub distilled: u32,
    /// Xid allocation resumes after this
    pub last_xid: Xid,
}

/// Read-only snapshot of journal state
#[derive(Debug, Clone, Serialize)]
pub struct JournalStatus {
    pub path: PathBuf,
    pub total: u32,
    pub entry_size: usize,
    pub inuse: u32,
    pub reserved: u32,
    pub free: u32,
    pub last_xid: Xid,
    pub replay_xid: Xid,
    pub distill_xid: Xid,
    pub current_epoch: Epoch,
    pub commit_epoch: Epoch,
    pub pending: usize,
    pub distill_queue: usize,
    pub next_slot: Slot,
    pub wraps: u64,
    pub block_device: bool,
    pub direct_io: bool,
    pub recovered: bool,
    pub pool: PoolStats,
}

/// An open slot journal
///
/// Opening validates the store; [`replay`](Journal::replay) must then run
/// once before transactions are accepted.
pub struct Journal {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Journal {
    /// Open a formatted store, taking its single-instance lock.
    pub fn open<S, C>(
        path: &Path,
        config: JournalConfig,
        store: S,
        callbacks: C,
    ) -> JournalResult<Self>
    where
        S: EpochStore + 'static,
        C: JournalCallbacks + 'static,
    {
        config.validate()?;

        let io = BackingStore::open(path, config.direct_io)?;
        if !io.try_lock()? {
            return Err(JournalError::Locked {
                path: path.to_path_buf(),
            });
        }
        let header = load_header(&io)?;

        let entry_size = header.entry_size();
        let pool = Pool::new(config.pool_limit(header.slots), move || {
            AlignedBuf::new(entry_size)
        });
        let retry = Retry::new(config.write_retries, config.retry_backoff);

        tracing::info!(
            path = %path.display(),
            slots = header.slots,
            entry_size,
            block_device = io.is_block_device(),
            direct_io = io.is_direct(),
            "journal opened"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                header,
                io,
                config,
                retry,
                store: Box::new(store),
                callbacks: Box::new(callbacks),
                pool,
                cursor: Mutex::new(Cursor { next: 0, wraps: 0 }),
                recovery: Mutex::new(()),
                state: Mutex::new(State {
                    reserved: 0,
                    inuse: 0,
                    last_xid: 0,
                    marks: Watermarks::default(),
                    current_epoch: 0,
                    commit_epoch: 0,
                    pending: VecDeque::new(),
                    distill: VecDeque::new(),
                    recovered: false,
                    shutdown: false,
                }),
                space: Condvar::new(),
                work: Condvar::new(),
            }),
            worker: Mutex::new(None),
        })
    }

    pub fn header(&self) -> &JournalHeader {
        &self.shared.header
    }

    pub fn path(&self) -> &Path {
        self.shared.io.path()
    }

    /// Largest payload a single entry can carry.
    pub fn payload_capacity(&self) -> usize {
        payload_capacity(self.shared.header.entry_size())
    }

    /// Reserve `n` slots of future capacity, blocking until they exist.
    ///
    /// When the journal is full the oldest pending entry decides the wait:
    /// committed entries are reclaimed on the spot, uncommitted ones block on
    /// the store's commit, undistilled ones are polled every
    /// `distill_backoff`.
    pub fn reserve(&self, n: u32) -> JournalResult<()> {
        let shared = &*self.shared;
        let total = shared.total();
        if n > total {
            return Err(JournalError::ReservationTooLarge {
                requested: n,
                total,
            });
        }

        let mut state = shared.state.lock();
        if !state.recovered {
            return Err(JournalError::NotRecovered);
        }

        for _ in 0..n {
            loop {
                if state.reserved + state.inuse < total {
                    state.reserved += 1;
                    break;
                }
                if shared.reclaim_head(&mut state) {
                    continue;
                }

                let Some(head) = state.pending.front().map(Arc::clone) else {
                    // Everything is held as reservations.
                    shared.space.wait(&mut state);
                    continue;
                };
                let (epoch, distill, written) = {
                    let h = head.lock();
                    (h.epoch, h.distill, h.written)
                };

                if !written {
                    shared.space.wait(&mut state);
                } else if distill {
                    tracing::trace!(xid = head.xid, "journal full behind undistilled entry");
                    let backoff = shared.config.distill_backoff;
                    MutexGuard::unlocked(&mut state, || std::thread::sleep(backoff));
                } else {
                    let committed =
                        MutexGuard::unlocked(&mut state, || shared.store.committed_epoch());
                    state.commit_epoch = state.commit_epoch.max(committed);
                    if epoch > state.commit_epoch {
                        tracing::debug!(xid = head.xid, epoch, "journal full, waiting for commit");
                        MutexGuard::unlocked(&mut state, || {
                            shared.store.wait_until_committed(epoch)
                        });
                        state.commit_epoch = state.commit_epoch.max(epoch);
                    }
                }
            }
        }
        Ok(())
    }

    /// Return `n` units of unused reservation credit.
    pub fn unreserve(&self, n: u32) {
        let mut state = self.shared.state.lock();
        if n > state.reserved {
            let held = state.reserved;
            drop(state);
            fatal::invariant(format!("unreserve of {} with only {} reserved", n, held));
        }
        state.reserved -= n;
        drop(state);
        self.shared.space.notify_all();
    }

    /// Start a transaction, assigning its xid.
    ///
    /// `epoch` defaults to the store's current epoch. A distill transaction
    /// takes its place in distillation order here, before it is written.
    pub fn new_transaction(
        &self,
        distill: bool,
        epoch: Option<Epoch>,
    ) -> JournalResult<Transaction> {
        if !self.shared.state.lock().recovered {
            return Err(JournalError::NotRecovered);
        }
        let buf = self.shared.pool.acquire();

        let mut state = self.shared.state.lock();
        let xid = match state.last_xid.wrapping_add(1) {
            0 => 1,
            next => next,
        };
        state.last_xid = xid;
        let epoch = epoch.unwrap_or(state.current_epoch);
        let handle = Arc::new(TxnHandle::new(xid, epoch, distill));
        if distill {
            state.distill.push_back(Arc::clone(&handle));
        }
        drop(state);

        tracing::debug!(xid, epoch, distill, "transaction created");
        Ok(Transaction::new(
            Arc::clone(&self.shared),
            handle,
            buf,
            epoch,
            distill,
        ))
    }

    /// Write a transaction to the next slot and make it durable.
    ///
    /// Consumes one unit of reservation credit. A failed write or sync
    /// aborts the process.
    pub fn write(&self, mut txn: Transaction) -> JournalResult<WriteReceipt> {
        if !Arc::ptr_eq(&txn.shared, &self.shared) {
            return Err(JournalError::ForeignTransaction);
        }
        let shared = &*self.shared;
        let handle = Arc::clone(&txn.handle);
        let (xid, epoch, distill) = (txn.xid(), txn.epoch(), txn.is_distill());
        let (mut buf, len) = txn.take_entry();
        drop(txn);

        let mut cursor = shared.cursor.lock();
        let slot = cursor.next;
        cursor.next += 1;
        if cursor.next >= shared.total() {
            cursor.next = 0;
            cursor.wraps += 1;
        }

        {
            let mut state = shared.state.lock();
            if state.reserved == 0 {
                drop(state);
                fatal::invariant(format!("write of xid {} without a reservation", xid));
            }
            state.reserved -= 1;
            state.inuse += 1;
            handle.lock().slot = Some(slot);
            state.pending.push_back(Arc::clone(&handle));
        }

        let kind = if distill {
            EntryKind::NORMAL | EntryKind::DISTILL
        } else {
            EntryKind::NORMAL
        };
        entry::seal(buf.as_mut_slice(), kind, xid, epoch, len);

        let offset = shared.header.slot_offset(slot);
        if let Err(e) = shared.io.write_at(buf.as_slice(), offset, &shared.retry) {
            fatal::io_failure("write", offset, &e);
        }
        if let Err(e) = shared.io.sync(offset, buf.len() as u64) {
            fatal::io_failure("sync", offset, &e);
        }
        drop(cursor);

        {
            let _state = shared.state.lock();
            let mut h = handle.lock();
            h.written = true;
            if distill {
                h.entry = Some(buf);
                buf = AlignedBuf::empty();
            }
        }
        if distill {
            shared.work.notify_one();
        } else {
            shared.release_buf(buf);
        }
        shared.space.notify_all();

        tracing::debug!(xid, epoch, slot, distill, "entry written");
        Ok(WriteReceipt { xid, epoch, slot })
    }

    /// Recover from the on-disk log, then start the worker.
    ///
    /// Surviving entries are handed to the callbacks in `(xid, epoch)` order,
    /// and the watermarks are saved after each. A callback error stops
    /// recovery; calling `replay` again resumes from the saved watermarks.
    pub fn replay(&self) -> JournalResult<RecoveryReport> {
        let shared = &self.shared;
        let span = tracing::info_span!("journal.replay", path = %shared.io.path().display());
        let _guard = span.enter();

        // Writers stay out until `recovered` is set, so the cursor is only
        // taken for the reset below.
        let _recovering = shared.recovery.lock();
        if shared.state.lock().recovered {
            return Err(JournalError::AlreadyRecovered);
        }

        let mut marks = shared.store.watermarks()?;
        let commit_epoch = shared.store.committed_epoch();
        let current_epoch = shared.store.current_epoch();

        let outcome = match scan::scan(&shared.io, &shared.header, &marks, commit_epoch) {
            Ok(outcome) => outcome,
            Err(e) => fatal::io_failure("scan", shared.header.start, &e),
        };
        let mut report = RecoveryReport {
            scanned: outcome.scanned,
            torn: outcome.torn,
            filtered: outcome.filtered,
            ..RecoveryReport::default()
        };

        for scanned in &outcome.entries {
            let record = scanned.record();
            let xid = record.xid;
            if record.kind.is_distill() && xid > marks.distill_xid {
                shared
                    .callbacks
                    .distill(&record, DistillMode::Replay)
                    .map_err(|source| JournalError::Callback { xid, source })?;
                marks.distill_xid = xid;
                report.distilled += 1;
                shared.store.save_watermarks(&marks)?;
            }
            if record.epoch > commit_epoch {
                shared
                    .callbacks
                    .replay(&record)
                    .map_err(|source| JournalError::Callback { xid, source })?;
                report.replayed += 1;
            }
            marks.replay_xid = marks.replay_xid.max(xid);
            shared.store.save_watermarks(&marks)?;
        }

        let last_xid = outcome
            .last_xid
            .max(marks.replay_xid)
            .max(marks.distill_xid);
        report.last_xid = last_xid;

        // Slot continuity does not matter across recovery, only xid order.
        {
            let mut cursor = shared.cursor.lock();
            cursor.next = 0;
            cursor.wraps = 0;
        }

        let worker = std::thread::Builder::new()
            .name("sj-worker".to_string())
            .spawn({
                let shared = Arc::clone(shared);
                move || worker::run(shared)
            })?;
        *self.worker.lock() = Some(worker);

        {
            let mut state = shared.state.lock();
            state.last_xid = last_xid;
            state.marks = marks;
            state.commit_epoch = commit_epoch;
            state.current_epoch = current_epoch;
            state.recovered = true;
        }
        shared.pool.prefill(shared.config.pool_prefill);

        tracing::info!(
            scanned = report.scanned,
            torn = report.torn,
            replayed = report.replayed,
            distilled = report.distilled,
            last_xid,
            "journal recovered"
        );
        Ok(report)
    }

    pub fn status(&self) -> JournalStatus {
        let shared = &*self.shared;
        let (next_slot, wraps) = {
            let cursor = shared.cursor.lock();
            (cursor.next, cursor.wraps)
        };
        let state = shared.state.lock();
        let total = shared.total();
        JournalStatus {
            path: shared.io.path().to_path_buf(),
            total,
            entry_size: shared.header.entry_size(),
            inuse: state.inuse,
            reserved: state.reserved,
            free: total.saturating_sub(state.inuse + state.reserved),
            last_xid: state.last_xid,
            replay_xid: state.marks.replay_xid,
            distill_xid: state.marks.distill_xid,
            current_epoch: state.current_epoch,
            commit_epoch: state.commit_epoch,
            pending: state.pending.len(),
            distill_queue: state.distill.len(),
            next_slot,
            wraps,
            block_device: shared.io.is_block_device(),
            direct_io: shared.io.is_direct(),
            recovered: state.recovered,
            pool: shared.pool.stats(),
        }
    }

    /// Drop idle entry buffers, e.g. under memory pressure.
    pub fn reap_buffers(&self) -> usize {
        self.shared.pool.reap()
    }
}

impl Drop for Journal {
    fn drop(&mut self) {
        self.shared.state.lock().shutdown = true;
        self.shared.work.notify_all();
        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                tracing::error!("journal worker panicked");
            }
        }
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
