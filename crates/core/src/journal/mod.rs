// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Slot journal
//!
//! A circular array of fixed-size, checksummed entry slots preceded by a
//! page-aligned header. Callers reserve capacity, fill an entry in a pooled
//! buffer, and write it; the entry is durable when `write` returns.
//!
//! ## Architecture
//!
//! ```text
//! reserve → new_transaction → write ──► slot N (write lock, fsync)
//!                 │                         │
//!                 └─► distill list          └─► pending list
//!                          │                         │
//!                    worker: distill          worker: reclaim once
//!                    (creation order)         epoch ≤ committed (FIFO)
//! ```
//!
//! ## Durability Guarantees
//!
//! - Slot N is durable before the write of slot N+1 begins
//! - Checksums plus magic let recovery discard a torn final write
//! - Recovery replays surviving entries by `(xid, epoch)`, never by slot
//! - A failed write or scan read aborts the process; the next open replays

mod bytes;
pub mod entry;
pub mod error;
mod fake;
mod fatal;
pub mod format;
pub mod header;
pub mod io;
mod manager;
pub mod pool;
pub mod scan;
pub mod store;
mod traced;
mod txn;
mod worker;

/// Transaction identifier assigned by the journal; 0 means "none".
pub type Xid = u64;
/// Durability epoch (txg) of the external transactional store.
pub type Epoch = u64;
/// Index of a slot in the circular entry array.
pub type Slot = u32;

pub use entry::{EntryKind, Record};
pub use error::{CallbackError, FormatError, JournalError, JournalResult, StoreError};
pub use fake::{CallbackCall, FakeEpochStore, RecordingCallbacks};
pub use format::{format, inspect, read_header, Inspection, SlotCensus};
pub use header::JournalHeader;
pub use io::{AlignedBuf, BackingStore, Retry, SyncMethod};
pub use manager::{Journal, JournalStatus, RecoveryReport, WriteReceipt};
pub use pool::{Pool, PoolError, PoolStats};
pub use scan::{scan_path, ScanOutcome, ScannedEntry};
pub use store::{DistillMode, EpochStore, FnCallbacks, JournalCallbacks, Watermarks};
pub use traced::TracedEpochStore;
pub use txn::Transaction;
