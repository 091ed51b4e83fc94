// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sj-core: circular write-ahead journal with distillation and crash replay
//!
//! This crate provides:
//! - A fixed-slot, checksummed on-disk journal (`journal`)
//! - Reservation-based backpressure tied to an external store's commit epochs
//! - A background worker that distills selected transactions and reclaims slots
//! - Crash recovery that replays unreclaimed entries in xid order
//! - TOML-loadable configuration (`config`)

pub mod config;
pub mod journal;

pub use config::{ConfigError, FormatOptions, JournalConfig};
pub use journal::{
    format, inspect, read_header, scan_path, CallbackCall, CallbackError, DistillMode, EntryKind,
    Epoch, EpochStore, FakeEpochStore, FnCallbacks, FormatError, Inspection, Journal,
    JournalCallbacks, JournalError, JournalHeader, JournalResult, JournalStatus, Record,
    RecordingCallbacks, RecoveryReport, ScanOutcome, ScannedEntry, Slot, SlotCensus, StoreError,
    TracedEpochStore, Transaction, Watermarks, WriteReceipt, Xid,
};
