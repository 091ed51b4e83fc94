// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Journal error types
//!
//! Only `JournalError::Format` means "this store is not a usable journal".
//! Failures the journal cannot reason about (a failed slot write, a failed
//! recovery read, broken accounting) never surface here: they abort the
//! process, see `fatal`.

use super::Xid;
use crate::config::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by journal operations
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("journal unusable: {0}")]
    Format(#[from] FormatError),
    #[error("journal {} is already open by another instance", path.display())]
    Locked { path: PathBuf },
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("callback failed for xid {xid}: {source}")]
    Callback {
        xid: Xid,
        #[source]
        source: CallbackError,
    },
    #[error("journal has not been recovered; call replay() first")]
    NotRecovered,
    #[error("journal was already recovered")]
    AlreadyRecovered,
    #[error("transaction belongs to a different journal")]
    ForeignTransaction,
    #[error("cannot reserve {requested} slots in a journal of {total}")]
    ReservationTooLarge { requested: u32, total: u32 },
    #[error("payload too large: {len} bytes (max {max})")]
    PayloadTooLarge { len: usize, max: usize },
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl JournalError {
    /// True when the backing store failed header or geometry validation.
    pub fn is_unusable(&self) -> bool {
        matches!(self, JournalError::Format(_))
    }
}

/// Header or geometry validation failures
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("bad header magic {found:#018x}")]
    BadMagic { found: u64 },
    #[error("unsupported journal version {found}")]
    UnsupportedVersion { found: u32 },
    #[error("header checksum mismatch: stored {stored:#x}, computed {computed:#x}")]
    ChecksumMismatch { stored: u64, computed: u64 },
    #[error("header truncated: {len} bytes (need {need})")]
    Truncated { len: usize, need: usize },
    #[error("invalid geometry: {0}")]
    Geometry(String),
}

/// Errors reported by the external transactional store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("failed to persist watermarks: {0}")]
    Persist(String),
}

/// Error returned by a replay or distill callback
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct CallbackError {
    message: String,
}

impl CallbackError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Result type for journal operations
pub type JournalResult<T> = Result<T, JournalError>;
