// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Interfaces the journal consumes
//!
//! The journal does not decide when its entries become redundant. An
//! external transactional store commits in epochs; once an entry's epoch is
//! committed there, its slot may be reclaimed. Replay and distill work is
//! delegated to callbacks injected at open time.

use super::entry::Record;
use super::error::{CallbackError, StoreError};
use super::{Epoch, Xid};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Recovery progress persisted in the external store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watermarks {
    /// Highest xid whose replay decision has been applied
    pub replay_xid: Xid,
    /// Highest xid whose distillation has completed
    pub distill_xid: Xid,
}

/// External store whose commit epochs gate slot reclamation
pub trait EpochStore: Send + Sync {
    /// Highest epoch whose effects are durable in the store.
    fn committed_epoch(&self) -> Epoch;

    /// Epoch new transactions are currently assigned to.
    fn current_epoch(&self) -> Epoch;

    /// Block until `epoch` has committed.
    fn wait_until_committed(&self, epoch: Epoch);

    fn watermarks(&self) -> Result<Watermarks, StoreError>;

    fn save_watermarks(&self, marks: &Watermarks) -> Result<(), StoreError>;
}

impl<S: EpochStore + ?Sized> EpochStore for Arc<S> {
    fn committed_epoch(&self) -> Epoch {
        (**self).committed_epoch()
    }

    fn current_epoch(&self) -> Epoch {
        (**self).current_epoch()
    }

    fn wait_until_committed(&self, epoch: Epoch) {
        (**self).wait_until_committed(epoch)
    }

    fn watermarks(&self) -> Result<Watermarks, StoreError> {
        (**self).watermarks()
    }

    fn save_watermarks(&self, marks: &Watermarks) -> Result<(), StoreError> {
        (**self).save_watermarks(marks)
    }
}

/// Why a distill callback is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DistillMode {
    /// Worker thread, shortly after the entry became durable
    Live,
    /// Crash recovery, before the journal accepts new writes
    Replay,
}

impl DistillMode {
    pub fn is_replay(self) -> bool {
        self == DistillMode::Replay
    }
}

/// Work the journal delegates to its owner
///
/// Callbacks run with no journal lock held, so reading
/// [`Journal::status`](super::Journal::status) from one is fine. They must
/// not call `replay`, and must not `reserve` or `write`: live distills run
/// on the worker thread that frees the slots a reservation waits for.
pub trait JournalCallbacks: Send + Sync {
    /// Reapply an entry whose epoch never committed.
    fn replay(&self, record: &Record<'_>) -> Result<(), CallbackError>;

    /// Secondary processing, run once per distill-flagged entry.
    fn distill(&self, record: &Record<'_>, mode: DistillMode) -> Result<(), CallbackError>;
}

impl<C: JournalCallbacks + ?Sized> JournalCallbacks for Arc<C> {
    fn replay(&self, record: &Record<'_>) -> Result<(), CallbackError> {
        (**self).replay(record)
    }

    fn distill(&self, record: &Record<'_>, mode: DistillMode) -> Result<(), CallbackError> {
        (**self).distill(record, mode)
    }
}

/// Callbacks built from a pair of closures
pub struct FnCallbacks<R, D> {
    replay: R,
    distill: D,
}

impl<R, D> FnCallbacks<R, D>
where
    R: Fn(&Record<'_>) -> Result<(), CallbackError> + Send + Sync,
    D: Fn(&Record<'_>, DistillMode) -> Result<(), CallbackError> + Send + Sync,
{
    pub fn new(replay: R, distill: D) -> Self {
        Self { replay, distill }
    }
}

impl<R, D> JournalCallbacks for FnCallbacks<R, D>
where
    R: Fn(&Record<'_>) -> Result<(), CallbackError> + Send + Sync,
    D: Fn(&Record<'_>, DistillMode) -> Result<(), CallbackError> + Send + Sync,
{
    fn replay(&self, record: &Record<'_>) -> Result<(), CallbackError> {
        (self.replay)(record)
    }

    fn distill(&self, record: &Record<'_>, mode: DistillMode) -> Result<(), CallbackError> {
        (self.distill)(record, mode)
    }
}
