// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake store and callbacks for testing
//!
//! Compiled into the library so integration tests and downstream crates can
//! drive a journal without a real transactional store.

use super::entry::Record;
use super::error::{CallbackError, StoreError};
use super::store::{DistillMode, EpochStore, JournalCallbacks, Watermarks};
use super::{Epoch, Xid};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Default)]
struct StoreState {
    committed: Epoch,
    current: Epoch,
    marks: Watermarks,
    saves: usize,
    waits: Vec<Epoch>,
    fail_saves: bool,
}

#[derive(Default)]
struct StoreInner {
    state: Mutex<StoreState>,
    committed: Condvar,
}

/// In-memory epoch store with a manually advanced commit epoch
#[derive(Clone, Default)]
pub struct FakeEpochStore {
    inner: Arc<StoreInner>,
}

impl FakeEpochStore {
    /// Nothing committed; new transactions land in epoch 1.
    pub fn new() -> Self {
        Self::with_committed(0)
    }

    pub fn with_committed(epoch: Epoch) -> Self {
        let store = Self::default();
        {
            let mut state = store.inner.state.lock();
            state.committed = epoch;
            state.current = epoch + 1;
        }
        store
    }

    /// Commit through `epoch`, waking anyone blocked on it.
    pub fn commit(&self, epoch: Epoch) {
        let mut state = self.inner.state.lock();
        state.committed = state.committed.max(epoch);
        state.current = state.current.max(epoch + 1);
        drop(state);
        self.inner.committed.notify_all();
    }

    pub fn set_current(&self, epoch: Epoch) {
        self.inner.state.lock().current = epoch;
    }

    /// Seed persisted watermarks, as if a previous instance saved them.
    pub fn set_watermarks(&self, marks: Watermarks) {
        self.inner.state.lock().marks = marks;
    }

    /// Make `save_watermarks` fail until cleared.
    pub fn fail_saves(&self, fail: bool) {
        self.inner.state.lock().fail_saves = fail;
    }

    /// Epochs passed to `wait_until_committed`, in call order.
    pub fn waits(&self) -> Vec<Epoch> {
        self.inner.state.lock().waits.clone()
    }

    pub fn saved_watermarks(&self) -> Watermarks {
        self.inner.state.lock().marks
    }

    pub fn save_count(&self) -> usize {
        self.inner.state.lock().saves
    }
}

impl EpochStore for FakeEpochStore {
    fn committed_epoch(&self) -> Epoch {
        self.inner.state.lock().committed
    }

    fn current_epoch(&self) -> Epoch {
        self.inner.state.lock().current
    }

    fn wait_until_committed(&self, epoch: Epoch) {
        let mut state = self.inner.state.lock();
        state.waits.push(epoch);
        while state.committed < epoch {
            self.inner.committed.wait(&mut state);
        }
    }

    fn watermarks(&self) -> Result<Watermarks, StoreError> {
        Ok(self.inner.state.lock().marks)
    }

    fn save_watermarks(&self, marks: &Watermarks) -> Result<(), StoreError> {
        let mut state = self.inner.state.lock();
        if state.fail_saves {
            return Err(StoreError::Persist("injected failure".to_string()));
        }
        state.marks = *marks;
        state.saves += 1;
        Ok(())
    }
}

/// Recorded callback invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackCall {
    Replay {
        xid: Xid,
        epoch: Epoch,
        payload: Vec<u8>,
    },
    Distill {
        xid: Xid,
        epoch: Epoch,
        payload: Vec<u8>,
        mode: DistillMode,
    },
}

impl CallbackCall {
    pub fn xid(&self) -> Xid {
        match self {
            CallbackCall::Replay { xid, .. } | CallbackCall::Distill { xid, .. } => *xid,
        }
    }
}

#[derive(Default)]
struct RecorderState {
    calls: Vec<CallbackCall>,
    fail_replay_at: Option<Xid>,
    fail_distill_at: Option<Xid>,
}

#[derive(Default)]
struct RecorderInner {
    state: Mutex<RecorderState>,
    changed: Condvar,
}

/// Callbacks that record every invocation
#[derive(Clone, Default)]
pub struct RecordingCallbacks {
    inner: Arc<RecorderInner>,
}

impl RecordingCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the replay callback for `xid`.
    pub fn fail_replay_at(&self, xid: Xid) {
        self.inner.state.lock().fail_replay_at = Some(xid);
    }

    /// Fail the distill callback for `xid`.
    pub fn fail_distill_at(&self, xid: Xid) {
        self.inner.state.lock().fail_distill_at = Some(xid);
    }

    pub fn clear_failures(&self) {
        let mut state = self.inner.state.lock();
        state.fail_replay_at = None;
        state.fail_distill_at = None;
    }

    pub fn calls(&self) -> Vec<CallbackCall> {
        self.inner.state.lock().calls.clone()
    }

    /// Xids passed to `replay`, in call order.
    pub fn replayed(&self) -> Vec<Xid> {
        self.inner
            .state
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, CallbackCall::Replay { .. }))
            .map(CallbackCall::xid)
            .collect()
    }

    /// Xids passed to `distill` in `mode`, in call order.
    pub fn distilled(&self, mode: DistillMode) -> Vec<Xid> {
        self.inner
            .state
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, CallbackCall::Distill { mode: m, .. } if *m == mode))
            .map(CallbackCall::xid)
            .collect()
    }

    /// Wait until `count` live distills were recorded. Returns false on timeout.
    pub fn wait_for_distilled(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.inner.state.lock();
        loop {
            let live = state
                .calls
                .iter()
                .filter(|c| matches!(c, CallbackCall::Distill { mode: DistillMode::Live, .. }))
                .count();
            if live >= count {
                return true;
            }
            if self
                .inner
                .changed
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                return false;
            }
        }
    }

    fn record(&self, call: CallbackCall, fail: bool) -> Result<(), CallbackError> {
        let xid = call.xid();
        self.inner.state.lock().calls.push(call);
        self.inner.changed.notify_all();
        if fail {
            return Err(CallbackError::new(format!("injected failure at xid {}", xid)));
        }
        Ok(())
    }
}

impl JournalCallbacks for RecordingCallbacks {
    fn replay(&self, record: &Record<'_>) -> Result<(), CallbackError> {
        let fail = self.inner.state.lock().fail_replay_at == Some(record.xid);
        self.record(
            CallbackCall::Replay {
                xid: record.xid,
                epoch: record.epoch,
                payload: record.payload.to_vec(),
            },
            fail,
        )
    }

    fn distill(&self, record: &Record<'_>, mode: DistillMode) -> Result<(), CallbackError> {
        let fail = self.inner.state.lock().fail_distill_at == Some(record.xid);
        self.record(
            CallbackCall::Distill {
                xid: record.xid,
                epoch: record.epoch,
                payload: record.payload.to_vec(),
                mode,
            },
            fail,
        )
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
