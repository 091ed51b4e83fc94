// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced store wrapper for consistent observability

use super::error::StoreError;
use super::store::{EpochStore, Watermarks};
use super::Epoch;
use std::time::Instant;

/// Wrapper that adds tracing to any EpochStore
#[derive(Clone)]
pub struct TracedEpochStore<S> {
    inner: S,
}

impl<S> TracedEpochStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: EpochStore> EpochStore for TracedEpochStore<S> {
    fn committed_epoch(&self) -> Epoch {
        let epoch = self.inner.committed_epoch();
        tracing::trace!(epoch, "committed epoch");
        epoch
    }

    fn current_epoch(&self) -> Epoch {
        let epoch = self.inner.current_epoch();
        tracing::trace!(epoch, "current epoch");
        epoch
    }

    fn wait_until_committed(&self, epoch: Epoch) {
        let span = tracing::info_span!("store.wait_committed", epoch);
        let _guard = span.enter();

        tracing::debug!("waiting");
        let start = Instant::now();
        self.inner.wait_until_committed(epoch);
        tracing::debug!(elapsed_ms = start.elapsed().as_millis() as u64, "committed");
    }

    fn watermarks(&self) -> Result<Watermarks, StoreError> {
        let result = self.inner.watermarks();
        match &result {
            Ok(marks) => tracing::debug!(
                replay_xid = marks.replay_xid,
                distill_xid = marks.distill_xid,
                "loaded watermarks"
            ),
            Err(e) => tracing::error!(error = %e, "loading watermarks failed"),
        }
        result
    }

    fn save_watermarks(&self, marks: &Watermarks) -> Result<(), StoreError> {
        let span = tracing::debug_span!(
            "store.save_watermarks",
            replay_xid = marks.replay_xid,
            distill_xid = marks.distill_xid
        );
        let _guard = span.enter();

        let start = Instant::now();
        let result = self.inner.save_watermarks(marks);
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(()) => tracing::trace!(elapsed_ms, "saved"),
            Err(e) => tracing::warn!(elapsed_ms, error = %e, "save failed"),
        }
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
