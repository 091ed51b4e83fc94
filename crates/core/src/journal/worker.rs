// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Distillation and reclamation worker
//!
//! One thread per journal. Each pass distills every written entry at the
//! head of the distill list, refreshes the cached epochs, and reclaims the
//! committed prefix of the pending list.

use super::entry;
use super::fatal;
use super::manager::{Shared, State};
use super::store::DistillMode;
use std::sync::Arc;

pub(crate) fn run(shared: Arc<Shared>) {
    tracing::debug!("journal worker started");
    while pass(&shared) {}
    tracing::debug!("journal worker stopped");
}

/// One worker iteration. Returns false once shutdown was requested.
fn pass(shared: &Shared) -> bool {
    {
        let span = tracing::trace_span!("journal.worker_pass");
        let _guard = span.enter();

        let distilled = distill_ready(shared);
        refresh_epochs(shared);

        let mut state = shared.state.lock();
        let reclaimed = shared.reclaim_prefix(&mut state);
        if reclaimed > 0 {
            shared.space.notify_all();
        }
        if distilled > 0 || reclaimed > 0 {
            tracing::trace!(distilled, reclaimed, inuse = state.inuse, "worker pass");
        }
    }

    let mut state = shared.state.lock();
    if state.shutdown {
        return false;
    }
    if !head_written(&state) {
        shared
            .work
            .wait_for(&mut state, shared.config.commit_interval);
    }
    !state.shutdown
}

fn head_written(state: &State) -> bool {
    state
        .distill
        .front()
        .is_some_and(|head| head.lock().written)
}

/// Distill written entries in creation order, stopping at the first one
/// that is not yet durable.
fn distill_ready(shared: &Shared) -> u32 {
    let mut count = 0;
    loop {
        let (handle, entry) = {
            let mut state = shared.state.lock();
            let Some(head) = state.distill.front().map(Arc::clone) else {
                break;
            };
            let mut h = head.lock();
            if !h.written {
                break;
            }
            let Some(entry) = h.entry.take() else {
                fatal::invariant(format!("distill entry for xid {} missing", head.xid));
            };
            drop(h);
            state.distill.pop_front();
            (head, entry)
        };

        match entry::decode(entry.as_slice()) {
            Ok(record) => {
                if let Err(e) = shared.callbacks.distill(&record, DistillMode::Live) {
                    tracing::error!(xid = handle.xid, error = %e, "distill callback failed");
                }
            }
            Err(e) => fatal::invariant(format!(
                "retained entry for xid {} no longer decodes: {}",
                handle.xid, e
            )),
        }

        let marks = {
            let mut state = shared.state.lock();
            let mut h = handle.lock();
            h.distill = false;
            // Reclaim only after the epoch following the distill commits.
            h.epoch = h.epoch.saturating_add(1);
            drop(h);
            state.marks.distill_xid = state.marks.distill_xid.max(handle.xid);
            state.marks
        };
        if let Err(e) = shared.store.save_watermarks(&marks) {
            tracing::warn!(xid = handle.xid, error = %e, "failed to persist distill watermark");
        }

        shared.release_buf(entry);
        tracing::debug!(xid = handle.xid, "entry distilled");
        count += 1;
    }
    count
}

fn refresh_epochs(shared: &Shared) {
    let committed = shared.store.committed_epoch();
    let current = shared.store.current_epoch();
    let mut state = shared.state.lock();
    state.commit_epoch = state.commit_epoch.max(committed);
    state.current_epoch = state.current_epoch.max(current);
}
