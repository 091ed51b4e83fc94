// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded object pool
//!
//! Entry buffers are recycled through a `Pool` so the write path never
//! allocates once the pool is warm. `acquire` blocks while `max` items are
//! outstanding; `reap` drops idle items when memory is tight.

use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use thiserror::Error;

/// Errors from non-blocking pool access
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("pool exhausted: {max} items outstanding")]
    Exhausted { max: usize },
}

/// Point-in-time pool counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Items parked and ready for reuse
    pub idle: usize,
    /// Items currently handed out
    pub outstanding: usize,
    pub max: usize,
    /// Items constructed over the pool's lifetime
    pub created: u64,
}

struct PoolState<T> {
    idle: Vec<T>,
    outstanding: usize,
    created: u64,
}

/// Bounded pool of reusable items
pub struct Pool<T> {
    state: Mutex<PoolState<T>>,
    available: Condvar,
    max: usize,
    make: Box<dyn Fn() -> T + Send + Sync>,
}

impl<T> Pool<T> {
    /// Pool handing out at most `max` items at once, built with `make`.
    pub fn new(max: usize, make: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self {
            state: Mutex::new(PoolState {
                idle: Vec::new(),
                outstanding: 0,
                created: 0,
            }),
            available: Condvar::new(),
            max: max.max(1),
            make: Box::new(make),
        }
    }

    /// Take an item, blocking until one is released if the pool is at its cap.
    pub fn acquire(&self) -> T {
        let mut state = self.state.lock();
        while state.outstanding >= self.max {
            tracing::debug!(max = self.max, "pool exhausted, waiting");
            self.available.wait(&mut state);
        }
        self.take(&mut state)
    }

    /// Take an item without blocking.
    pub fn try_acquire(&self) -> Result<T, PoolError> {
        let mut state = self.state.lock();
        if state.outstanding >= self.max {
            return Err(PoolError::Exhausted { max: self.max });
        }
        Ok(self.take(&mut state))
    }

    fn take(&self, state: &mut PoolState<T>) -> T {
        state.outstanding += 1;
        match state.idle.pop() {
            Some(item) => item,
            None => {
                state.created += 1;
                (self.make)()
            }
        }
    }

    /// Return an item taken with `acquire`.
    pub fn release(&self, item: T) {
        let mut state = self.state.lock();
        if state.outstanding == 0 {
            drop(state);
            super::fatal::invariant("pool release without a matching acquire");
        }
        state.outstanding -= 1;
        state.idle.push(item);
        drop(state);
        self.available.notify_one();
    }

    /// Build idle items until at least `count` are parked.
    pub fn prefill(&self, count: usize) {
        let mut state = self.state.lock();
        let room = self.max.saturating_sub(state.outstanding);
        while state.idle.len() < count.min(room) {
            state.created += 1;
            let item = (self.make)();
            state.idle.push(item);
        }
    }

    /// Drop idle items beyond `keep`. Returns how many were dropped.
    pub fn shrink_to(&self, keep: usize) -> usize {
        let mut state = self.state.lock();
        let excess = state.idle.len().saturating_sub(keep);
        state.idle.truncate(keep);
        excess
    }

    /// Drop every idle item.
    pub fn reap(&self) -> usize {
        let dropped = self.shrink_to(0);
        if dropped > 0 {
            tracing::debug!(dropped, "reaped idle pool items");
        }
        dropped
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.state.lock();
        PoolStats {
            idle: state.idle.len(),
            outstanding: state.outstanding,
            max: self.max,
            created: state.created,
        }
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
