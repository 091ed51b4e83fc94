// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-terminating failure paths
//!
//! A half-written slot or broken accounting is never repaired in place. The
//! process stops here and the next `open` + `replay` discards whatever the
//! checksums reject.

use std::fmt::Display;

/// Abort after an I/O failure on the write or recovery path.
pub(crate) fn io_failure(op: &'static str, offset: u64, err: &std::io::Error) -> ! {
    tracing::error!(op, offset, error = %err, "unrecoverable journal I/O failure, aborting");
    std::process::abort()
}

/// Abort after an accounting or list invariant was found broken.
pub(crate) fn invariant(violation: impl Display) -> ! {
    tracing::error!(%violation, "journal invariant violated, aborting");
    std::process::abort()
}
