// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scan command: recovery dry run

use crate::output::{self, OutputFormat};
use anyhow::Context;
use clap::Args;
use serde::Serialize;
use sj_core::{Epoch, ScanOutcome, Watermarks, Xid};
use std::fmt;
use std::path::PathBuf;

#[derive(Args)]
pub struct ScanArgs {
    /// Journal file or block device
    pub path: PathBuf,

    /// Highest xid the store has already replayed
    #[arg(long, default_value_t = 0)]
    pub replay_xid: Xid,

    /// Highest xid the store has already distilled
    #[arg(long, default_value_t = 0)]
    pub distill_xid: Xid,

    /// Highest epoch the store has committed
    #[arg(long, default_value_t = 0)]
    pub commit_epoch: Epoch,

    #[arg(short = 'o', long = "output", value_enum, default_value_t)]
    pub output: OutputFormat,
}

#[derive(Serialize)]
struct ScanReport {
    marks: Watermarks,
    commit_epoch: Epoch,
    #[serde(flatten)]
    outcome: ScanOutcome,
}

impl fmt::Display for ScanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = &self.outcome;
        writeln!(
            f,
            "Scanned {} slots: {} need action, {} filtered, {} torn",
            outcome.scanned,
            outcome.entries.len(),
            outcome.filtered,
            outcome.torn
        )?;
        let last_xid = outcome
            .last_xid
            .max(self.marks.replay_xid)
            .max(self.marks.distill_xid);
        write!(f, "Next xid: {}", last_xid.saturating_add(1))?;

        for entry in &outcome.entries {
            let mut actions = Vec::new();
            if entry.kind.is_distill() && entry.xid > self.marks.distill_xid {
                actions.push("distill");
            }
            if entry.epoch > self.commit_epoch {
                actions.push("replay");
            }
            write!(
                f,
                "\n  xid={:<8} epoch={:<6} slot={:<6} len={:<6} {}",
                entry.xid,
                entry.epoch,
                entry.slot,
                entry.payload.len(),
                actions.join("+")
            )?;
        }
        Ok(())
    }
}

pub fn handle(args: ScanArgs) -> anyhow::Result<()> {
    let marks = Watermarks {
        replay_xid: args.replay_xid,
        distill_xid: args.distill_xid,
    };
    let outcome = sj_core::scan_path(&args.path, &marks, args.commit_epoch)
        .with_context(|| format!("failed to scan {}", args.path.display()))?;

    output::print(
        &ScanReport {
            marks,
            commit_epoch: args.commit_epoch,
            outcome,
        },
        args.output,
    )
}
