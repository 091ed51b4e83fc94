// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inspect command

use crate::output::{self, OutputFormat};
use anyhow::Context;
use clap::Args;
use serde::Serialize;
use sj_core::Inspection;
use std::fmt;
use std::path::PathBuf;

#[derive(Args)]
pub struct InspectArgs {
    /// Journal file or block device
    pub path: PathBuf,

    #[arg(short = 'o', long = "output", value_enum, default_value_t)]
    pub output: OutputFormat,
}

#[derive(Serialize)]
struct InspectReport {
    path: PathBuf,
    #[serde(flatten)]
    inspection: Inspection,
}

impl fmt::Display for InspectReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = &self.inspection.header;
        let census = &self.inspection.census;

        writeln!(f, "Journal: {}", self.path.display())?;
        writeln!(f, "  Version:    {}", header.version)?;
        writeln!(
            f,
            "  Geometry:   {} slots x {} bytes from offset {}",
            header.slots, header.entry_size, header.start
        )?;
        writeln!(f, "  Scan batch: {}", header.scan_batch)?;
        writeln!(f, "  Store uuid: {:#018x}", header.store_uuid)?;
        writeln!(f, "  Formatted:  {}", super::timestamp(header.created_at))?;
        writeln!(f)?;
        writeln!(f, "Slots:")?;
        writeln!(f, "  Valid:      {} ({} distill)", census.valid, census.distill)?;
        writeln!(f, "  Format:     {}", census.format)?;
        writeln!(f, "  Torn:       {}", census.torn)?;
        match (census.min_xid, census.max_xid) {
            (Some(min), Some(max)) => write!(f, "  Xids:       {}..={}", min, max),
            _ => write!(f, "  Xids:       none"),
        }
    }
}

pub fn handle(args: InspectArgs) -> anyhow::Result<()> {
    let inspection = sj_core::inspect(&args.path)
        .with_context(|| format!("failed to inspect {}", args.path.display()))?;

    output::print(
        &InspectReport {
            path: args.path,
            inspection,
        },
        args.output,
    )
}
