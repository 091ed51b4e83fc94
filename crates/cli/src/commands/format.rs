// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Format command

use crate::output::{self, OutputFormat};
use anyhow::{bail, Context};
use clap::Args;
use serde::Serialize;
use sj_core::{FormatOptions, JournalHeader};
use std::fmt;
use std::path::PathBuf;

#[derive(Args)]
pub struct FormatArgs {
    /// Journal file or block device
    pub path: PathBuf,

    /// Number of slots
    #[arg(long, default_value_t = 1024)]
    pub entries: u32,

    /// Bytes per slot (multiple of 512)
    #[arg(long, default_value_t = 4096)]
    pub entry_size: usize,

    /// Slots read per batch during recovery
    #[arg(long, default_value_t = 64)]
    pub scan_batch: u32,

    /// Store identity (decimal or 0x-hex); random when omitted
    #[arg(long, value_parser = super::parse_u64)]
    pub uuid: Option<u64>,

    /// Overwrite a store that already holds a journal
    #[arg(long)]
    pub force: bool,

    #[arg(short = 'o', long = "output", value_enum, default_value_t)]
    pub output: OutputFormat,
}

#[derive(Serialize)]
struct Formatted {
    path: PathBuf,
    #[serde(flatten)]
    header: JournalHeader,
}

impl fmt::Display for Formatted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Formatted {}: {} slots x {} bytes, store uuid {:#018x}",
            self.path.display(),
            self.header.slots,
            self.header.entry_size,
            self.header.store_uuid
        )
    }
}

pub fn handle(args: FormatArgs) -> anyhow::Result<()> {
    if !args.force && sj_core::read_header(&args.path).is_ok() {
        bail!(
            "{} already holds a journal; pass --force to overwrite it",
            args.path.display()
        );
    }

    let mut options =
        FormatOptions::new(args.entry_size, args.entries).with_scan_batch(args.scan_batch);
    if let Some(uuid) = args.uuid {
        options = options.with_store_uuid(uuid);
    }

    let header = sj_core::format(&args.path, &options)
        .with_context(|| format!("failed to format {}", args.path.display()))?;
    tracing::info!(
        path = %args.path.display(),
        slots = header.slots,
        entry_size = header.entry_size,
        "formatted journal"
    );

    output::print(
        &Formatted {
            path: args.path,
            header,
        },
        args.output,
    )
}
