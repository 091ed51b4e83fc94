// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! sj - slot journal operator tool

mod commands;
mod completions;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{format, inspect, scan};
use completions::CompletionsArgs;

#[derive(Parser)]
#[command(
    name = "sj",
    version,
    about = "Slot journal - format, inspect, and dry-run recovery"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Format a new journal on a file or block device
    Format(format::FormatArgs),
    /// Show the header and a census of every slot
    Inspect(inspect::InspectArgs),
    /// List what recovery would replay, without running callbacks
    Scan(scan::ScanArgs),
    /// Generate shell completions
    Completions(CompletionsArgs),
}

fn main() -> Result<()> {
    setup_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Format(args) => format::handle(args),
        Commands::Inspect(args) => inspect::handle(args),
        Commands::Scan(args) => scan::handle(args),
        Commands::Completions(args) => {
            completions::generate_completions::<Cli>(args.shell);
            Ok(())
        }
    }
}

/// Log to stderr, filtered by `SJ_LOG` (default `warn`).
fn setup_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_env("SJ_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
