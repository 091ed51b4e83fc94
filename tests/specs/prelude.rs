//! Shared helpers for CLI specs

#![allow(dead_code)]

pub use assert_cmd::Command;
pub use predicates::prelude::*;

use sj_core::{FakeEpochStore, Journal, JournalConfig, RecordingCallbacks};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Build a command for the `sj` binary with logging quiet by default.
pub fn sj() -> Command {
    let mut cmd = Command::cargo_bin("sj").unwrap();
    cmd.env_remove("SJ_LOG");
    cmd
}

/// A scratch directory holding at most one journal file.
pub struct Scratch {
    dir: TempDir,
}

impl Scratch {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn journal(&self) -> PathBuf {
        self.dir.path().join("journal")
    }

    /// Format a small journal through the CLI.
    pub fn formatted(self, entries: u32) -> Self {
        sj().args(["format", "--entry-size", "512", "--scan-batch", "4"])
            .args(["--entries", &entries.to_string()])
            .args(["--uuid", "0xabcd"])
            .arg(self.journal())
            .assert()
            .success();
        self
    }

    /// Write `(distill, epoch, payload)` entries through the library and
    /// leave them on disk, as a crashed process would.
    pub fn with_entries(self, entries: &[(bool, u64, &[u8])]) -> Self {
        {
            let journal = Journal::open(
                &self.journal(),
                JournalConfig::for_testing(),
                FakeEpochStore::new(),
                RecordingCallbacks::new(),
            )
            .unwrap();
            journal.replay().unwrap();
            for (distill, epoch, payload) in entries {
                journal.reserve(1).unwrap();
                let mut txn = journal.new_transaction(*distill, Some(*epoch)).unwrap();
                txn.set_payload(payload).unwrap();
                journal.write(txn).unwrap();
            }
        }
        self
    }

    pub fn json(&self, args: &[&str]) -> serde_json::Value {
        let output = sj().args(args).arg(self.journal()).args(["-o", "json"]).output().unwrap();
        assert!(output.status.success(), "{:?}", output);
        serde_json::from_slice(&output.stdout).unwrap()
    }
}
